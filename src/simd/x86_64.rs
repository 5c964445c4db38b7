//! x86_64 kernels for the fused row reductions
//!
//! AVX2 and SSE4.1 variants of every reduction. Additions are plain
//! (wrapping) vector adds so the output matches the scalar reference bit
//! for bit. Unaligned loads are used throughout; callers need not align
//! their buffers.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Fused reduction `out = in + adds - subs` **(AVX2)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **AVX2**
///   (`is_x86_feature_detected!("avx2")`).
/// * Every row in `adds` and `subs` must be at least `output.len()` long,
///   and `input.len() == output.len()`.
/// * `output` must not alias `input` or any row.
#[target_feature(enable = "avx2")]
pub unsafe fn fused_row_reduce_i16_avx2(
    input: &[i16],
    output: &mut [i16],
    adds: &[&[i16]],
    subs: &[&[i16]],
) {
    debug_assert_eq!(input.len(), output.len());
    const LANES: usize = 16;

    let n = output.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm256_loadu_si256(input.as_ptr().add(i) as *const __m256i);
        for row in adds {
            v = _mm256_add_epi16(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        for row in subs {
            v = _mm256_sub_epi16(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        _mm256_storeu_si256(output.as_mut_ptr().add(i) as *mut __m256i, v);
        i += LANES;
    }

    while i < n {
        let mut v = input[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        output[i] = v;
        i += 1;
    }
}

/// In-place fused reduction `acc += adds - subs` **(AVX2)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **AVX2**.
/// * Every row must be at least `acc.len()` long and must not alias `acc`.
#[target_feature(enable = "avx2")]
pub unsafe fn fused_row_reduce_in_place_i16_avx2(
    acc: &mut [i16],
    adds: &[&[i16]],
    subs: &[&[i16]],
) {
    const LANES: usize = 16;

    let n = acc.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm256_loadu_si256(acc.as_ptr().add(i) as *const __m256i);
        for row in adds {
            v = _mm256_add_epi16(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        for row in subs {
            v = _mm256_sub_epi16(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        _mm256_storeu_si256(acc.as_mut_ptr().add(i) as *mut __m256i, v);
        i += LANES;
    }

    while i < n {
        let mut v = acc[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        acc[i] = v;
        i += 1;
    }
}

/// Fused reduction over i32 rows **(AVX2)**.
///
/// # Safety
///
/// Same contract as [`fused_row_reduce_i16_avx2`], with i32 elements.
#[target_feature(enable = "avx2")]
pub unsafe fn fused_row_reduce_i32_avx2(
    input: &[i32],
    output: &mut [i32],
    adds: &[&[i32]],
    subs: &[&[i32]],
) {
    debug_assert_eq!(input.len(), output.len());
    const LANES: usize = 8;

    let n = output.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm256_loadu_si256(input.as_ptr().add(i) as *const __m256i);
        for row in adds {
            v = _mm256_add_epi32(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        for row in subs {
            v = _mm256_sub_epi32(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        _mm256_storeu_si256(output.as_mut_ptr().add(i) as *mut __m256i, v);
        i += LANES;
    }

    while i < n {
        let mut v = input[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        output[i] = v;
        i += 1;
    }
}

/// In-place fused reduction over i32 rows **(AVX2)**.
///
/// # Safety
///
/// Same contract as [`fused_row_reduce_in_place_i16_avx2`], with i32
/// elements.
#[target_feature(enable = "avx2")]
pub unsafe fn fused_row_reduce_in_place_i32_avx2(
    acc: &mut [i32],
    adds: &[&[i32]],
    subs: &[&[i32]],
) {
    const LANES: usize = 8;

    let n = acc.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm256_loadu_si256(acc.as_ptr().add(i) as *const __m256i);
        for row in adds {
            v = _mm256_add_epi32(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        for row in subs {
            v = _mm256_sub_epi32(v, _mm256_loadu_si256(row.as_ptr().add(i) as *const __m256i));
        }
        _mm256_storeu_si256(acc.as_mut_ptr().add(i) as *mut __m256i, v);
        i += LANES;
    }

    while i < n {
        let mut v = acc[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        acc[i] = v;
        i += 1;
    }
}

// SSE4.1 variants for older CPUs

/// Fused reduction `out = in + adds - subs` **(SSE4.1)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **SSE4.1**.
/// * Slice contract as in [`fused_row_reduce_i16_avx2`].
#[target_feature(enable = "sse4.1")]
pub unsafe fn fused_row_reduce_i16_sse41(
    input: &[i16],
    output: &mut [i16],
    adds: &[&[i16]],
    subs: &[&[i16]],
) {
    debug_assert_eq!(input.len(), output.len());
    const LANES: usize = 8;

    let n = output.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm_loadu_si128(input.as_ptr().add(i) as *const __m128i);
        for row in adds {
            v = _mm_add_epi16(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        for row in subs {
            v = _mm_sub_epi16(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        _mm_storeu_si128(output.as_mut_ptr().add(i) as *mut __m128i, v);
        i += LANES;
    }

    while i < n {
        let mut v = input[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        output[i] = v;
        i += 1;
    }
}

/// In-place fused reduction `acc += adds - subs` **(SSE4.1)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **SSE4.1**.
/// * Row contract as in [`fused_row_reduce_in_place_i16_avx2`].
#[target_feature(enable = "sse4.1")]
pub unsafe fn fused_row_reduce_in_place_i16_sse41(
    acc: &mut [i16],
    adds: &[&[i16]],
    subs: &[&[i16]],
) {
    const LANES: usize = 8;

    let n = acc.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm_loadu_si128(acc.as_ptr().add(i) as *const __m128i);
        for row in adds {
            v = _mm_add_epi16(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        for row in subs {
            v = _mm_sub_epi16(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        _mm_storeu_si128(acc.as_mut_ptr().add(i) as *mut __m128i, v);
        i += LANES;
    }

    while i < n {
        let mut v = acc[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        acc[i] = v;
        i += 1;
    }
}

/// Fused reduction over i32 rows **(SSE4.1)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **SSE4.1**.
/// * Slice contract as in [`fused_row_reduce_i32_avx2`].
#[target_feature(enable = "sse4.1")]
pub unsafe fn fused_row_reduce_i32_sse41(
    input: &[i32],
    output: &mut [i32],
    adds: &[&[i32]],
    subs: &[&[i32]],
) {
    debug_assert_eq!(input.len(), output.len());
    const LANES: usize = 4;

    let n = output.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm_loadu_si128(input.as_ptr().add(i) as *const __m128i);
        for row in adds {
            v = _mm_add_epi32(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        for row in subs {
            v = _mm_sub_epi32(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        _mm_storeu_si128(output.as_mut_ptr().add(i) as *mut __m128i, v);
        i += LANES;
    }

    while i < n {
        let mut v = input[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        output[i] = v;
        i += 1;
    }
}

/// In-place fused reduction over i32 rows **(SSE4.1)**.
///
/// # Safety
///
/// * The caller must ensure the CPU supports **SSE4.1**.
/// * Row contract as in [`fused_row_reduce_in_place_i32_avx2`].
#[target_feature(enable = "sse4.1")]
pub unsafe fn fused_row_reduce_in_place_i32_sse41(
    acc: &mut [i32],
    adds: &[&[i32]],
    subs: &[&[i32]],
) {
    const LANES: usize = 4;

    let n = acc.len();
    let mut i = 0;
    while i + LANES <= n {
        let mut v = _mm_loadu_si128(acc.as_ptr().add(i) as *const __m128i);
        for row in adds {
            v = _mm_add_epi32(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        for row in subs {
            v = _mm_sub_epi32(v, _mm_loadu_si128(row.as_ptr().add(i) as *const __m128i));
        }
        _mm_storeu_si128(acc.as_mut_ptr().add(i) as *mut __m128i, v);
        i += LANES;
    }

    while i < n {
        let mut v = acc[i];
        for row in adds {
            v = v.wrapping_add(row[i]);
        }
        for row in subs {
            v = v.wrapping_sub(row[i]);
        }
        acc[i] = v;
        i += 1;
    }
}
