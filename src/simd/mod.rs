//! Fused row reductions over accumulator vectors
//!
//! One pass computes `out[i] = in[i] + adds[..][i] - subs[..][i]` with
//! wrapping arithmetic, for 16-bit hidden rows and 32-bit PSQT rows.
//! Platform kernels are selected at runtime; the scalar module is the
//! reference every SIMD path must match bit for bit.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

// Scalar reference implementation
pub mod scalar {
    /// Scalar fused reduction over i16 rows
    #[inline]
    pub fn fused_row_reduce_i16(
        input: &[i16],
        output: &mut [i16],
        adds: &[&[i16]],
        subs: &[&[i16]],
    ) {
        debug_assert_eq!(input.len(), output.len());
        for (i, out) in output.iter_mut().enumerate() {
            let mut v = input[i];
            for row in adds {
                v = v.wrapping_add(row[i]);
            }
            for row in subs {
                v = v.wrapping_sub(row[i]);
            }
            *out = v;
        }
    }

    /// Scalar fused reduction updating `acc` in place
    #[inline]
    pub fn fused_row_reduce_in_place_i16(acc: &mut [i16], adds: &[&[i16]], subs: &[&[i16]]) {
        for (i, v) in acc.iter_mut().enumerate() {
            let mut x = *v;
            for row in adds {
                x = x.wrapping_add(row[i]);
            }
            for row in subs {
                x = x.wrapping_sub(row[i]);
            }
            *v = x;
        }
    }

    /// Scalar fused reduction over i32 rows
    #[inline]
    pub fn fused_row_reduce_i32(
        input: &[i32],
        output: &mut [i32],
        adds: &[&[i32]],
        subs: &[&[i32]],
    ) {
        debug_assert_eq!(input.len(), output.len());
        for (i, out) in output.iter_mut().enumerate() {
            let mut v = input[i];
            for row in adds {
                v = v.wrapping_add(row[i]);
            }
            for row in subs {
                v = v.wrapping_sub(row[i]);
            }
            *out = v;
        }
    }

    /// Scalar fused reduction updating `acc` in place
    #[inline]
    pub fn fused_row_reduce_in_place_i32(acc: &mut [i32], adds: &[&[i32]], subs: &[&[i32]]) {
        for (i, v) in acc.iter_mut().enumerate() {
            let mut x = *v;
            for row in adds {
                x = x.wrapping_add(row[i]);
            }
            for row in subs {
                x = x.wrapping_sub(row[i]);
            }
            *v = x;
        }
    }
}

macro_rules! dispatch {
    ($avx2:path, $sse41:path, $scalar:path, ($($arg:expr),*)) => {{
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                // SAFETY: AVX2 support was just verified.
                return unsafe { $avx2($($arg),*) };
            }
            if is_x86_feature_detected!("sse4.1") {
                // SAFETY: SSE4.1 support was just verified.
                return unsafe { $sse41($($arg),*) };
            }
        }
        $scalar($($arg),*)
    }};
}

/// Fused reduction `out = in + adds - subs`, widest kernel available.
///
/// All rows must have the same length as `input` and `output`; `output`
/// must not alias `input` or any row.
#[inline]
pub fn fused_row_reduce_i16(input: &[i16], output: &mut [i16], adds: &[&[i16]], subs: &[&[i16]]) {
    dispatch!(
        x86_64::fused_row_reduce_i16_avx2,
        x86_64::fused_row_reduce_i16_sse41,
        scalar::fused_row_reduce_i16,
        (input, output, adds, subs)
    )
}

/// In-place fused reduction `acc += adds - subs`
#[inline]
pub fn fused_row_reduce_in_place_i16(acc: &mut [i16], adds: &[&[i16]], subs: &[&[i16]]) {
    dispatch!(
        x86_64::fused_row_reduce_in_place_i16_avx2,
        x86_64::fused_row_reduce_in_place_i16_sse41,
        scalar::fused_row_reduce_in_place_i16,
        (acc, adds, subs)
    )
}

/// Fused reduction over 32-bit PSQT rows
#[inline]
pub fn fused_row_reduce_i32(input: &[i32], output: &mut [i32], adds: &[&[i32]], subs: &[&[i32]]) {
    dispatch!(
        x86_64::fused_row_reduce_i32_avx2,
        x86_64::fused_row_reduce_i32_sse41,
        scalar::fused_row_reduce_i32,
        (input, output, adds, subs)
    )
}

/// In-place fused reduction over 32-bit PSQT rows
#[inline]
pub fn fused_row_reduce_in_place_i32(acc: &mut [i32], adds: &[&[i32]], subs: &[&[i32]]) {
    dispatch!(
        x86_64::fused_row_reduce_in_place_i32_avx2,
        x86_64::fused_row_reduce_in_place_i32_sse41,
        scalar::fused_row_reduce_in_place_i32,
        (acc, adds, subs)
    )
}
