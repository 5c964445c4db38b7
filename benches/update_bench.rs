use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;

use nnue_accumulator::simd;
use nnue_accumulator::{
    AccumulatorCaches, AccumulatorStack, BigNetwork, Move, Networks, Position, Square, HIDDEN_BIG,
};

fn row(len: usize, salt: i16) -> Vec<i16> {
    (0..len).map(|i| (i as i16).wrapping_mul(salt)).collect()
}

pub fn bench_fused_row_reduce(c: &mut Criterion) {
    let mut g = c.benchmark_group("fused_row_reduce_i16");

    for &len in &[128usize, 1024] {
        let input = row(len, 3121);
        let a0 = row(len, -7001);
        let a1 = row(len, 1723);
        let r0 = row(len, 257);
        let r1 = row(len, 911);

        let shapes: [(&str, Vec<&[i16]>, Vec<&[i16]>); 2] = [
            ("add_sub", vec![&a0], vec![&r0]),
            ("add_add_sub_sub", vec![&a0, &a1], vec![&r0, &r1]),
        ];

        for (name, adds, subs) in &shapes {
            g.bench_with_input(
                BenchmarkId::new("dispatcher", format!("len={len},{name}")),
                &len,
                |b, &len| {
                    let mut out = vec![0i16; len];
                    b.iter(|| {
                        simd::fused_row_reduce_i16(&input, &mut out, adds, subs);
                        black_box(&mut out);
                    });
                },
            );

            g.bench_with_input(
                BenchmarkId::new("scalar", format!("len={len},{name}")),
                &len,
                |b, &len| {
                    let mut out = vec![0i16; len];
                    b.iter(|| {
                        simd::scalar::fused_row_reduce_i16(&input, &mut out, adds, subs);
                        black_box(&mut out);
                    });
                },
            );
        }
    }
    g.finish();
}

pub fn bench_forward_fill(c: &mut Criterion) {
    let networks = Networks::zero();
    let mut caches = AccumulatorCaches::new();
    let mut pos = Position::startpos();

    let mut stack = AccumulatorStack::new(32);
    stack.reset(&pos, &networks, &mut caches);

    let line = [
        ("g1", "f3"),
        ("g8", "f6"),
        ("b1", "c3"),
        ("b8", "c6"),
        ("e2", "e3"),
        ("e7", "e6"),
        ("d2", "d3"),
        ("d7", "d6"),
    ];
    for (from, to) in line {
        let dp = pos.do_move(Move::new(
            Square::from_algebraic(from).unwrap(),
            Square::from_algebraic(to).unwrap(),
        ));
        stack.push(dp);
    }

    c.bench_function("evaluate_big_8_ply_forward_fill", |b| {
        b.iter_batched(
            || stack.clone(),
            |mut stack| {
                stack.evaluate::<HIDDEN_BIG, BigNetwork>(&pos, &networks.big, &mut caches.big);
                black_box(&stack);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_fused_row_reduce, bench_forward_fill);
criterion_main!(benches);
