//! Shared test support: reference accumulation and randomized fixtures

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::OnceLock;

use nnue_accumulator::features::append_active_indices;
use nnue_accumulator::{
    AccumulatorStack, Color, DirtyPiece, FeatureTransformer, IndexList, Move, Networks,
    PieceType, Position, Square, FEATURE_DIMENSIONS, HIDDEN_BIG, HIDDEN_SMALL, PSQT_BUCKETS,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Networks with fixed-seed random weights, built once per test binary.
/// Random weights make every mismatch visible; zero weights would hide
/// sign and pairing mistakes.
pub fn networks() -> &'static Networks {
    static NETWORKS: OnceLock<Networks> = OnceLock::new();
    NETWORKS.get_or_init(|| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5EED_CAB5);
        Networks {
            big: random_transformer(&mut rng),
            small: random_transformer(&mut rng),
        }
    })
}

fn random_transformer<const D: usize>(rng: &mut Xoshiro256PlusPlus) -> FeatureTransformer<D> {
    let weights = (0..FEATURE_DIMENSIONS * D).map(|_| rng.gen_range(-128i16..=127)).collect();
    let psqt_weights = (0..FEATURE_DIMENSIONS * PSQT_BUCKETS)
        .map(|_| rng.gen_range(-10_000i32..=10_000))
        .collect();
    FeatureTransformer::from_parts(weights, psqt_weights).expect("buffers sized to geometry")
}

/// Reference accumulation: sum every active feature from the zero vector
pub fn full_accumulation<const D: usize>(
    pos: &Position,
    perspective: Color,
    ft: &FeatureTransformer<D>,
) -> (Vec<i16>, Vec<i32>) {
    let mut acc = vec![0i16; D];
    let mut psqt = vec![0i32; PSQT_BUCKETS];

    let mut active = IndexList::new();
    append_active_indices(pos, perspective, &mut active);
    for &index in active.iter() {
        for (a, w) in acc.iter_mut().zip(ft.row(index)) {
            *a = a.wrapping_add(*w);
        }
        for (a, w) in psqt.iter_mut().zip(ft.psqt_row(index)) {
            *a = a.wrapping_add(*w);
        }
    }
    (acc, psqt)
}

/// Assert the top slot's big accumulator equals the reference for `pos`
pub fn assert_big_matches(stack: &AccumulatorStack, pos: &Position, networks: &Networks) {
    for perspective in Color::ALL {
        let (acc, psqt) = full_accumulation::<HIDDEN_BIG>(pos, perspective, &networks.big);
        assert_eq!(
            stack.latest().big.values(perspective)[..],
            acc[..],
            "big hidden vector diverged for {perspective:?}"
        );
        let got: Vec<i32> =
            (0..PSQT_BUCKETS).map(|b| stack.latest().big.psqt(perspective, b)).collect();
        assert_eq!(got, psqt, "big PSQT vector diverged for {perspective:?}");
    }
}

/// Assert the top slot's small accumulator equals the reference for `pos`
pub fn assert_small_matches(stack: &AccumulatorStack, pos: &Position, networks: &Networks) {
    for perspective in Color::ALL {
        let (acc, psqt) = full_accumulation::<HIDDEN_SMALL>(pos, perspective, &networks.small);
        assert_eq!(
            stack.latest().small.values(perspective)[..],
            acc[..],
            "small hidden vector diverged for {perspective:?}"
        );
        let got: Vec<i32> =
            (0..PSQT_BUCKETS).map(|b| stack.latest().small.psqt(perspective, b)).collect();
        assert_eq!(got, psqt, "small PSQT vector diverged for {perspective:?}");
    }
}

pub fn sq(name: &str) -> Square {
    Square::from_algebraic(name).expect("valid square name")
}

/// Apply a pseudo-random board mutation and return its record.
///
/// Moves are board-consistent rather than chess-legal: any piece of the
/// side to move goes to any square not holding a friendly piece. Kings are
/// never captured, pawns only change file when capturing (so the en
/// passant branch stays out of play), kings never jump two files (no
/// accidental castling), and pawns reaching the far rank promote to a
/// queen. The accumulator protocol only needs record/board consistency.
pub fn random_board_move(pos: &mut Position, rng: &mut Xoshiro256PlusPlus) -> DirtyPiece {
    let us = pos.side_to_move;
    for _ in 0..1000 {
        let mut own = pos.pieces_by_color(us);
        let skip = rng.gen_range(0..own.count());
        for _ in 0..skip {
            own.pop_lsb();
        }
        let from = own.pop_lsb().expect("side to move owns pieces");
        let piece = pos.piece_at(from).expect("bitboards match mailbox");

        let to = Square::from_index(rng.gen_range(0..64));
        if pos.pieces_by_color(us).contains(to) {
            continue;
        }
        if pos.piece_at(to).map(|p| p.kind) == Some(PieceType::King) {
            continue;
        }
        if piece.kind == PieceType::Pawn
            && from.file() != to.file()
            && pos.piece_at(to).is_none()
        {
            continue;
        }
        if piece.kind == PieceType::King && from.file().abs_diff(to.file()) == 2 {
            continue;
        }

        let last_rank = match us {
            Color::White => 7,
            Color::Black => 0,
        };
        let mv = if piece.kind == PieceType::Pawn && to.rank() == last_rank {
            Move::promoting(from, to, PieceType::Queen)
        } else {
            Move::new(from, to)
        };
        return pos.do_move(mv);
    }
    panic!("no board mutation found");
}
