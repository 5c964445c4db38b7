//! King-relative feature indexing
//!
//! Every input feature is a (king-bucket, piece-plane, square) triple. The
//! board is oriented per perspective: black's view is flipped vertically,
//! and either view is mirrored horizontally when that perspective's king
//! stands on files e-h, so king placements collapse into 32 buckets over
//! the a-d half-board. Both kings share a single piece plane.
//!
//! Because every index embeds the king bucket and orientation, any king
//! move of a perspective invalidates all of that perspective's indices;
//! [`requires_refresh`] reports exactly that.

use smallvec::SmallVec;

use crate::board::{Color, DirtyPiece, Piece, PieceType, Position, Square};

/// Feature row index into the transformer weight matrix
pub type IndexType = u32;

/// Most indices one update can touch: a differential refresh against a
/// full board of 32 pieces.
pub const MAX_CHANGED_FEATURES: usize = 32;

/// Fixed-capacity index list; never spills for legal positions
pub type IndexList = SmallVec<[IndexType; MAX_CHANGED_FEATURES]>;

/// King buckets after mirroring: 4 files x 8 ranks
pub const KING_BUCKETS: usize = 32;

/// Piece planes: five kinds x two colors, plus one merged king plane
pub const PIECE_PLANES: usize = 11;

/// Rows in the weight matrix
pub const FEATURE_DIMENSIONS: usize = KING_BUCKETS * PIECE_PLANES * Square::COUNT;

/// Bucket for each vertically-oriented king square
const KING_BUCKET_MAP: [u8; 64] = {
    let mut map = [0u8; 64];
    let mut sq = 0;
    while sq < 64 {
        let file = (sq & 7) as u8;
        let rank = (sq >> 3) as u8;
        let mirrored = if file > 3 { 7 - file } else { file };
        map[sq] = rank * 4 + mirrored;
        sq += 1;
    }
    map
};

/// XOR mask orienting squares for `perspective` with the king on `ksq`
#[inline]
fn orientation(perspective: Color, ksq: Square) -> u8 {
    let vertical = match perspective {
        Color::White => 0,
        Color::Black => 56,
    };
    let horizontal = if ksq.file() > 3 { 7 } else { 0 };
    vertical ^ horizontal
}

#[inline]
fn king_bucket(perspective: Color, ksq: Square) -> u32 {
    let vertical = match perspective {
        Color::White => 0,
        Color::Black => 56,
    };
    KING_BUCKET_MAP[ksq.index() ^ vertical] as u32
}

#[inline]
fn piece_plane(perspective: Color, piece: Piece) -> u32 {
    if piece.kind == PieceType::King {
        // Both kings share the last plane; the own king never collides with
        // the opponent's because their squares differ.
        (PIECE_PLANES - 1) as u32
    } else {
        let them = (piece.color != perspective) as u32;
        2 * piece.kind.index() as u32 + them
    }
}

/// Map a (square, piece) pair into index space for one perspective
#[inline]
pub fn make_index(perspective: Color, sq: Square, piece: Piece, ksq: Square) -> IndexType {
    let oriented = (sq.index() ^ orientation(perspective, ksq) as usize) as u32;
    let plane = piece_plane(perspective, piece);
    let bucket = king_bucket(perspective, ksq);
    oriented + Square::COUNT as u32 * plane + (PIECE_PLANES * Square::COUNT) as u32 * bucket
}

/// True when the record's move invalidates every index of `perspective`,
/// i.e. when that perspective's king is the mover.
#[inline]
pub fn requires_refresh(dp: &DirtyPiece, perspective: Color) -> bool {
    dp.mover()
        .is_some_and(|d| d.piece == Piece::new(PieceType::King, perspective))
}

/// Emit the indices vacated (`removed`) and occupied (`added`) by one move.
///
/// For a single move this yields one or two entries on each side: captures
/// and promotions add to `removed`, castling adds the rook to both.
pub fn append_changed_indices(
    perspective: Color,
    ksq: Square,
    dp: &DirtyPiece,
    removed: &mut IndexList,
    added: &mut IndexList,
) {
    for delta in dp.iter() {
        if let Some(sq) = delta.from {
            removed.push(make_index(perspective, sq, delta.piece, ksq));
        }
        if let Some(sq) = delta.to {
            added.push(make_index(perspective, sq, delta.piece, ksq));
        }
    }
}

/// Emit the indices of every piece on the board, kings included
pub fn append_active_indices(pos: &Position, perspective: Color, out: &mut IndexList) {
    let ksq = pos.king_square(perspective);
    for color in Color::ALL {
        for kind in PieceType::ALL {
            let mut bb = pos.pieces(color, kind);
            while let Some(sq) = bb.pop_lsb() {
                out.push(make_index(perspective, sq, Piece::new(kind, color), ksq));
            }
        }
    }
}
