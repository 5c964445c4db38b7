//! Incrementally updated NNUE accumulators for chess search
//!
//! Maintains the feature-transformer pre-activations of an NNUE evaluator
//! along a search's move stack. The input layer is a sparse binary vector
//! over (king-square, piece, square) triples; rebuilding the hidden
//! pre-activation from scratch costs O(pieces x width) per position, while
//! one move changes at most a handful of features. This crate keeps the
//! cost at O(changed features x width) by combining:
//!
//! - an [`AccumulatorStack`] of lazily computed per-ply states, updated
//!   forward or backward along the move history,
//! - a per-king-square [refresh cache](cache) that rebuilds an accumulator
//!   differentially whenever a king move breaks the incremental chain,
//! - [fused SIMD row reductions](simd) that apply several weight columns
//!   to a vector in a single pass.
//!
//! The search drives the stack with `push`/`pop` around make/unmake and
//! calls [`AccumulatorStack::evaluate`] at leaves; downstream network
//! layers read the result through [`AccumulatorStack::latest`]. Weight
//! loading, move generation and the rest of the evaluator live outside
//! this crate.
//!
//! All search-time operations are allocation-free and single-threaded; a
//! multi-threaded search gives every worker its own stack and cache pair.
//! Protocol violations (stack overflow/underflow, reading an uncomputed
//! accumulator, updating across a refresh boundary) assert in debug builds
//! and are undefined in release builds.

pub mod accumulator;
pub mod board;
pub mod cache;
pub mod error;
pub mod features;
pub mod simd;
pub mod stack;
pub mod transformer;

pub use accumulator::{Accumulator, AccumulatorState, Aligned64, BigNetwork, SlotAccessor, SmallNetwork};
pub use board::{Bitboard, Color, DirtyPiece, Move, Piece, PieceType, Position, Square};
pub use cache::{AccumulatorCache, AccumulatorCaches, CacheEntry};
pub use error::{NnueError, NnueResult};
pub use features::{IndexList, IndexType, FEATURE_DIMENSIONS};
pub use stack::{update_refresh_via_cache, AccumulatorStack, MAX_PLY};
pub use transformer::{FeatureTransformer, Networks, HIDDEN_BIG, HIDDEN_SMALL, PSQT_BUCKETS};
