//! Error types for accumulator construction
//!
//! The search-time update paths never fail; errors only arise on the cold
//! path when building transformers from external buffers or parsing FEN.

use std::error::Error;
use std::fmt;

/// Errors surfaced while setting up networks or positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NnueError {
    /// Malformed FEN string
    Fen(String),

    /// Weight buffer length does not match the network geometry
    DimensionMismatch { expected: usize, actual: usize },
}

impl fmt::Display for NnueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnueError::Fen(msg) => {
                write!(f, "invalid FEN: {msg}")
            }
            NnueError::DimensionMismatch { expected, actual } => {
                write!(f, "weight dimension mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl Error for NnueError {}

/// Result type for fallible NNUE setup operations
pub type NnueResult<T> = Result<T, NnueError>;
