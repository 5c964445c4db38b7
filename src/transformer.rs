//! Feature transformer weights and the big/small network pair
//!
//! The transformer is the linear input layer: one row of hidden weights and
//! one row of PSQT weights per feature index, stored row-major so a feature
//! occupies contiguous lanes. Loading and decoding of weight files happens
//! outside this crate; construction here only validates geometry.

use crate::error::{NnueError, NnueResult};
use crate::features::{IndexType, FEATURE_DIMENSIONS};

/// PSQT output buckets, selected by the evaluator per position
pub const PSQT_BUCKETS: usize = 8;

/// Hidden width of the big network
pub const HIDDEN_BIG: usize = 1024;

/// Hidden width of the small network
pub const HIDDEN_SMALL: usize = 128;

/// Row-major weight matrices of one feature transformer
pub struct FeatureTransformer<const D: usize> {
    /// Hidden weights, `FEATURE_DIMENSIONS x D`
    weights: Vec<i16>,
    /// PSQT weights, `FEATURE_DIMENSIONS x PSQT_BUCKETS`
    psqt_weights: Vec<i32>,
}

impl<const D: usize> FeatureTransformer<D> {
    /// Zero weights, mostly useful in tests
    pub fn zero() -> Self {
        FeatureTransformer {
            weights: vec![0; FEATURE_DIMENSIONS * D],
            psqt_weights: vec![0; FEATURE_DIMENSIONS * PSQT_BUCKETS],
        }
    }

    /// Wrap externally produced weight buffers, checking their geometry
    pub fn from_parts(weights: Vec<i16>, psqt_weights: Vec<i32>) -> NnueResult<Self> {
        if weights.len() != FEATURE_DIMENSIONS * D {
            return Err(NnueError::DimensionMismatch {
                expected: FEATURE_DIMENSIONS * D,
                actual: weights.len(),
            });
        }
        if psqt_weights.len() != FEATURE_DIMENSIONS * PSQT_BUCKETS {
            return Err(NnueError::DimensionMismatch {
                expected: FEATURE_DIMENSIONS * PSQT_BUCKETS,
                actual: psqt_weights.len(),
            });
        }
        Ok(FeatureTransformer { weights, psqt_weights })
    }

    /// Hidden weight column of one feature
    #[inline]
    pub fn row(&self, index: IndexType) -> &[i16] {
        let offset = index as usize * D;
        &self.weights[offset..offset + D]
    }

    /// PSQT weight column of one feature
    #[inline]
    pub fn psqt_row(&self, index: IndexType) -> &[i32] {
        let offset = index as usize * PSQT_BUCKETS;
        &self.psqt_weights[offset..offset + PSQT_BUCKETS]
    }
}

/// The two feature transformers a search carries; the downstream layers of
/// each network live with the evaluator, not here.
pub struct Networks {
    pub big: FeatureTransformer<HIDDEN_BIG>,
    pub small: FeatureTransformer<HIDDEN_SMALL>,
}

impl Networks {
    pub fn zero() -> Self {
        Networks {
            big: FeatureTransformer::zero(),
            small: FeatureTransformer::zero(),
        }
    }
}
