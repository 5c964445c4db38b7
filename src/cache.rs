//! Per-king-square refresh cache
//!
//! When an incremental update chain breaks (the perspective's king moved),
//! the accumulator is rebuilt differentially against the last accumulator
//! computed for the same king square. Each entry is a mutable snapshot:
//! a refresh both consumes and rewrites it, and the stored bitboards are
//! the only record of which position the snapshot describes.
//!
//! A zeroed entry describes the empty board, so a fresh cache is
//! immediately usable: the first refresh for a king square simply adds
//! every piece. Entries persist across searches and must be cleared when
//! the networks change.

use crate::accumulator::Aligned64;
use crate::board::{Bitboard, Color, Square};
use crate::transformer::{HIDDEN_BIG, HIDDEN_SMALL, PSQT_BUCKETS};

/// Snapshot of the accumulator last computed for one (king-square,
/// perspective) pair, together with the occupancy that produced it
#[derive(Clone)]
pub struct CacheEntry<const D: usize> {
    pub accumulation: Aligned64<[i16; D]>,
    pub psqt_accumulation: Aligned64<[i32; PSQT_BUCKETS]>,
    pub by_color_bb: [Bitboard; 2],
    pub by_type_bb: [Bitboard; 6],
}

impl<const D: usize> CacheEntry<D> {
    fn new() -> Self {
        CacheEntry {
            accumulation: Aligned64([0; D]),
            psqt_accumulation: Aligned64([0; PSQT_BUCKETS]),
            by_color_bb: [Bitboard::EMPTY; 2],
            by_type_bb: [Bitboard::EMPTY; 6],
        }
    }

    fn clear(&mut self) {
        self.accumulation.0 = [0; D];
        self.psqt_accumulation.0 = [0; PSQT_BUCKETS];
        self.by_color_bb = [Bitboard::EMPTY; 2];
        self.by_type_bb = [Bitboard::EMPTY; 6];
    }
}

/// Dense table of refresh entries for one network size: 64 king squares
/// times 2 perspectives
pub struct AccumulatorCache<const D: usize> {
    entries: Vec<CacheEntry<D>>,
}

impl<const D: usize> AccumulatorCache<D> {
    pub fn new() -> Self {
        AccumulatorCache {
            entries: vec![CacheEntry::new(); Square::COUNT * 2],
        }
    }

    /// Reset every entry to the empty board
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.clear();
        }
    }

    #[inline]
    pub fn entry(&self, ksq: Square, perspective: Color) -> &CacheEntry<D> {
        &self.entries[ksq.index() * 2 + perspective.index()]
    }

    #[inline]
    pub fn entry_mut(&mut self, ksq: Square, perspective: Color) -> &mut CacheEntry<D> {
        &mut self.entries[ksq.index() * 2 + perspective.index()]
    }
}

impl<const D: usize> Default for AccumulatorCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache pair matching the network pair. One instance per search worker;
/// entries are read-modify-write, so sharing across workers is unsound.
pub struct AccumulatorCaches {
    pub big: AccumulatorCache<HIDDEN_BIG>,
    pub small: AccumulatorCache<HIDDEN_SMALL>,
}

impl AccumulatorCaches {
    pub fn new() -> Self {
        AccumulatorCaches {
            big: AccumulatorCache::new(),
            small: AccumulatorCache::new(),
        }
    }

    /// Invalidate both caches, e.g. after swapping networks
    pub fn clear(&mut self) {
        log::debug!("clearing accumulator refresh caches");
        self.big.clear();
        self.small.clear();
    }
}

impl Default for AccumulatorCaches {
    fn default() -> Self {
        Self::new()
    }
}
