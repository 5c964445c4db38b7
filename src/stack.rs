//! Accumulator stack and the two update paths that keep it consistent
//!
//! The stack mirrors the search's move line: one slot per ply, slot 0 for
//! the root, `push` on make and `pop` on unmake. Nothing is recomputed
//! eagerly; evaluation walks down from the top to the nearest usable slot
//! and then either forward-propagates per-move deltas or rebuilds the top
//! from the refresh cache and back-fills ancestors with inverted deltas.
//!
//! The backward path exists because the nearest refresh boundary can sit
//! above every computed slot: propagating forward through a king move
//! would be wrong, so the top is refreshed directly and ancestors are
//! filled on demand for later unmakes.

use smallvec::SmallVec;

use crate::accumulator::{Accumulator, AccumulatorState, BigNetwork, SlotAccessor, SmallNetwork};
use crate::board::{Color, DirtyPiece, Piece, PieceType, Position, Square};
use crate::cache::{AccumulatorCache, AccumulatorCaches};
use crate::features::{append_changed_indices, make_index, requires_refresh, IndexList, IndexType};
use crate::simd;
use crate::transformer::{FeatureTransformer, Networks, HIDDEN_BIG, HIDDEN_SMALL};

/// Deepest ply the default stack supports
pub const MAX_PLY: usize = 246;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum UpdateDirection {
    Forward,
    Backward,
}

/// Fixed-capacity stack of per-ply accumulator states
///
/// Storage is allocated once at construction; make/unmake never allocate.
/// One stack per search thread, strictly nested with the search's
/// make/unmake calls.
#[derive(Clone)]
pub struct AccumulatorStack {
    states: Vec<AccumulatorState>,
    current_idx: usize,
}

impl AccumulatorStack {
    /// Allocate a stack of `capacity` slots; `capacity` must exceed the
    /// maximum search depth plus one.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 2);
        log::debug!("allocating accumulator stack with {capacity} slots");
        AccumulatorStack {
            states: vec![AccumulatorState::new(); capacity],
            current_idx: 1,
        }
    }

    /// The top slot, i.e. the current position's accumulators
    #[inline]
    pub fn latest(&self) -> &AccumulatorState {
        &self.states[self.current_idx - 1]
    }

    #[inline]
    fn mut_latest(&mut self) -> &mut AccumulatorState {
        &mut self.states[self.current_idx - 1]
    }

    /// Rewind to the root and compute it for both perspectives and both
    /// network sizes via the refresh caches.
    pub fn reset(
        &mut self,
        root_pos: &Position,
        networks: &Networks,
        caches: &mut AccumulatorCaches,
    ) {
        log::trace!("resetting accumulator stack from root position");
        self.current_idx = 1;
        self.states[0].reset(DirtyPiece::default());

        for perspective in Color::ALL {
            update_refresh_via_cache::<HIDDEN_BIG, BigNetwork>(
                &networks.big,
                root_pos,
                &mut self.states[0],
                &mut caches.big,
                perspective,
            );
            update_refresh_via_cache::<HIDDEN_SMALL, SmallNetwork>(
                &networks.small,
                root_pos,
                &mut self.states[0],
                &mut caches.small,
                perspective,
            );
        }
    }

    /// Open a new ply for the move described by `dirty_piece`
    #[inline]
    pub fn push(&mut self, dirty_piece: DirtyPiece) {
        debug_assert!(self.current_idx + 1 < self.states.len(), "accumulator stack overflow");
        self.states[self.current_idx].reset(dirty_piece);
        self.current_idx += 1;
    }

    /// Discard the top ply
    #[inline]
    pub fn pop(&mut self) {
        debug_assert!(self.current_idx > 1, "cannot pop the root");
        self.current_idx -= 1;
    }

    /// Make the top slot's accumulator current for both perspectives
    pub fn evaluate<const D: usize, A: SlotAccessor<D>>(
        &mut self,
        pos: &Position,
        ft: &FeatureTransformer<D>,
        cache: &mut AccumulatorCache<D>,
    ) {
        self.evaluate_side::<D, A>(Color::White, pos, ft, cache);
        self.evaluate_side::<D, A>(Color::Black, pos, ft, cache);
    }

    /// Make the top slot's accumulator current for one perspective
    pub fn evaluate_side<const D: usize, A: SlotAccessor<D>>(
        &mut self,
        perspective: Color,
        pos: &Position,
        ft: &FeatureTransformer<D>,
        cache: &mut AccumulatorCache<D>,
    ) {
        let anchor = self.find_last_usable_accumulator::<D, A>(perspective);

        if A::acc(&self.states[anchor]).computed[perspective.index()] {
            self.forward_update_incremental::<D, A>(perspective, pos, ft, anchor);
        } else {
            update_refresh_via_cache::<D, A>(ft, pos, self.mut_latest(), cache, perspective);
            self.backward_update_incremental::<D, A>(perspective, pos, ft, anchor);
        }
    }

    /// Scan downward from the top for the nearest usable slot: either one
    /// already computed for `perspective`, or the slot whose incoming move
    /// makes any incremental step across it invalid.
    fn find_last_usable_accumulator<const D: usize, A: SlotAccessor<D>>(
        &self,
        perspective: Color,
    ) -> usize {
        for idx in (1..self.current_idx).rev() {
            if A::acc(&self.states[idx]).computed[perspective.index()] {
                return idx;
            }
            if requires_refresh(&self.states[idx].dirty_piece, perspective) {
                return idx;
            }
        }
        0
    }

    /// Propagate deltas upward from the computed slot `begin` to the top
    fn forward_update_incremental<const D: usize, A: SlotAccessor<D>>(
        &mut self,
        perspective: Color,
        pos: &Position,
        ft: &FeatureTransformer<D>,
        begin: usize,
    ) {
        debug_assert!(begin < self.current_idx);
        debug_assert!(A::acc(&self.states[begin]).computed[perspective.index()]);

        let ksq = pos.king_square(perspective);
        for next in begin + 1..self.current_idx {
            let (target, source) = split_pair(&mut self.states, next, next - 1);
            update_incremental::<D, A>(
                ft,
                ksq,
                perspective,
                UpdateDirection::Forward,
                target,
                source,
            );
        }

        debug_assert!(A::acc(self.latest()).computed[perspective.index()]);
    }

    /// Fill ancestors downward from the freshly refreshed top to `end`,
    /// applying each intervening move's delta in reverse
    fn backward_update_incremental<const D: usize, A: SlotAccessor<D>>(
        &mut self,
        perspective: Color,
        pos: &Position,
        ft: &FeatureTransformer<D>,
        end: usize,
    ) {
        debug_assert!(end < self.current_idx);
        debug_assert!(A::acc(self.latest()).computed[perspective.index()]);

        let ksq = pos.king_square(perspective);
        for next in (end..self.current_idx - 1).rev() {
            let (target, source) = split_pair(&mut self.states, next, next + 1);
            update_incremental::<D, A>(
                ft,
                ksq,
                perspective,
                UpdateDirection::Backward,
                target,
                source,
            );
        }

        debug_assert!(A::acc(&self.states[end]).computed[perspective.index()]);
    }
}

impl Default for AccumulatorStack {
    fn default() -> Self {
        Self::new(MAX_PLY + 1)
    }
}

/// Disjoint mutable/shared borrows of two stack slots
#[inline]
fn split_pair(
    states: &mut [AccumulatorState],
    target: usize,
    source: usize,
) -> (&mut AccumulatorState, &AccumulatorState) {
    debug_assert_ne!(target, source);
    if target < source {
        let (left, right) = states.split_at_mut(source);
        (&mut left[target], &right[0])
    } else {
        let (left, right) = states.split_at_mut(target);
        (&mut right[0], &left[source])
    }
}

/// Apply one move's delta from a computed slot onto its neighbor.
///
/// Forward reads the target's dirty-piece record; backward reads the
/// source's with added and removed swapped, which is exactly the inverse
/// move. Both king squares are the live position's: the caller guarantees
/// no king move of `perspective` lies between source and target.
fn update_incremental<const D: usize, A: SlotAccessor<D>>(
    ft: &FeatureTransformer<D>,
    ksq: Square,
    perspective: Color,
    direction: UpdateDirection,
    target: &mut AccumulatorState,
    source: &AccumulatorState,
) {
    let mut removed = IndexList::new();
    let mut added = IndexList::new();
    match direction {
        UpdateDirection::Forward => {
            append_changed_indices(perspective, ksq, &target.dirty_piece, &mut removed, &mut added)
        }
        UpdateDirection::Backward => {
            append_changed_indices(perspective, ksq, &source.dirty_piece, &mut added, &mut removed)
        }
    }

    debug_assert!(matches!(added.len(), 1 | 2));
    debug_assert!(matches!(removed.len(), 1 | 2));
    match direction {
        UpdateDirection::Forward => debug_assert!(added.len() <= removed.len()),
        UpdateDirection::Backward => debug_assert!(removed.len() <= added.len()),
    }

    let p = perspective.index();
    debug_assert!(A::acc(source).computed[p]);
    debug_assert!(!A::acc(target).computed[p]);

    let src = A::acc(source);
    let dst = A::acc_mut(target);
    match (added.len(), removed.len()) {
        (1, 1) => apply_delta(ft, src, dst, p, &[added[0]], &[removed[0]]),
        (1, 2) => apply_delta(ft, src, dst, p, &[added[0]], &[removed[0], removed[1]]),
        (2, 1) => apply_delta(ft, src, dst, p, &[added[0], added[1]], &[removed[0]]),
        (2, 2) => {
            apply_delta(ft, src, dst, p, &[added[0], added[1]], &[removed[0], removed[1]])
        }
        _ => debug_assert!(false, "invalid update shape"),
    }
    dst.computed[p] = true;
}

/// Fused application of one delta to the hidden and PSQT vectors
fn apply_delta<const D: usize>(
    ft: &FeatureTransformer<D>,
    source: &Accumulator<D>,
    target: &mut Accumulator<D>,
    perspective: usize,
    added: &[IndexType],
    removed: &[IndexType],
) {
    let adds: SmallVec<[&[i16]; 2]> = added.iter().map(|&i| ft.row(i)).collect();
    let subs: SmallVec<[&[i16]; 2]> = removed.iter().map(|&i| ft.row(i)).collect();
    simd::fused_row_reduce_i16(
        &source.accumulation[perspective].0,
        &mut target.accumulation[perspective].0,
        &adds,
        &subs,
    );

    let psqt_adds: SmallVec<[&[i32]; 2]> = added.iter().map(|&i| ft.psqt_row(i)).collect();
    let psqt_subs: SmallVec<[&[i32]; 2]> = removed.iter().map(|&i| ft.psqt_row(i)).collect();
    simd::fused_row_reduce_i32(
        &source.psqt_accumulation[perspective].0,
        &mut target.psqt_accumulation[perspective].0,
        &psqt_adds,
        &psqt_subs,
    );
}

/// Rebuild one perspective's accumulator in `state` from the cache entry
/// keyed by the live king square.
///
/// The entry's bitboards say which position its snapshot describes; the
/// snapshot is moved to `pos` by a differential pass and then copied into
/// the slot, so the entry always leaves this function describing `pos`.
/// When the add and remove counts differ by one and there are more than
/// two columns in total, the odd column rides along in the final fused
/// pass instead of taking a pass of its own.
pub fn update_refresh_via_cache<const D: usize, A: SlotAccessor<D>>(
    ft: &FeatureTransformer<D>,
    pos: &Position,
    state: &mut AccumulatorState,
    cache: &mut AccumulatorCache<D>,
    perspective: Color,
) {
    let ksq = pos.king_square(perspective);
    let entry = cache.entry_mut(ksq, perspective);

    let mut removed = IndexList::new();
    let mut added = IndexList::new();
    for color in Color::ALL {
        for kind in PieceType::ALL {
            let piece = Piece::new(kind, color);
            let old_bb = entry.by_color_bb[color.index()] & entry.by_type_bb[kind.index()];
            let new_bb = pos.pieces(color, kind);

            let mut to_remove = old_bb & !new_bb;
            while let Some(sq) = to_remove.pop_lsb() {
                removed.push(make_index(perspective, sq, piece, ksq));
            }
            let mut to_add = new_bb & !old_bb;
            while let Some(sq) = to_add.pop_lsb() {
                added.push(make_index(perspective, sq, piece, ksq));
            }
        }
    }

    let combine_last3 =
        removed.len().abs_diff(added.len()) == 1 && removed.len() + added.len() > 2;
    let pairs = removed.len().min(added.len()) - combine_last3 as usize;

    for i in 0..pairs {
        simd::fused_row_reduce_in_place_i16(
            &mut entry.accumulation.0,
            &[ft.row(added[i])],
            &[ft.row(removed[i])],
        );
    }
    if combine_last3 {
        let i = pairs;
        if removed.len() > added.len() {
            simd::fused_row_reduce_in_place_i16(
                &mut entry.accumulation.0,
                &[ft.row(added[i])],
                &[ft.row(removed[i]), ft.row(removed[i + 1])],
            );
        } else {
            simd::fused_row_reduce_in_place_i16(
                &mut entry.accumulation.0,
                &[ft.row(added[i]), ft.row(added[i + 1])],
                &[ft.row(removed[i])],
            );
        }
    } else {
        for &index in &removed[pairs..] {
            simd::fused_row_reduce_in_place_i16(&mut entry.accumulation.0, &[], &[ft.row(index)]);
        }
        for &index in &added[pairs..] {
            simd::fused_row_reduce_in_place_i16(&mut entry.accumulation.0, &[ft.row(index)], &[]);
        }
    }

    for &index in removed.iter() {
        simd::fused_row_reduce_in_place_i32(
            &mut entry.psqt_accumulation.0,
            &[],
            &[ft.psqt_row(index)],
        );
    }
    for &index in added.iter() {
        simd::fused_row_reduce_in_place_i32(
            &mut entry.psqt_accumulation.0,
            &[ft.psqt_row(index)],
            &[],
        );
    }

    // The entry now describes `pos`; copy it into the slot and re-key it.
    let acc = A::acc_mut(state);
    acc.accumulation[perspective.index()].0.copy_from_slice(&entry.accumulation.0);
    acc.psqt_accumulation[perspective.index()]
        .0
        .copy_from_slice(&entry.psqt_accumulation.0);
    acc.computed[perspective.index()] = true;

    for color in Color::ALL {
        entry.by_color_bb[color.index()] = pos.pieces_by_color(color);
    }
    for kind in PieceType::ALL {
        entry.by_type_bb[kind.index()] = pos.pieces_by_type(kind);
    }
}
