//! Randomized make/unmake chains checked against from-scratch sums

mod common;

use common::{assert_big_matches, assert_small_matches, networks, random_board_move};
use nnue_accumulator::{
    AccumulatorCaches, AccumulatorStack, BigNetwork, Position, SmallNetwork, HIDDEN_BIG,
    HIDDEN_SMALL,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

const CHAIN_LENGTH: usize = 24;

fn evaluate_both(
    stack: &mut AccumulatorStack,
    pos: &Position,
    caches: &mut AccumulatorCaches,
) {
    let networks = networks();
    stack.evaluate::<HIDDEN_BIG, BigNetwork>(pos, &networks.big, &mut caches.big);
    stack.evaluate::<HIDDEN_SMALL, SmallNetwork>(pos, &networks.small, &mut caches.small);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 12, .. ProptestConfig::default() })]

    /// Random mutation chains with evaluations at random plies, then a full
    /// unwind evaluating every depth. Whatever mix of forward, backward and
    /// refresh paths the mask selects, the top accumulator must equal the
    /// from-scratch sum.
    #[test]
    fn prop_random_chain_matches_reference(
        seed in any::<u64>(),
        eval_mask in any::<u32>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut caches = AccumulatorCaches::new();
        let mut stack = AccumulatorStack::new(CHAIN_LENGTH + 8);
        let mut pos = Position::startpos();
        stack.reset(&pos, networks(), &mut caches);

        let mut history = vec![pos.clone()];
        for ply in 0..CHAIN_LENGTH {
            let dp = random_board_move(&mut pos, &mut rng);
            stack.push(dp);
            history.push(pos.clone());

            if eval_mask & (1 << ply) != 0 {
                evaluate_both(&mut stack, &pos, &mut caches);
                assert_big_matches(&stack, &pos, networks());
                assert_small_matches(&stack, &pos, networks());
            }
        }

        for _ in 0..CHAIN_LENGTH {
            stack.pop();
            history.pop();
            let current = history.last().unwrap();
            evaluate_both(&mut stack, current, &mut caches);
            assert_big_matches(&stack, current, networks());
            assert_small_matches(&stack, current, networks());
        }
    }

    /// Two stacks sharing nothing but the weights must agree bit for bit on
    /// the same line, however differently their evaluations are scheduled.
    #[test]
    fn prop_evaluation_schedule_is_immaterial(
        seed in any::<u64>(),
        mask_a in any::<u32>(),
        mask_b in any::<u32>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut pos = Position::startpos();

        let mut caches_a = AccumulatorCaches::new();
        let mut stack_a = AccumulatorStack::new(CHAIN_LENGTH + 8);
        stack_a.reset(&pos, networks(), &mut caches_a);
        let mut caches_b = AccumulatorCaches::new();
        let mut stack_b = AccumulatorStack::new(CHAIN_LENGTH + 8);
        stack_b.reset(&pos, networks(), &mut caches_b);

        for ply in 0..CHAIN_LENGTH {
            let dp = random_board_move(&mut pos, &mut rng);
            stack_a.push(dp);
            stack_b.push(dp);
            if mask_a & (1 << ply) != 0 {
                evaluate_both(&mut stack_a, &pos, &mut caches_a);
            }
            if mask_b & (1 << ply) != 0 {
                evaluate_both(&mut stack_b, &pos, &mut caches_b);
            }
        }

        evaluate_both(&mut stack_a, &pos, &mut caches_a);
        evaluate_both(&mut stack_b, &pos, &mut caches_b);
        for perspective in nnue_accumulator::Color::ALL {
            prop_assert_eq!(
                &stack_a.latest().big.values(perspective)[..],
                &stack_b.latest().big.values(perspective)[..]
            );
            prop_assert_eq!(
                &stack_a.latest().small.values(perspective)[..],
                &stack_b.latest().small.values(perspective)[..]
            );
        }
    }
}
