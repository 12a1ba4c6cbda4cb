//! The firing engine: one synchronous round of token redistribution.
//!
//! # Algorithm
//!
//! 1. Active nodes are those holding tokens and not knocked out.
//! 2. Every active node with outgoing edges drains all `n` of its tokens:
//!    each of its `k` distinct successors gets `n / k`, and the `n % k`
//!    leftover tokens go one by one to successors drawn uniformly **with
//!    replacement**. Sinks (no outgoing edges) keep their tokens.
//!    Knocked-out successors are not targets; a node whose successors are
//!    all knocked out is blocked and keeps its tokens like a sink.
//! 3. All deltas are collected in a buffer covering every node and applied
//!    in one batch only after every resulting count has been checked.
//!
//! # Determinism
//!
//! The injected RNG is consulted exactly once per step, for a 64-bit step
//! seed. Each active node then draws its remainder targets from its own
//! ChaCha8 stream keyed by `(step seed, node id)`, so the outcome does not
//! depend on the order in which active nodes are visited.

use crate::error::Result;
use crate::node::{Node, NodeId};
use crate::pathway::Pathway;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// Summary of one completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// Step number (1 for the first step)
    pub step: u64,
    /// Active nodes at the start of the step
    pub active: usize,
    /// Active nodes that drained tokens to successors
    pub fired: usize,
    /// Active nodes that kept their tokens because they have no successors
    pub sinks: usize,
    /// Active nodes whose successors are all knocked out
    pub blocked: usize,
    /// Tokens drained from firing nodes
    pub moved_tokens: u64,
}

/// Pending deltas for one step, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StepPlan {
    pub(crate) buffer: BTreeMap<NodeId, i128>,
    pub(crate) active: usize,
    pub(crate) fired: usize,
    pub(crate) sinks: usize,
    pub(crate) blocked: usize,
    pub(crate) moved_tokens: u64,
}

/// Seed of the remainder stream for `node` within a step.
fn node_stream_seed(step_seed: u64, node: NodeId) -> u64 {
    step_seed
        .wrapping_mul(0x9e3779b97f4a7c15)
        .wrapping_add(u64::from(node.get()).wrapping_mul(0x517cc1b727220a95))
}

/// Adds a firing node's outflow over `targets` (non-empty) to `buffer`.
fn distribute(
    node: &Node,
    targets: &[NodeId],
    step_seed: u64,
    buffer: &mut BTreeMap<NodeId, i128>,
) {
    let k = targets.len() as u64;
    let n = node.tokens;
    let baseline = n / k;
    let remainder = n % k;

    for target in targets {
        *buffer.entry(*target).or_insert(0) += i128::from(baseline);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(node_stream_seed(step_seed, node.id));
    for _ in 0..remainder {
        let target = targets[rng.gen_range(0..targets.len())];
        *buffer.entry(target).or_insert(0) += 1;
    }

    *buffer.entry(node.id).or_insert(0) -= i128::from(n);
}

impl Pathway {
    /// Fires every active node once and applies the result atomically.
    ///
    /// On error nothing is mutated and the step counter is unchanged.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<StepReport> {
        let step_seed: u64 = rng.gen();
        let active: Vec<NodeId> = self.active_nodes().into_iter().collect();

        debug!(step = self.steps_taken + 1, "before: {}", self.describe_active());

        let plan = self.plan_step(&active, step_seed);
        let report = self.apply_plan(plan)?;

        debug!(step = report.step, "after: {}", self.describe_active());
        Ok(report)
    }

    /// Runs `steps` steps, stopping at the first error.
    pub fn run<R: Rng + ?Sized>(&mut self, steps: usize, rng: &mut R) -> Result<Vec<StepReport>> {
        (0..steps).map(|_| self.step(rng)).collect()
    }

    /// Computes the deltas of one step for the given active nodes.
    pub(crate) fn plan_step(&self, active: &[NodeId], step_seed: u64) -> StepPlan {
        let mut buffer: BTreeMap<NodeId, i128> = self.nodes.keys().map(|id| (*id, 0)).collect();
        let mut fired = 0;
        let mut sinks = 0;
        let mut blocked = 0;
        let mut moved_tokens = 0u64;

        for id in active {
            let Some(node) = self.nodes.get(id) else { continue };
            if node.is_sink() {
                sinks += 1;
                continue;
            }
            let targets = self.firing_targets(node);
            if targets.is_empty() {
                blocked += 1;
                continue;
            }
            distribute(node, &targets, step_seed, &mut buffer);
            fired += 1;
            moved_tokens = moved_tokens.saturating_add(node.tokens);
        }

        StepPlan {
            buffer,
            active: active.len(),
            fired,
            sinks,
            blocked,
            moved_tokens,
        }
    }

    /// Successors that can receive tokens, in id order.
    fn firing_targets(&self, node: &Node) -> Vec<NodeId> {
        node.outgoing
            .iter()
            .filter(|id| self.nodes.get(*id).is_some_and(|n| !n.knockout))
            .copied()
            .collect()
    }

    /// Checks every delta, then applies all of them.
    pub(crate) fn apply_plan(&mut self, plan: StepPlan) -> Result<StepReport> {
        let mut updates = Vec::with_capacity(plan.buffer.len());
        for (id, delta) in &plan.buffer {
            if *delta == 0 {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                updates.push((*id, node.checked_tokens(*delta)?));
            }
        }

        for (id, tokens) in updates {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.tokens = tokens;
            }
        }
        self.steps_taken += 1;

        Ok(StepReport {
            step: self.steps_taken,
            active: plan.active,
            fired: plan.fired,
            sinks: plan.sinks,
            blocked: plan.blocked,
            moved_tokens: plan.moved_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathwayError;
    use crate::pathway::tests::net;
    use proptest::prelude::*;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn tokens(pw: &Pathway, id: u32) -> u64 {
        pw.tokens(NodeId(id)).unwrap()
    }

    #[test]
    fn test_two_way_split() {
        let mut pw = net(&[1, 2, 3], &[(1, 2), (1, 3)]);
        pw.set_initial_marking([(NodeId(1), 10)]).unwrap();

        let report = pw.step(&mut rng(42)).unwrap();

        assert_eq!(tokens(&pw, 1), 0);
        assert_eq!(tokens(&pw, 2), 5);
        assert_eq!(tokens(&pw, 3), 5);
        assert_eq!(report.step, 1);
        assert_eq!(report.fired, 1);
        assert_eq!(report.moved_tokens, 10);
    }

    #[test]
    fn test_remainder_distribution() {
        for seed in 0..20 {
            let mut pw = net(&[1, 2, 3, 4], &[(1, 2), (1, 3), (1, 4)]);
            pw.set_initial_marking([(NodeId(1), 7)]).unwrap();

            pw.step(&mut rng(seed)).unwrap();

            let received: Vec<u64> = [2, 3, 4].iter().map(|id| tokens(&pw, *id)).collect();
            assert_eq!(tokens(&pw, 1), 0);
            assert!(received.iter().all(|r| *r >= 2));
            assert_eq!(received.iter().sum::<u64>(), 7);
            assert_eq!(received.iter().filter(|r| **r == 3).count(), 1);
        }
    }

    #[test]
    fn test_remainder_drawn_with_replacement() {
        // 2 tokens over 3 successors: with replacement both extras may land
        // on the same successor for some seed.
        let doubled = (0..200).any(|seed| {
            let mut pw = net(&[1, 2, 3, 4], &[(1, 2), (1, 3), (1, 4)]);
            pw.set_initial_marking([(NodeId(1), 2)]).unwrap();
            pw.step(&mut rng(seed)).unwrap();
            [2, 3, 4].iter().any(|id| tokens(&pw, *id) == 2)
        });
        assert!(doubled);
    }

    #[test]
    fn test_sink_keeps_tokens() {
        let mut pw = net(&[1, 2], &[(1, 2)]);
        pw.set_initial_marking([(NodeId(1), 3)]).unwrap();

        let mut r = rng(7);
        let first = pw.step(&mut r).unwrap();
        assert_eq!(first.fired, 1);

        for _ in 0..5 {
            let report = pw.step(&mut r).unwrap();
            assert_eq!(report.sinks, 1);
            assert_eq!(report.fired, 0);
        }
        assert_eq!(tokens(&pw, 2), 3);
        assert_eq!(pw.steps_taken(), 6);
    }

    #[test]
    fn test_self_loop_keeps_tokens_in_place() {
        let mut pw = net(&[1], &[(1, 1)]);
        pw.set_initial_marking([(NodeId(1), 9)]).unwrap();

        pw.step(&mut rng(1)).unwrap();
        assert_eq!(tokens(&pw, 1), 9);
    }

    #[test]
    fn test_knockout_freezes_tokens() {
        // 1 -> 2 -> 3, with 2 knocked out while holding tokens
        let mut pw = net(&[1, 2, 3], &[(1, 2), (2, 3)]);
        pw.set_initial_marking([(NodeId(1), 4), (NodeId(2), 6)]).unwrap();
        pw.set_knockouts([("N2", NodeId(2))]).unwrap();

        let mut r = rng(3);
        for _ in 0..3 {
            let report = pw.step(&mut r).unwrap();
            assert_eq!(report.blocked, 1);
            assert_eq!(tokens(&pw, 1), 4);
            assert_eq!(tokens(&pw, 2), 6);
            assert_eq!(tokens(&pw, 3), 0);
        }

        pw.clear_knockouts([NodeId(2)]).unwrap();
        pw.step(&mut r).unwrap();
        assert_eq!(tokens(&pw, 1), 0);
        assert_eq!(tokens(&pw, 2), 4);
        assert_eq!(tokens(&pw, 3), 6);
    }

    #[test]
    fn test_knocked_out_successor_skipped() {
        // 1 -> {2, 3} with 3 knocked out: everything goes to 2
        let mut pw = net(&[1, 2, 3], &[(1, 2), (1, 3)]);
        pw.set_initial_marking([(NodeId(1), 7)]).unwrap();
        pw.set_knockouts([("N3", NodeId(3))]).unwrap();

        pw.step(&mut rng(11)).unwrap();

        assert_eq!(tokens(&pw, 1), 0);
        assert_eq!(tokens(&pw, 2), 7);
        assert_eq!(tokens(&pw, 3), 0);
    }

    #[test]
    fn test_batch_apply_uses_pre_step_counts() {
        // Chain 1 -> 2 -> 3: tokens move a single hop per step
        let mut pw = net(&[1, 2, 3], &[(1, 2), (2, 3)]);
        pw.set_initial_marking([(NodeId(1), 5), (NodeId(2), 1)]).unwrap();

        pw.step(&mut rng(0)).unwrap();

        assert_eq!(tokens(&pw, 1), 0);
        assert_eq!(tokens(&pw, 2), 5);
        assert_eq!(tokens(&pw, 3), 1);
    }

    #[test]
    fn test_same_seed_same_marking() {
        let build = || {
            let mut pw = net(&[1, 2, 3, 4, 5], &[(1, 2), (1, 3), (1, 4), (2, 5), (3, 5), (3, 1)]);
            pw.set_initial_marking([(NodeId(1), 11), (NodeId(3), 5)]).unwrap();
            pw
        };
        let mut a = build();
        let mut b = build();

        a.run(4, &mut rng(99)).unwrap();
        b.run(4, &mut rng(99)).unwrap();

        assert_eq!(a.marking(), b.marking());
    }

    #[test]
    fn test_plan_is_order_independent() {
        let mut pw = net(&[1, 2, 3, 4, 5], &[(1, 3), (1, 4), (1, 5), (2, 3), (2, 4), (2, 5)]);
        pw.set_initial_marking([(NodeId(1), 8), (NodeId(2), 7)]).unwrap();

        let forward: Vec<NodeId> = pw.active_nodes().into_iter().collect();
        let backward: Vec<NodeId> = forward.iter().rev().copied().collect();

        assert_eq!(pw.plan_step(&forward, 1234), pw.plan_step(&backward, 1234));
    }

    #[test]
    fn test_invalid_plan_aborts_without_mutation() {
        let mut pw = net(&[1, 2], &[(1, 2)]);
        pw.set_initial_marking([(NodeId(1), 2)]).unwrap();

        let mut plan = pw.plan_step(&[NodeId(1)], 5);
        // Corrupt the bookkeeping: drain more than the node holds
        plan.buffer.insert(NodeId(1), -3);

        let err = pw.apply_plan(plan).unwrap_err();
        assert!(matches!(
            err,
            PathwayError::NegativeTokenInvariant { node: NodeId(1), tokens: 2, delta: -3 }
        ));
        assert_eq!(tokens(&pw, 1), 2);
        assert_eq!(tokens(&pw, 2), 0);
        assert_eq!(pw.steps_taken(), 0);
    }

    #[test]
    fn test_inflow_overflow_reported_as_overflow() {
        let mut pw = net(&[1, 2], &[(1, 2)]);
        pw.set_initial_marking([(NodeId(2), u64::MAX)]).unwrap();

        let mut plan = pw.plan_step(&[NodeId(2)], 5);
        plan.buffer.insert(NodeId(2), 1);

        let err = pw.apply_plan(plan).unwrap_err();
        assert!(matches!(
            err,
            PathwayError::TokenOverflow { node: NodeId(2), tokens: u64::MAX, delta: 1 }
        ));
        assert_eq!(tokens(&pw, 2), u64::MAX);
        assert_eq!(pw.steps_taken(), 0);
    }

    #[test]
    fn test_empty_marking_step_is_noop() {
        let mut pw = net(&[1, 2], &[(1, 2)]);
        let report = pw.step(&mut rng(0)).unwrap();
        assert_eq!(report.active, 0);
        assert_eq!(pw.total_tokens(), 0);
        assert_eq!(pw.steps_taken(), 1);
    }

    /// Random graph over ids 1..=n plus a random marking.
    fn arb_net() -> impl Strategy<Value = (Vec<u32>, Vec<(u32, u32)>, Vec<(u32, u64)>)> {
        (2u32..8).prop_flat_map(|n| {
            let edges = prop::collection::vec((1..=n, 1..=n), 0..20);
            let marking = prop::collection::vec((1..=n, 0u64..50), 0..6);
            (Just((1..=n).collect::<Vec<_>>()), edges, marking)
        })
    }

    proptest! {
        #[test]
        fn prop_total_tokens_conserved((ids, edges, marking) in arb_net(), seed in any::<u64>()) {
            let mut pw = net(&ids, &edges);
            pw.set_initial_marking(marking.iter().map(|(id, t)| (NodeId(*id), *t))).unwrap();
            let total = pw.total_tokens();

            let mut r = rng(seed);
            for _ in 0..5 {
                pw.step(&mut r).unwrap();
                prop_assert_eq!(pw.total_tokens(), total);
            }
        }

        #[test]
        fn prop_firing_node_outflow_matches_tokens(
            (ids, edges, marking) in arb_net(),
            seed in any::<u64>(),
        ) {
            let mut pw = net(&ids, &edges);
            pw.set_initial_marking(marking.iter().map(|(id, t)| (NodeId(*id), *t))).unwrap();

            for id in pw.active_nodes() {
                let node = pw.node(id).unwrap();
                let targets = pw.firing_targets(node);
                if targets.is_empty() {
                    continue;
                }
                let mut buffer = BTreeMap::new();
                distribute(node, &targets, seed, &mut buffer);

                let received: i128 = targets.iter().map(|t| buffer[t]).sum::<i128>()
                    + if targets.contains(&id) { i128::from(node.tokens) } else { 0 };
                let baseline = i128::from(node.tokens / targets.len() as u64);
                prop_assert_eq!(received, i128::from(node.tokens));
                prop_assert!(targets.iter().filter(|t| **t != id).all(|t| buffer[t] >= baseline));
                prop_assert_eq!(buffer.values().sum::<i128>(), 0);
            }
        }

        #[test]
        fn prop_order_independent((ids, edges, marking) in arb_net(), seed in any::<u64>()) {
            let mut pw = net(&ids, &edges);
            pw.set_initial_marking(marking.iter().map(|(id, t)| (NodeId(*id), *t))).unwrap();

            let forward: Vec<NodeId> = pw.active_nodes().into_iter().collect();
            let mut shuffled = forward.clone();
            shuffled.reverse();
            shuffled.rotate_left(forward.len() / 2);

            prop_assert_eq!(pw.plan_step(&forward, seed), pw.plan_step(&shuffled, seed));
        }

        #[test]
        fn prop_knocked_out_nodes_never_change(
            (ids, edges, marking) in arb_net(),
            seed in any::<u64>(),
            ko in 1u32..3,
        ) {
            let mut pw = net(&ids, &edges);
            pw.set_initial_marking(marking.iter().map(|(id, t)| (NodeId(*id), *t))).unwrap();
            let target = NodeId(ko);
            pw.set_knockouts([("", target)]).unwrap();
            let before = pw.tokens(target).unwrap();

            let mut r = rng(seed);
            for _ in 0..5 {
                pw.step(&mut r).unwrap();
                prop_assert_eq!(pw.tokens(target).unwrap(), before);
            }
        }

        #[test]
        fn prop_sinks_never_lose_tokens((ids, edges, marking) in arb_net(), seed in any::<u64>()) {
            let mut pw = net(&ids, &edges);
            pw.set_initial_marking(marking.iter().map(|(id, t)| (NodeId(*id), *t))).unwrap();
            let sinks: Vec<NodeId> = pw.nodes().filter(|n| n.is_sink()).map(|n| n.id).collect();

            let mut r = rng(seed);
            for _ in 0..5 {
                let before: Vec<u64> = sinks.iter().map(|id| pw.tokens(*id).unwrap()).collect();
                pw.step(&mut r).unwrap();
                for (id, prev) in sinks.iter().zip(before) {
                    prop_assert!(pw.tokens(*id).unwrap() >= prev);
                }
            }
        }
    }
}
