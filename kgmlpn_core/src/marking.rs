//! Marking and knockout control.
//!
//! These operations change token counts and knockout flags but never the
//! topology. Every directive is validated before anything is mutated, so a
//! rejected call leaves the pathway exactly as it was.

use crate::error::{PathwayError, Result};
use crate::node::NodeId;
use crate::pathway::{ensure_total_fits, Pathway};
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl Pathway {
    /// Adds tokens to nodes. Additive: calling twice accumulates.
    ///
    /// Fails with `TokenOverflow` if a node would exceed `u64::MAX`, and with
    /// `TokenTotalOverflow` if the whole net would.
    pub fn set_initial_marking<I>(&mut self, marking: I) -> Result<()>
    where
        I: IntoIterator<Item = (NodeId, u64)>,
    {
        let marking: Vec<(NodeId, u64)> = marking.into_iter().collect();
        self.ensure_known(marking.iter().map(|(id, _)| *id))?;

        // Sum per node first so overflow is caught before any mutation
        let mut pending: BTreeMap<NodeId, u128> = BTreeMap::new();
        for (id, count) in marking {
            *pending.entry(id).or_insert(0) += u128::from(count);
        }

        let mut updates = Vec::with_capacity(pending.len());
        for (id, count) in &pending {
            let tokens = self.nodes[id].tokens;
            let marked = u64::try_from(u128::from(tokens) + count).map_err(|_| {
                PathwayError::TokenOverflow {
                    node: *id,
                    tokens,
                    delta: i128::try_from(*count).unwrap_or(i128::MAX),
                }
            })?;
            updates.push((*id, *count, marked));
        }
        let added: u128 = pending.values().sum();
        ensure_total_fits(u128::from(self.total_tokens()) + added)?;

        for (id, count, marked) in updates {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.tokens = marked;
                debug!("Marked {} ({}) with {} tokens -> {}", node.display_name, id, count, marked);
            }
        }
        Ok(())
    }

    /// Knocks out nodes. Keys are labels (gene names or KEGG handles) used
    /// only for cross-checking; the id decides which node is affected.
    ///
    /// Tokens already on a knocked-out node stay there, frozen, until the
    /// knockout is cleared.
    pub fn set_knockouts<I, S>(&mut self, knockouts: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, NodeId)>,
        S: AsRef<str>,
    {
        let knockouts: Vec<(S, NodeId)> = knockouts.into_iter().collect();
        self.ensure_known(knockouts.iter().map(|(_, id)| *id))?;

        for (label, id) in &knockouts {
            if let Some(node) = self.nodes.get_mut(id) {
                let label = label.as_ref();
                if !node.display_name.eq_ignore_ascii_case(label) && node.external_handle != label {
                    warn!(
                        "Knockout label '{}' does not match node {} ({} / {})",
                        label, id, node.display_name, node.external_handle
                    );
                }
                node.knockout = true;
                debug!("Knocked out {} ({}) holding {} tokens", node.display_name, id, node.tokens);
            }
        }
        Ok(())
    }

    /// Clears knockout flags; frozen tokens flow again from the next step.
    pub fn clear_knockouts<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let ids: Vec<NodeId> = ids.into_iter().collect();
        self.ensure_known(ids.iter().copied())?;

        for id in ids {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.knockout = false;
            }
        }
        Ok(())
    }

    fn ensure_known(&self, mut ids: impl Iterator<Item = NodeId>) -> Result<()> {
        match ids.find(|id| !self.nodes.contains_key(id)) {
            Some(missing) => Err(PathwayError::UnknownNode(missing)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PathwayError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use crate::node::NodeId;
    use crate::pathway::tests::net;

    #[test]
    fn test_initial_marking_is_additive() {
        let mut pw = net(&[60, 58], &[(60, 58)]);

        pw.set_initial_marking([(NodeId(60), 10)]).unwrap();
        pw.set_initial_marking([(NodeId(60), 5), (NodeId(58), 3)]).unwrap();

        assert_eq!(pw.tokens(NodeId(60)).unwrap(), 15);
        assert_eq!(pw.tokens(NodeId(58)).unwrap(), 3);
    }

    #[test]
    fn test_repeated_ids_in_one_call_accumulate() {
        let mut pw = net(&[1], &[]);
        pw.set_initial_marking([(NodeId(1), 2), (NodeId(1), 4)]).unwrap();
        assert_eq!(pw.tokens(NodeId(1)).unwrap(), 6);
    }

    #[test]
    fn test_unknown_node_leaves_marking_untouched() {
        let mut pw = net(&[1, 2], &[(1, 2)]);

        let err = pw
            .set_initial_marking([(NodeId(1), 4), (NodeId(77), 1)])
            .unwrap_err();

        assert!(matches!(err, PathwayError::UnknownNode(NodeId(77))));
        assert_eq!(pw.total_tokens(), 0);
    }

    #[test]
    fn test_overflowing_marking_rejected() {
        let mut pw = net(&[1], &[]);
        pw.set_initial_marking([(NodeId(1), u64::MAX)]).unwrap();

        assert!(pw.set_initial_marking([(NodeId(1), 1)]).is_err());
        assert_eq!(pw.tokens(NodeId(1)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_overflowing_node_reports_overflow() {
        let mut pw = net(&[1], &[]);
        pw.set_initial_marking([(NodeId(1), u64::MAX - 1)]).unwrap();

        let err = pw
            .set_initial_marking([(NodeId(1), 1), (NodeId(1), 1)])
            .unwrap_err();

        assert!(matches!(
            err,
            PathwayError::TokenOverflow { node: NodeId(1), tokens, delta: 2 }
                if tokens == u64::MAX - 1
        ));
    }

    #[test]
    fn test_net_total_capped_at_u64() {
        let half = u64::MAX / 2 + 1;
        let mut pw = net(&[1, 2, 3], &[(1, 3), (2, 3)]);
        pw.set_initial_marking([(NodeId(1), half)]).unwrap();

        let err = pw.set_initial_marking([(NodeId(2), half)]).unwrap_err();

        assert!(matches!(
            err,
            PathwayError::TokenTotalOverflow { total } if total == 2 * u128::from(half)
        ));
        assert_eq!(pw.tokens(NodeId(2)).unwrap(), 0);
        assert_eq!(pw.total_tokens(), half);
    }

    #[test]
    fn test_full_u64_marking_steps_without_overflow() {
        // Two sources feeding one sink, holding u64::MAX tokens together
        let mut pw = net(&[1, 2, 3], &[(1, 3), (2, 3)]);
        pw.set_initial_marking([(NodeId(1), u64::MAX / 2), (NodeId(2), u64::MAX / 2 + 1)])
            .unwrap();
        assert_eq!(pw.total_tokens(), u64::MAX);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        pw.step(&mut rng).unwrap();

        assert_eq!(pw.tokens(NodeId(3)).unwrap(), u64::MAX);
        assert_eq!(pw.total_tokens(), u64::MAX);
    }

    #[test]
    fn test_knockout_keeps_tokens() {
        let mut pw = net(&[38, 65], &[(38, 65)]);
        pw.set_initial_marking([(NodeId(38), 4)]).unwrap();

        pw.set_knockouts([("N38", NodeId(38))]).unwrap();

        assert_eq!(pw.tokens(NodeId(38)).unwrap(), 4);
        assert!(pw.node(NodeId(38)).unwrap().knockout);
        assert!(pw.active_nodes().is_empty());
        assert_eq!(pw.knocked_out().len(), 1);
    }

    #[test]
    fn test_knockout_unknown_node_rejected_atomically() {
        let mut pw = net(&[38, 65], &[(38, 65)]);

        let err = pw
            .set_knockouts([("RAC1", NodeId(38)), ("TICAM2", NodeId(650))])
            .unwrap_err();

        assert!(matches!(err, PathwayError::UnknownNode(NodeId(650))));
        assert!(pw.knocked_out().is_empty());
    }

    #[test]
    fn test_clear_knockouts() {
        let mut pw = net(&[1, 2], &[(1, 2)]);
        pw.set_initial_marking([(NodeId(1), 1)]).unwrap();
        pw.set_knockouts([("N1", NodeId(1))]).unwrap();
        assert!(pw.active_nodes().is_empty());

        pw.clear_knockouts([NodeId(1)]).unwrap();
        assert_eq!(pw.active_nodes().len(), 1);
    }
}
