//! The pathway aggregate: nodes, transitions, groups and the step counter.

use crate::error::{PathwayError, Result};
use crate::group::Group;
use crate::node::{Node, NodeId};
use crate::transition::Transition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attributes of the KGML `pathway` root element plus the source name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayMeta {
    /// File path or caller-supplied label the pathway was loaded from
    pub source: String,
    /// KEGG pathway name (e.g. "path:hsa04620")
    pub name: Option<String>,
    /// Organism code (e.g. "hsa")
    pub org: Option<String>,
    /// Map number (e.g. "04620")
    pub number: Option<String>,
    /// Human readable title
    pub title: Option<String>,
}

/// Checks that a token total fits the `u64` every count is stored in.
pub(crate) fn ensure_total_fits(total: u128) -> Result<u64> {
    u64::try_from(total).map_err(|_| PathwayError::TokenTotalOverflow { total })
}

/// A loaded pathway. Sole owner of every node, transition and group.
#[derive(Debug, Clone)]
pub struct Pathway {
    pub(crate) meta: PathwayMeta,
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) groups: BTreeMap<NodeId, Group>,
    pub(crate) steps_taken: u64,
}

impl Pathway {
    /// Assembles a pathway and derives node adjacency.
    ///
    /// Every transition endpoint and group member must name a node in
    /// `nodes`; groups must not be empty.
    pub fn from_parts(
        meta: PathwayMeta,
        nodes: impl IntoIterator<Item = Node>,
        transitions: Vec<Transition>,
        groups: impl IntoIterator<Item = Group>,
    ) -> Result<Self> {
        let mut node_map = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if node_map.insert(id, node).is_some() {
                return Err(PathwayError::malformed(
                    format!("entry {}", id),
                    "duplicate entry id",
                ));
            }
        }

        for transition in &transitions {
            for id in [transition.from_id, transition.to_id] {
                if !node_map.contains_key(&id) {
                    return Err(PathwayError::dangling(
                        format!("relation {} -> {}", transition.from_id, transition.to_id),
                        id,
                    ));
                }
            }
        }

        let mut group_map = BTreeMap::new();
        for group in groups {
            if group.is_empty() {
                return Err(PathwayError::malformed(
                    format!("group {}", group.id),
                    "group has no components",
                ));
            }
            let missing = group
                .member_node_ids
                .iter()
                .find(|id| !node_map.contains_key(*id));
            if let Some(missing) = missing {
                return Err(PathwayError::dangling(format!("group {}", group.id), *missing));
            }
            group_map.insert(group.id, group);
        }

        ensure_total_fits(node_map.values().map(|n: &Node| u128::from(n.tokens)).sum())?;

        let mut pathway = Self {
            meta,
            nodes: node_map,
            transitions,
            groups: group_map,
            steps_taken: 0,
        };
        pathway.update_node_connections();
        Ok(pathway)
    }

    /// Rebuilds incoming/outgoing sets from the transition list.
    fn update_node_connections(&mut self) {
        for node in self.nodes.values_mut() {
            node.incoming.clear();
            node.outgoing.clear();
        }
        for transition in &self.transitions {
            // Endpoints were validated in from_parts
            if let Some(source) = self.nodes.get_mut(&transition.from_id) {
                source.outgoing.insert(transition.to_id);
            }
            if let Some(target) = self.nodes.get_mut(&transition.to_id) {
                target.incoming.insert(transition.from_id);
            }
        }
    }

    pub fn meta(&self) -> &PathwayMeta {
        &self.meta
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn group(&self, id: NodeId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Number of completed steps.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Ids of all nodes holding tokens that are not knocked out.
    pub fn active_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_active())
            .map(|n| n.id)
            .collect()
    }

    /// Token count of a node.
    pub fn tokens(&self, id: NodeId) -> Result<u64> {
        self.nodes
            .get(&id)
            .map(|n| n.tokens)
            .ok_or(PathwayError::UnknownNode(id))
    }

    /// The current marking, including empty nodes.
    pub fn marking(&self) -> BTreeMap<NodeId, u64> {
        self.nodes.values().map(|n| (n.id, n.tokens)).collect()
    }

    /// Sum of tokens over the whole net.
    ///
    /// Assembly and marking keep this within `u64` and steps conserve it.
    pub fn total_tokens(&self) -> u64 {
        self.nodes
            .values()
            .fold(0u64, |total, n| total.saturating_add(n.tokens))
    }

    /// Ids of knocked-out nodes.
    pub fn knocked_out(&self) -> BTreeSet<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.knockout)
            .map(|n| n.id)
            .collect()
    }

    /// Finds nodes by display name (case-insensitive).
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .values()
            .filter(move |n| n.display_name.eq_ignore_ascii_case(name))
    }

    /// "NAME (tokens)" for every active node, comma separated.
    pub fn describe_active(&self) -> String {
        self.nodes
            .values()
            .filter(|n| n.is_active())
            .map(|n| format!("{} ({})", n.display_name, n.tokens))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
