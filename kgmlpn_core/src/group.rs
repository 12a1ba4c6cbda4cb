//! Display-only clusters of nodes (KGML `group` entries).

use crate::node::{LayoutBox, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A complex of two or more nodes. Never takes part in token flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: NodeId,
    pub display_name: String,
    pub member_node_ids: BTreeSet<NodeId>,
    pub layout: LayoutBox,
}

impl Group {
    pub fn contains(&self, id: NodeId) -> bool {
        self.member_node_ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.member_node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_node_ids.is_empty()
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group id: {} (Nodes: {:?})", self.id, self.member_node_ids)
    }
}
