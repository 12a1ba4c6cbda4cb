//! Places of the Petri net: genes, products and complexes of a KEGG pathway.

use crate::error::{PathwayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a pathway node.
///
/// Taken verbatim from the KGML `entry@id` attribute, never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the raw KGML id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(NodeId)
    }
}

/// Entry type of a node (`entry@type` in KGML).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Gene,
    Ortholog,
    Enzyme,
    Reaction,
    Compound,
    Complex,
    /// Any other entry type, kept verbatim
    Other(String),
}

impl NodeKind {
    /// Parses a KGML entry type label.
    pub fn parse(label: &str) -> Self {
        match label {
            "gene" => NodeKind::Gene,
            "ortholog" => NodeKind::Ortholog,
            "enzyme" => NodeKind::Enzyme,
            "reaction" => NodeKind::Reaction,
            "compound" => NodeKind::Compound,
            "complex" => NodeKind::Complex,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Returns the KGML label.
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Gene => "gene",
            NodeKind::Ortholog => "ortholog",
            NodeKind::Enzyme => "enzyme",
            NodeKind::Reaction => "reaction",
            NodeKind::Compound => "compound",
            NodeKind::Complex => "complex",
            NodeKind::Other(label) => label,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout box handed to the renderer.
///
/// The loader stretches raw KGML coordinates by fixed factors so that boxes
/// drawn by the renderer do not overlap their labels. These factors are part
/// of the rendering contract only; the simulation never reads a layout box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutBox {
    /// Horizontal and vertical position scale.
    pub const POSITION_SCALE: f64 = 1.5;
    /// Width scale.
    pub const WIDTH_SCALE: f64 = 1.75;
    /// Height scale.
    pub const HEIGHT_SCALE: f64 = 1.25;

    /// Builds a layout box from raw KGML graphics values.
    pub fn from_kgml(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: x * Self::POSITION_SCALE,
            y: y * Self::POSITION_SCALE,
            width: width * Self::WIDTH_SCALE,
            height: height * Self::HEIGHT_SCALE,
        }
    }
}

/// A place in the pathway net.
///
/// Only `tokens` and `knockout` change after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// KGML entry id
    pub id: NodeId,

    /// KEGG identifier string (`entry@name`, e.g. "hsa:7096"); not unique
    pub external_handle: String,

    /// Entry type
    pub kind: NodeKind,

    /// First synonym of the graphics label (e.g. "TLR1")
    pub display_name: String,

    /// Renderer layout
    pub layout: LayoutBox,

    /// Tokens currently resting on this node
    pub tokens: u64,

    /// Ids of nodes with a transition into this node
    pub incoming: BTreeSet<NodeId>,

    /// Ids of nodes this node has a transition into
    pub outgoing: BTreeSet<NodeId>,

    /// Knocked-out nodes never fire
    pub knockout: bool,
}

impl Node {
    /// Creates an unmarked, unconnected node.
    pub fn new(
        id: NodeId,
        external_handle: impl Into<String>,
        kind: NodeKind,
        display_name: impl Into<String>,
        layout: LayoutBox,
    ) -> Self {
        Self {
            id,
            external_handle: external_handle.into(),
            kind,
            display_name: display_name.into(),
            layout,
            tokens: 0,
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
            knockout: false,
        }
    }

    /// Adds `delta` tokens (negative to remove).
    ///
    /// Fails instead of clamping when the count would drop below zero or
    /// exceed `u64::MAX`.
    pub fn update_tokens(&mut self, delta: i64) -> Result<()> {
        self.tokens = self.checked_tokens(i128::from(delta))?;
        Ok(())
    }

    /// Token count after applying `delta`, without mutating.
    pub(crate) fn checked_tokens(&self, delta: i128) -> Result<u64> {
        let node = self.id;
        let tokens = self.tokens;
        u64::try_from(i128::from(tokens) + delta).map_err(|_| {
            if delta < 0 {
                PathwayError::NegativeTokenInvariant { node, tokens, delta }
            } else {
                PathwayError::TokenOverflow { node, tokens, delta }
            }
        })
    }

    /// A node with no outgoing transitions keeps its tokens forever.
    pub fn is_sink(&self) -> bool {
        self.outgoing.is_empty()
    }

    /// Holds tokens and is not knocked out.
    pub fn is_active(&self) -> bool {
        self.tokens > 0 && !self.knockout
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Id: {} Node: {} (Tokens: {}, In: {:?}, Out: {:?})",
            self.id, self.display_name, self.tokens, self.incoming, self.outgoing
        )
    }
}
