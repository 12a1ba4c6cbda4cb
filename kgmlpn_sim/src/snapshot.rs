//! JSON snapshot of a pathway for an external renderer.
//!
//! Carries exactly what a renderer draws: node boxes with tokens and
//! knockout flags, relation arrows and group outlines. One snapshot is the
//! state after a single step; no history is kept.

use kgmlpn_core::{LayoutBox, NodeId, Pathway};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A node as drawn by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub kind: String,
    pub layout: LayoutBox,
    pub tokens: u64,
    pub knockout: bool,
}

/// A relation arrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionView {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: String,
}

/// A group outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: NodeId,
    pub name: String,
    pub members: BTreeSet<NodeId>,
    pub layout: LayoutBox,
}

/// Complete current-state view of a pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwaySnapshot {
    /// File or label the pathway was loaded from
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Steps taken so far
    pub step: u64,

    /// Tokens across all nodes
    pub total_tokens: u64,

    pub nodes: Vec<NodeView>,
    pub transitions: Vec<TransitionView>,
    pub groups: Vec<GroupView>,
}

impl PathwaySnapshot {
    /// Captures the current state of `pathway`.
    pub fn capture(pathway: &Pathway) -> Self {
        let meta = pathway.meta();
        Self {
            source: meta.source.clone(),
            title: meta.title.clone(),
            step: pathway.steps_taken(),
            total_tokens: pathway.total_tokens(),
            nodes: pathway
                .nodes()
                .map(|node| NodeView {
                    id: node.id,
                    name: node.display_name.clone(),
                    kind: node.kind.as_str().to_string(),
                    layout: node.layout,
                    tokens: node.tokens,
                    knockout: node.knockout,
                })
                .collect(),
            transitions: pathway
                .transitions()
                .iter()
                .map(|t| TransitionView {
                    from: t.from_id,
                    to: t.to_id,
                    kind: t.kind.as_str().to_string(),
                })
                .collect(),
            groups: pathway
                .groups()
                .map(|group| GroupView {
                    id: group.id,
                    name: group.display_name.clone(),
                    members: group.member_node_ids.clone(),
                    layout: group.layout,
                })
                .collect(),
        }
    }

    /// Returns the node view for `id`.
    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tlr_pathway;

    #[test]
    fn test_capture_renderer_fields() {
        let mut pathway = tlr_pathway();
        pathway.set_initial_marking([(NodeId(60), 10)]).unwrap();
        pathway.set_knockouts([("RAC1", NodeId(38))]).unwrap();

        let snapshot = PathwaySnapshot::capture(&pathway);

        assert_eq!(snapshot.title.as_deref(), Some("Toll-like receptor signaling pathway"));
        assert_eq!(snapshot.step, 0);
        assert_eq!(snapshot.total_tokens, 10);
        assert_eq!(snapshot.nodes.len(), 15);
        assert_eq!(snapshot.transitions.len(), 16);
        assert_eq!(snapshot.groups.len(), 1);

        let tlr1 = snapshot.node(NodeId(60)).unwrap();
        assert_eq!(tlr1.name, "TLR1");
        assert_eq!(tlr1.kind, "gene");
        assert_eq!(tlr1.tokens, 10);
        assert_eq!(tlr1.layout.x, 180.0);
        assert!(snapshot.node(NodeId(38)).unwrap().knockout);

        let group = &snapshot.groups[0];
        assert_eq!(group.members, BTreeSet::from([NodeId(65), NodeId(66)]));
    }

    #[test]
    fn test_json_shape() {
        let snapshot = PathwaySnapshot::capture(&tlr_pathway());
        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(json["source"], "tlr_excerpt.xml");
        assert_eq!(json["nodes"][0]["id"], 38);
        assert_eq!(json["transitions"][0]["kind"], "activation");
        assert!(json["groups"][0]["members"].is_array());
    }

    #[test]
    fn test_write_to_file() {
        let path =
            std::env::temp_dir().join(format!("kgmlpn_snapshot_{}.json", std::process::id()));
        let snapshot = PathwaySnapshot::capture(&tlr_pathway());

        snapshot.write_to_file(&path).unwrap();
        let restored: PathwaySnapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored, snapshot);
    }
}
