//! Directed relations between pathway nodes.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Relation kind (`relation/subtype@name` in KGML).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Activation,
    Inhibition,
    Expression,
    Repression,
    BindingAssociation,
    Dissociation,
    Phosphorylation,
    Dephosphorylation,
    Glycosylation,
    Ubiquitination,
    Methylation,
    IndirectEffect,
    StateChange,
    MissingInteraction,
    Compound,
    HiddenCompound,
    /// Relation without a subtype
    Undefined,
    /// Subtype label not in the list above, kept verbatim
    Other(String),
}

impl RelationKind {
    /// Parses a KGML subtype name.
    pub fn parse(label: &str) -> Self {
        match label {
            "activation" => RelationKind::Activation,
            "inhibition" => RelationKind::Inhibition,
            "expression" => RelationKind::Expression,
            "repression" => RelationKind::Repression,
            "binding/association" => RelationKind::BindingAssociation,
            "dissociation" => RelationKind::Dissociation,
            "phosphorylation" => RelationKind::Phosphorylation,
            "dephosphorylation" => RelationKind::Dephosphorylation,
            "glycosylation" => RelationKind::Glycosylation,
            "ubiquitination" => RelationKind::Ubiquitination,
            "methylation" => RelationKind::Methylation,
            "indirect effect" => RelationKind::IndirectEffect,
            "state change" => RelationKind::StateChange,
            "missing interaction" => RelationKind::MissingInteraction,
            "compound" => RelationKind::Compound,
            "hidden compound" => RelationKind::HiddenCompound,
            "undefined" => RelationKind::Undefined,
            other => RelationKind::Other(other.to_string()),
        }
    }

    /// Returns the KGML label.
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::Activation => "activation",
            RelationKind::Inhibition => "inhibition",
            RelationKind::Expression => "expression",
            RelationKind::Repression => "repression",
            RelationKind::BindingAssociation => "binding/association",
            RelationKind::Dissociation => "dissociation",
            RelationKind::Phosphorylation => "phosphorylation",
            RelationKind::Dephosphorylation => "dephosphorylation",
            RelationKind::Glycosylation => "glycosylation",
            RelationKind::Ubiquitination => "ubiquitination",
            RelationKind::Methylation => "methylation",
            RelationKind::IndirectEffect => "indirect effect",
            RelationKind::StateChange => "state change",
            RelationKind::MissingInteraction => "missing interaction",
            RelationKind::Compound => "compound",
            RelationKind::HiddenCompound => "hidden compound",
            RelationKind::Undefined => "undefined",
            RelationKind::Other(label) => label,
        }
    }
}

impl Default for RelationKind {
    fn default() -> Self {
        RelationKind::Undefined
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed causal edge between two nodes.
///
/// Several transitions may connect the same pair with different kinds; each
/// is kept, while node adjacency collapses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub kind: RelationKind,
}

impl Transition {
    pub fn new(from_id: NodeId, to_id: NodeId, kind: RelationKind) -> Self {
        Self { from_id, to_id, kind }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from_id == self.to_id
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transition: {} -> {} Type: {}", self.from_id, self.to_id, self.kind)
    }
}
