//! Stimulus and knockout scenarios.
//!
//! The presets target the KEGG Toll-like receptor signaling map
//! (hsa04620): receptors are seeded with tokens and, optionally, two
//! downstream adaptors are knocked out.

use kgmlpn_core::{NodeId, Pathway, PathwayError, Result};

/// Marking and knockout directives applied to a freshly loaded pathway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Tokens to add, per node
    pub marking: Vec<(NodeId, u64)>,

    /// Knockouts as (label, node) pairs; labels are informative only
    pub knockouts: Vec<(String, NodeId)>,
}

impl Directives {
    /// Applies marking then knockouts.
    ///
    /// Every knockout id is checked before the marking is placed, so a
    /// rejected set of directives leaves `pathway` untouched.
    pub fn apply(&self, pathway: &mut Pathway) -> Result<()> {
        if let Some((_, id)) = self.knockouts.iter().find(|(_, id)| !pathway.contains(*id)) {
            return Err(PathwayError::UnknownNode(*id));
        }
        pathway.set_initial_marking(self.marking.iter().copied())?;
        pathway.set_knockouts(self.knockouts.iter().map(|(label, id)| (label.as_str(), *id)))?;
        Ok(())
    }

    /// Appends another set of directives.
    pub fn extend(&mut self, other: Directives) {
        self.marking.extend(other.marking);
        self.knockouts.extend(other.knockouts);
    }

    pub fn is_empty(&self) -> bool {
        self.marking.is_empty() && self.knockouts.is_empty()
    }

    /// Tokens added by the marking, saturating at `u64::MAX`.
    pub fn stimulus(&self) -> u64 {
        self.marking
            .iter()
            .fold(0u64, |total, (_, tokens)| total.saturating_add(*tokens))
    }
}

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Stimulate TLR1, TLR3, TLR4 and TLR5
    TlrStimulus,

    /// Same stimulus with RAC1 and TICAM2 knocked out
    TlrKnockout,

    /// Only the directives given on the command line
    Custom,
}

impl ScenarioId {
    /// Returns the preset scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::TlrStimulus, ScenarioId::TlrKnockout]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::TlrStimulus => "tlr_stimulus",
            ScenarioId::TlrKnockout => "tlr_knockout",
            ScenarioId::Custom => "custom",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::TlrStimulus => "22 tokens on TLR1/3/4/5, free propagation",
            ScenarioId::TlrKnockout => "TLR stimulus with RAC1 and TICAM2 knocked out",
            ScenarioId::Custom => "user supplied marking and knockouts",
        }
    }

    /// Returns the directives of the scenario.
    pub fn directives(&self) -> Directives {
        let stimulus = vec![
            (NodeId(60), 10), // TLR1
            (NodeId(58), 3),  // TLR3
            (NodeId(64), 7),  // TLR4
            (NodeId(57), 2),  // TLR5
        ];

        match self {
            ScenarioId::TlrStimulus => Directives {
                marking: stimulus,
                knockouts: Vec::new(),
            },
            ScenarioId::TlrKnockout => Directives {
                marking: stimulus,
                knockouts: vec![
                    ("RAC1".to_string(), NodeId(38)),
                    ("TICAM2".to_string(), NodeId(65)),
                ],
            },
            ScenarioId::Custom => Directives::default(),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tlr_stimulus" | "tlrstimulus" | "stimulus" => Ok(ScenarioId::TlrStimulus),
            "tlr_knockout" | "tlrknockout" | "knockout" => Ok(ScenarioId::TlrKnockout),
            "custom" | "none" => Ok(ScenarioId::Custom),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Parses a marking directive `ID=TOKENS`.
pub fn parse_marking(s: &str) -> std::result::Result<(NodeId, u64), String> {
    let (id, tokens) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=TOKENS, got '{}'", s))?;
    let id = id.parse().map_err(|_| format!("invalid node id '{}'", id))?;
    let tokens = tokens
        .trim()
        .parse()
        .map_err(|_| format!("invalid token count '{}'", tokens))?;
    Ok((id, tokens))
}

/// Parses a knockout directive `LABEL=ID`.
pub fn parse_knockout(s: &str) -> std::result::Result<(String, NodeId), String> {
    let (label, id) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=ID, got '{}'", s))?;
    let id = id.parse().map_err(|_| format!("invalid node id '{}'", id))?;
    Ok((label.trim().to_string(), id))
}
