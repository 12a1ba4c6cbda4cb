//! Scenario runner - executes a scenario on a copy of a loaded pathway and
//! checks the marking invariants after every step.

use crate::scenarios::{Directives, ScenarioId};
use crate::world::{SimConfig, SimWorld};

use kgmlpn_core::{NodeId, Pathway};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every step completed with the invariants intact
    pub passed: bool,

    /// Steps executed
    pub steps: u64,

    /// Marking after the last step
    pub final_marking: BTreeMap<NodeId, u64>,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: RunMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Tokens placed by the marking directives
    pub stimulus: u64,

    /// Active nodes at the start of each step
    pub active_per_step: Vec<usize>,

    /// Tokens drained from firing nodes in each step
    pub moved_per_step: Vec<u64>,

    /// Node-steps where every successor was knocked out
    pub blocked_node_steps: u64,

    /// First step in which no node fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<u64>,

    /// Nodes holding tokens at the end
    pub final_holders: Vec<TokenHolder>,
}

/// A node still holding tokens when the run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenHolder {
    pub id: NodeId,
    pub name: String,
    pub tokens: u64,
}

/// Runs scenarios against a loaded pathway.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Steps per run
    steps: u64,

    /// Log the marking after each step
    verbose: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        let defaults = SimConfig::default();
        Self {
            seed,
            steps: defaults.max_steps,
            verbose: defaults.verbose,
        }
    }

    /// Sets the number of steps.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    /// Enables per-step marking logs.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs a scenario on a copy of `pathway`.
    ///
    /// `directives` are applied on top of the scenario's own directives, so
    /// `ScenarioId::Custom` runs exactly what the caller passes.
    pub fn run(
        &self,
        pathway: &Pathway,
        scenario: ScenarioId,
        directives: &Directives,
    ) -> RunResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut all = scenario.directives();
        all.extend(directives.clone());

        let config = SimConfig {
            seed: self.seed,
            max_steps: self.steps,
            verbose: self.verbose,
        };
        let mut world = SimWorld::new(pathway.clone(), config);
        let mut metrics = RunMetrics {
            stimulus: all.stimulus(),
            ..Default::default()
        };

        if let Err(e) = world.apply(&all) {
            warn!("Directives rejected: {}", e);
            return self.finish(scenario, world, metrics, Some(e.to_string()));
        }

        let expected_total = world.pathway().total_tokens();
        let frozen: Vec<(NodeId, u64)> = world
            .pathway()
            .knocked_out()
            .into_iter()
            .filter_map(|id| world.pathway().tokens(id).ok().map(|t| (id, t)))
            .collect();

        let mut failure = None;
        for _ in 0..self.steps {
            let report = match world.tick() {
                Ok(report) => report,
                Err(e) => {
                    failure = Some(format!("step {} aborted: {}", world.tick_count() + 1, e));
                    break;
                }
            };

            metrics.active_per_step.push(report.active);
            metrics.moved_per_step.push(report.moved_tokens);
            metrics.blocked_node_steps += report.blocked as u64;
            if report.fired == 0 && metrics.settled_at.is_none() {
                metrics.settled_at = Some(report.step);
            }

            debug!(
                "  step={} | active={} | fired={} | moved={}",
                report.step, report.active, report.fired, report.moved_tokens
            );

            let total = world.pathway().total_tokens();
            if total != expected_total {
                failure = Some(format!(
                    "token total drifted from {} to {} at step {}",
                    expected_total, total, report.step
                ));
                break;
            }

            if let Some((id, tokens)) = frozen
                .iter()
                .find(|(id, tokens)| world.pathway().tokens(*id).ok() != Some(*tokens))
            {
                failure = Some(format!(
                    "knocked-out node {} changed from {} tokens at step {}",
                    id, tokens, report.step
                ));
                break;
            }
        }

        self.finish(scenario, world, metrics, failure)
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        world: SimWorld,
        mut metrics: RunMetrics,
        failure_reason: Option<String>,
    ) -> RunResult {
        let pathway = world.into_pathway();

        metrics.final_holders = pathway
            .nodes()
            .filter(|node| node.tokens > 0)
            .map(|node| TokenHolder {
                id: node.id,
                name: node.display_name.clone(),
                tokens: node.tokens,
            })
            .collect();

        let passed = failure_reason.is_none();
        if passed {
            info!(
                "✓ {} (seed={}) completed {} steps",
                scenario,
                self.seed,
                pathway.steps_taken()
            );
        } else {
            warn!("✗ {} (seed={}) failed", scenario, self.seed);
        }

        RunResult {
            scenario,
            seed: self.seed,
            passed,
            steps: pathway.steps_taken(),
            final_marking: pathway.marking(),
            failure_reason,
            metrics,
        }
    }
}

fn serialize_scenario<S: serde::Serializer>(
    scenario: &ScenarioId,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(scenario.name())
}
