//! SimWorld - owns a loaded pathway and drives it step by step.

use crate::context::SimContext;
use crate::scenarios::Directives;

use kgmlpn_core::{Pathway, Result, StepReport};
use tracing::{debug, info};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of steps `run` performs
    pub max_steps: u64,

    /// Log the active marking after every step
    pub verbose: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_steps: 10,
            verbose: false,
        }
    }
}

/// The SimWorld - container for one pathway run.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Seeded randomness shared with the engine
    pub context: SimContext,

    pathway: Pathway,
}

impl SimWorld {
    /// Creates a world around an already loaded pathway.
    pub fn new(pathway: Pathway, config: SimConfig) -> Self {
        let context = SimContext::new(config.seed);
        Self {
            config,
            context,
            pathway,
        }
    }

    /// Applies marking and knockout directives to the pathway.
    pub fn apply(&mut self, directives: &Directives) -> Result<()> {
        directives.apply(&mut self.pathway)?;
        debug!(
            tokens = self.pathway.total_tokens(),
            knockouts = self.pathway.knocked_out().len(),
            "Directives applied"
        );
        Ok(())
    }

    /// Advances the pathway by one step.
    pub fn tick(&mut self) -> Result<StepReport> {
        let pathway = &mut self.pathway;
        let report = self.context.with_rng(|rng| pathway.step(rng))?;

        if self.config.verbose {
            info!(step = report.step, "{}", self.pathway.describe_active());
        }
        Ok(report)
    }

    /// Runs `max_steps` ticks, stopping at the first error.
    pub fn run(&mut self) -> Result<Vec<StepReport>> {
        (0..self.config.max_steps).map(|_| self.tick()).collect()
    }

    /// Returns the current step count.
    pub fn tick_count(&self) -> u64 {
        self.pathway.steps_taken()
    }

    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }

    /// Consumes the world, handing back the pathway.
    pub fn into_pathway(self) -> Pathway {
        self.pathway
    }
}
