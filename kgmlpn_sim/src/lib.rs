//! KGML Petri Net Simulation Harness
//!
//! Drives a [`kgmlpn_core::Pathway`] through seeded, reproducible runs.
//!
//! # Components
//!
//! - **SimContext**: one master seed feeding a ChaCha8 stream
//! - **SimWorld**: a pathway plus its context, advanced one tick at a time
//! - **Scenarios**: named stimulus/knockout presets and CLI directives
//! - **ScenarioRunner**: runs a scenario on a copy of a loaded pathway and
//!   checks token conservation and knockout freeze after every step
//! - **SharedPathway**: one mutex around the whole aggregate
//! - **PathwaySnapshot**: the JSON view handed to a renderer
//!
//! # Usage
//!
//! ```ignore
//! use kgmlpn_core::Pathway;
//! use kgmlpn_sim::{ScenarioRunner, scenarios::{Directives, ScenarioId}};
//!
//! let pathway = Pathway::from_kgml_file("hsa04620.xml")?;
//! let result = ScenarioRunner::new(42)
//!     .with_steps(10)
//!     .run(&pathway, ScenarioId::TlrKnockout, &Directives::default());
//! assert!(result.passed);
//! ```

mod context;
mod runner;
mod shared;
mod snapshot;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use runner::{RunMetrics, RunResult, ScenarioRunner, TokenHolder};
pub use shared::SharedPathway;
pub use snapshot::{GroupView, NodeView, PathwaySnapshot, TransitionView};
pub use world::{SimConfig, SimWorld};
