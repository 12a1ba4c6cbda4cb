//! KGML Petri Net Core
//!
//! Models a KEGG signaling pathway as a token-based Petri net and fires it in
//! discrete synchronous steps, to see how a stimulus placed on receptor nodes
//! spreads downstream and how knocking out nodes changes that spread.
//!
//! # Components
//!
//! - **Entity model**: [`Node`] (places), [`Transition`] (relations),
//!   [`Group`] (display-only complexes), owned by the [`Pathway`] aggregate.
//! - **Loader**: [`KgmlLoader`] parses KGML into a fully connected pathway.
//! - **Marking control**: [`Pathway::set_initial_marking`],
//!   [`Pathway::set_knockouts`], [`Pathway::clear_knockouts`].
//! - **Engine**: [`Pathway::step`] drains every active node into its
//!   successors and applies all deltas in one batch.
//!
//! # Randomness
//!
//! Leftover tokens are placed at random. The engine never touches an
//! ambient generator: callers pass any [`rand::Rng`], typically a seeded
//! `ChaCha8Rng`, and the same seed reproduces the same marking.
//!
//! # Example
//!
//! ```ignore
//! use kgmlpn_core::{NodeId, Pathway};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut pathway = Pathway::from_kgml_file("hsa04620.xml")?;
//! pathway.set_initial_marking([(NodeId(60), 10), (NodeId(64), 7)])?;
//! pathway.set_knockouts([("RAC1", NodeId(38))])?;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! for _ in 0..5 {
//!     pathway.step(&mut rng)?;
//! }
//! println!("{}", pathway.describe_active());
//! ```
//!
//! # Concurrency
//!
//! A step reads every active node and writes every node, so a pathway shared
//! between callers must sit behind a single lock for the whole aggregate.

mod engine;
mod error;
mod group;
mod kgml;
mod marking;
mod node;
mod pathway;
mod transition;

pub use engine::StepReport;
pub use error::{PathwayError, Result};
pub use group::Group;
pub use kgml::{KgmlLoader, DEFAULT_PLACEHOLDER_THRESHOLD};
pub use node::{LayoutBox, Node, NodeId, NodeKind};
pub use pathway::{Pathway, PathwayMeta};
pub use transition::{RelationKind, Transition};
