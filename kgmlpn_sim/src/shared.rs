//! A pathway shared between several drivers (e.g. a renderer and a batch
//! runner).
//!
//! A step reads every active node and writes every node, so the whole
//! aggregate sits behind one mutex and each operation holds it for its full
//! duration. There is no per-node locking.

use crate::snapshot::PathwaySnapshot;

use kgmlpn_core::{NodeId, Pathway, Result, StepReport};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to a mutex-guarded pathway.
#[derive(Debug, Clone)]
pub struct SharedPathway {
    inner: Arc<Mutex<Pathway>>,
}

impl SharedPathway {
    pub fn new(pathway: Pathway) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pathway)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pathway> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_initial_marking(
        &self,
        marking: impl IntoIterator<Item = (NodeId, u64)>,
    ) -> Result<()> {
        self.lock().set_initial_marking(marking)
    }

    pub fn set_knockouts<S: AsRef<str>>(
        &self,
        knockouts: impl IntoIterator<Item = (S, NodeId)>,
    ) -> Result<()> {
        self.lock().set_knockouts(knockouts)
    }

    pub fn clear_knockouts(&self, ids: impl IntoIterator<Item = NodeId>) -> Result<()> {
        self.lock().clear_knockouts(ids)
    }

    /// Fires one step while holding the lock.
    pub fn step<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<StepReport> {
        self.lock().step(rng)
    }

    pub fn tokens(&self, id: NodeId) -> Result<u64> {
        self.lock().tokens(id)
    }

    pub fn active_nodes(&self) -> BTreeSet<NodeId> {
        self.lock().active_nodes()
    }

    pub fn marking(&self) -> BTreeMap<NodeId, u64> {
        self.lock().marking()
    }

    pub fn steps_taken(&self) -> u64 {
        self.lock().steps_taken()
    }

    /// Takes a consistent read-only view for rendering.
    pub fn snapshot(&self) -> PathwaySnapshot {
        PathwaySnapshot::capture(&self.lock())
    }

    /// Runs `f` against the pathway under the lock.
    pub fn with<T>(&self, f: impl FnOnce(&Pathway) -> T) -> T {
        f(&*self.lock())
    }
}

impl From<Pathway> for SharedPathway {
    fn from(pathway: Pathway) -> Self {
        Self::new(pathway)
    }
}
