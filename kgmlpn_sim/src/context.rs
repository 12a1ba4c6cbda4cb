//! Seeded randomness for deterministic pathway runs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};

/// Simulation context backed by a seeded ChaCha8 stream.
///
/// Clones share the same stream, so a context handed to several owners
/// still produces one reproducible sequence of draws.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Deterministic RNG feeding the firing engine
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Returns the master seed (for logging/debugging).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs `f` with exclusive access to the RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng)
    }

    /// Derives an independent context, e.g. one per seed in a sweep.
    pub fn derive(&self, extension: u64) -> Self {
        Self::new(
            self.seed
                .wrapping_mul(0x517cc1b727220a95)
                .wrapping_add(extension.wrapping_mul(0x9e3779b97f4a7c15)),
        )
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            rng: Arc::clone(&self.rng),
        }
    }
}
