//! Initial replica choice for reads

use blockrep_common::Replica;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks the replica a read tries first
pub trait ReplicaSelector: Send + Sync {
    fn choose(&self) -> Replica;
}

/// Uniform choice between primary and backup, spreading read load
#[derive(Debug)]
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    /// Seeded from system entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of choices
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaSelector for RandomSelector {
    fn choose(&self) -> Replica {
        if self.rng.lock().gen_bool(0.5) {
            Replica::Primary
        } else {
            Replica::Backup
        }
    }
}

/// Always starts with the same replica
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub Replica);

impl ReplicaSelector for FixedSelector {
    fn choose(&self) -> Replica {
        self.0
    }
}
