//! Uniform randomness for action sampling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait Dice: Send {
    /// Next uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// Builds a fresh [`Dice`] for each session's scheduler.
pub type DiceFactory = Arc<dyn Fn() -> Box<dyn Dice> + Send + Sync>;

/// Production dice backed by a `SmallRng`.
#[derive(Debug, Clone)]
pub struct RngDice(SmallRng);

impl RngDice {
    /// Seed from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }

    /// Deterministic dice for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl Default for RngDice {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Dice for RngDice {
    fn unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Factory handing out entropy-seeded [`RngDice`].
#[must_use]
pub fn entropy_factory() -> DiceFactory {
    Arc::new(|| Box::new(RngDice::from_entropy()))
}

/// Factory handing out deterministic dice, one seed per session starting at
/// `seed`.
#[must_use]
pub fn seeded_factory(seed: u64) -> DiceFactory {
    let next = AtomicU64::new(seed);
    Arc::new(move || Box::new(RngDice::seeded(next.fetch_add(1, Ordering::Relaxed))))
}
