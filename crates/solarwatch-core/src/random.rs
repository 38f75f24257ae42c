//! Pluggable randomness for the fallback generator and the alert engine.
//!
//! Production code draws from a seeded or OS-seeded [`StdRng`]; tests hand in
//! a [`Scripted`] sequence so every draw is known in advance.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send {
    fn uniform(&mut self) -> f64;

    /// Uniform draw in `[lo, hi)`.
    fn uniform_in(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.uniform()
    }
}

impl RandomSource for StdRng {
    fn uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }
}

/// A `StdRng` seeded from `seed`, or from the OS when `None`.
pub fn seeded(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(StdRng::from_os_rng()),
    }
}

/// A random source shared between components; draws are serialized.
#[derive(Clone)]
pub struct SharedRandom(Arc<Mutex<Box<dyn RandomSource>>>);

impl SharedRandom {
    pub fn new(source: Box<dyn RandomSource>) -> Self {
        Self(Arc::new(Mutex::new(source)))
    }
}

impl RandomSource for SharedRandom {
    fn uniform(&mut self) -> f64 {
        let mut inner = self.0.lock().unwrap_or_else(|e| e.into_inner());
        inner.uniform()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct Scripted {
    values: Vec<f64>,
    next: usize,
}

impl Scripted {
    /// # Panics
    /// Panics if `values` is empty.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "Scripted needs at least one value");
        Self { values, next: 0 }
    }

    /// Always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for Scripted {
    fn uniform(&mut self) -> f64 {
        let v = self.values[self.next % self.values.len()];
        self.next += 1;
        v
    }
}
