//!
//! Maximum (weighted) likelihood estimation of emission distributions
//!
//! ```text
//! initialize(n_threads)
//! new_observation(x, weight, thread_id)   // any thread, one slot per thread
//! estimate()                              // merge slots in order, fit
//! ```
//!
//! `estimate_on_data` does all three with a `ThreadPool`.
//!
//! Weights are log probabilities (`Prob`); `None` means weight one.
//!
pub mod categorical;
pub mod negative_binomial;
pub mod normal;
pub mod numeric;
pub mod poisson;

pub use categorical::CategoricalEstimator;
pub use negative_binomial::NegativeBinomialEstimator;
pub use normal::NormalEstimator;
pub use numeric::NumericEstimator;
pub use poisson::PoissonEstimator;

use crate::distribution::{self, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;

///
/// Estimator producing a new distribution from (weighted) observations.
///
pub trait Estimator: Send + Sync + std::fmt::Debug {
    ///
    /// Registry name of the estimated family
    fn name(&self) -> &'static str;
    ///
    /// Discard all observations and allocate `n_threads` slots.
    fn initialize(&mut self, n_threads: usize);
    fn new_observation(&mut self, x: f64, weight: Option<Prob>, thread_id: usize) -> Result<()>;
    ///
    /// Fit to all observations added since `initialize`.
    fn estimate(&mut self) -> Result<Box<dyn ScalarPdf>>;
    ///
    /// Replace all observations by `xs` with optional `weights`, distributing
    /// the work on `pool`.
    fn set_data(&mut self, xs: &[f64], weights: Option<&[Prob]>, pool: &ThreadPool) -> Result<()>;
    ///
    /// Starting point for iterative estimators. Closed-form estimators ignore it.
    fn set_starting_point(&mut self, _current: &dyn ScalarPdf) -> Result<()> {
        Ok(())
    }
    fn estimate_on_data(
        &mut self,
        xs: &[f64],
        weights: Option<&[Prob]>,
        pool: &ThreadPool,
    ) -> Result<Box<dyn ScalarPdf>> {
        self.set_data(xs, weights, pool)?;
        self.estimate()
    }
}

///
/// Sufficient statistics of one slot.
///
pub trait Statistics: Clone + Send + Sync + std::fmt::Debug {
    fn add(&mut self, x: f64, weight: f64) -> Result<()>;
    fn merge(&mut self, other: &Self);
}

///
/// Weighted count, mean and centred second moment.
///
/// Updated with Welford's recurrence and merged with Chan's formula, so the
/// variance of values far from zero with a small spread does not cancel.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Moments {
    w: f64,
    mean: f64,
    m2: f64,
}

impl Statistics for Moments {
    fn add(&mut self, x: f64, weight: f64) -> Result<()> {
        if !x.is_finite() {
            return Err(HmmError::InvalidParameter(format!(
                "cannot estimate from observation {}",
                x
            )));
        }
        if weight == 0.0 {
            return Ok(());
        }
        let w = self.w + weight;
        let delta = x - self.mean;
        self.mean += delta * weight / w;
        self.m2 += weight * delta * (x - self.mean);
        self.w = w;
        Ok(())
    }
    fn merge(&mut self, other: &Self) {
        if other.w == 0.0 {
            return;
        }
        if self.w == 0.0 {
            *self = other.clone();
            return;
        }
        let w = self.w + other.w;
        let delta = other.mean - self.mean;
        self.mean += delta * other.w / w;
        self.m2 += other.m2 + delta * delta * self.w * other.w / w;
        self.w = w;
    }
}

impl Moments {
    /// total weight
    pub fn weight(&self) -> f64 {
        self.w
    }
    pub fn mean(&self) -> f64 {
        self.mean
    }
    /// biased (maximum likelihood) variance
    pub fn variance(&self) -> f64 {
        (self.m2 / self.w).max(0.0)
    }
}

///
/// One `Statistics` per thread, merged in slot order.
///
#[derive(Debug, Clone)]
pub struct Accumulators<S: Statistics> {
    empty: S,
    slots: Vec<S>,
}

impl<S: Statistics> Accumulators<S> {
    pub fn new(empty: S) -> Self {
        let slots = vec![empty.clone()];
        Accumulators { empty, slots }
    }
    pub fn initialize(&mut self, n_threads: usize) {
        self.slots = vec![self.empty.clone(); n_threads.max(1)];
    }
    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }
    pub fn add(&mut self, x: f64, weight: Option<Prob>, thread_id: usize) -> Result<()> {
        let n_slots = self.slots.len();
        let slot = self.slots.get_mut(thread_id).ok_or_else(|| {
            HmmError::ThreadPool(format!(
                "thread id {} but {} slots are initialized",
                thread_id, n_slots
            ))
        })?;
        match weight_value(weight) {
            Some(w) => slot.add(x, w),
            None => Ok(()),
        }
    }
    ///
    /// Reinitialize with one slot per worker of `pool` and add all `xs`.
    ///
    pub fn add_all(&mut self, xs: &[f64], weights: Option<&[Prob]>, pool: &ThreadPool) -> Result<()> {
        if let Some(w) = weights {
            if w.len() != xs.len() {
                return Err(HmmError::DimensionMismatch(format!(
                    "{} observations but {} weights",
                    xs.len(),
                    w.len()
                )));
            }
        }
        self.initialize(pool.n_threads());
        pool.run_chunked(xs.len(), &mut self.slots, |_, slot, range| {
            for i in range {
                if let Some(w) = weight_value(weights.map(|w| w[i])) {
                    slot.add(xs[i], w)?;
                }
            }
            Ok(())
        })
    }
    pub fn merged(&self) -> S {
        let mut s = self.empty.clone();
        for slot in self.slots.iter() {
            s.merge(slot);
        }
        s
    }
}

/// linear weight, `None` for zero weights
fn weight_value(weight: Option<Prob>) -> Option<f64> {
    match weight {
        None => Some(1.0),
        Some(w) if w.is_zero() => None,
        Some(w) => Some(w.to_value()),
    }
}

///
/// Estimator matching the family of `dist`: closed form where available,
/// `NumericEstimator` otherwise.
///
pub fn estimator_for(dist: &dyn ScalarPdf) -> Result<Box<dyn Estimator>> {
    let e: Box<dyn Estimator> = match dist.name() {
        distribution::categorical::NAME => {
            Box::new(CategoricalEstimator::new(dist.parameters().len()))
        }
        distribution::normal::NAME => Box::new(NormalEstimator::new()),
        distribution::poisson::NAME => Box::new(PoissonEstimator::new()),
        distribution::negative_binomial::NAME => Box::new(NegativeBinomialEstimator::new()),
        _ => Box::new(NumericEstimator::new(dist.clone_box())),
    };
    Ok(e)
}

///
/// One estimator per distribution.
///
pub fn estimators_for(edist: &[Box<dyn ScalarPdf>]) -> Result<Vec<Box<dyn Estimator>>> {
    edist.iter().map(|d| estimator_for(d.as_ref())).collect()
}
