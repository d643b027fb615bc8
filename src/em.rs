//!
//! Generic EM driver
//!
//! * E-step (`EmModel::step`): from the current model, compute the log
//!   likelihood, re-estimate every non-emission parameter into the next
//!   generation and return the posterior weight of every emission class on
//!   every unique observation.
//! * M-step of emissions: one `Estimator` per emission class is fed the unique
//!   values with those weights and produces the next emission distribution.
//! * iterate until the log likelihood changes by less than `epsilon`, the step
//!   limit is reached or the hook asks to stop.
//!
use crate::data::{EmissionTable, ObservationSet};
use crate::distribution::ScalarPdf;
use crate::error::{HmmError, Result};
use crate::estimator::Estimator;
use crate::pool::ThreadPool;
use crate::prob::Prob;
use log::{debug, info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

///
/// Model trainable by `run`.
///
pub trait EmModel: Clone + Send + Sync {
    ///
    /// Per-slot scratch storage of the E-step
    type Tmp: Send;
    fn edist(&self) -> &[Box<dyn ScalarPdf>];
    fn set_edist(&mut self, class: usize, dist: Box<dyn ScalarPdf>);
    fn n_classes(&self) -> usize {
        self.edist().len()
    }
    ///
    /// Allocate scratch storage for one slot.
    fn new_tmp(&self, data: &ObservationSet) -> Self::Tmp;
    ///
    /// One E-step on `self` writing the re-estimated non-emission parameters
    /// into `next`. `tmp` has one element per worker of `pool`.
    ///
    fn step(
        &self,
        next: &mut Self,
        data: &ObservationSet,
        table: &EmissionTable,
        tmp: &mut [Self::Tmp],
        pool: &ThreadPool,
    ) -> Result<StepResult>;
}

///
/// Output of `EmModel::step`.
///
#[derive(Debug, Clone)]
pub struct StepResult {
    /// log likelihood of the model the step was run on
    pub log_likelihood: f64,
    /// posterior weights of shape `(n_classes, n_unique)`
    pub weights: Array2<Prob>,
}

///
/// Convergence parameters of `run`. The number of workers is the one of the
/// `ThreadPool` passed to `run`.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmConfig {
    /// stop when `|ll_new - ll_old| < epsilon`
    pub epsilon: f64,
    /// maximal number of steps, unbounded if `None`
    pub max_steps: Option<usize>,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            epsilon: 1e-8,
            max_steps: Some(1000),
        }
    }
}

///
/// Callback after every EM step. Returning `ControlFlow::Break(())` stops the
/// run and the model just produced is returned.
///
pub trait EmHook<M> {
    fn on_step(&mut self, model: &M, step: usize, log_likelihood: f64, delta: f64) -> ControlFlow<()>;
}

impl<M, F> EmHook<M> for F
where
    F: FnMut(&M, usize, f64, f64) -> ControlFlow<()>,
{
    fn on_step(&mut self, model: &M, step: usize, log_likelihood: f64, delta: f64) -> ControlFlow<()> {
        self(model, step, log_likelihood, delta)
    }
}

///
/// Hook that never interrupts.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl<M> EmHook<M> for NoHook {
    fn on_step(&mut self, _: &M, _: usize, _: f64, _: f64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

///
/// Result of `run`.
///
#[derive(Debug, Clone)]
pub struct EmResult<M> {
    pub model: M,
    /// log likelihood of the last evaluated generation
    /// (`-inf` if no step was run)
    pub log_likelihood: f64,
    pub n_steps: usize,
    pub converged: bool,
}

/// log likelihood decrease tolerated before the run is aborted
const DECREASE_TOLERANCE: f64 = 1e-6;

///
/// Run EM from `model` on `data`. `estimators[c]` re-estimates the emission
/// distribution of class `c`. The input model is not modified.
///
/// Three generations are kept and rotated: `previous`, `current` (evaluated in
/// this step) and `next` (written by this step). If the likelihood of `current`
/// falls below the one of `previous`, the run stops and returns `previous`.
///
pub fn run<M, H>(
    model: &M,
    data: &ObservationSet,
    estimators: &mut [Box<dyn Estimator>],
    config: &EmConfig,
    pool: &ThreadPool,
    hook: &mut H,
) -> Result<EmResult<M>>
where
    M: EmModel,
    H: EmHook<M>,
{
    let n_classes = model.n_classes();
    if estimators.len() != n_classes {
        return Err(HmmError::EstimatorCount {
            expected: n_classes,
            actual: estimators.len(),
        });
    }
    let mut tmp: Vec<M::Tmp> = (0..pool.n_threads()).map(|_| model.new_tmp(data)).collect();
    let mut previous = model.clone();
    let mut current = model.clone();
    let mut next = model.clone();
    let mut ll_old = f64::NEG_INFINITY;
    let mut n_steps = 0;

    while config.max_steps.map_or(true, |max| n_steps < max) {
        let table = EmissionTable::evaluate(current.edist(), data.values(), pool)?;
        let r = current.step(&mut next, data, &table, &mut tmp, pool)?;
        let ll = r.log_likelihood;

        if n_steps > 0 && ll < ll_old - DECREASE_TOLERANCE * ll_old.abs().max(1.0) {
            warn!(
                "likelihood decreased from {} to {} at step {}; keeping the previous model",
                ll_old, ll, n_steps
            );
            return Ok(EmResult {
                model: previous,
                log_likelihood: ll_old,
                n_steps,
                converged: false,
            });
        }

        estimate_emissions(&current, &mut next, data, &r.weights, estimators, pool)?;
        n_steps += 1;

        let delta = ll - ll_old;
        info!("em step={} ll={} delta={}", n_steps, ll, delta);
        let converged = delta.abs() < config.epsilon;
        let flow = hook.on_step(&next, n_steps, ll, delta);

        // previous <- current <- next, next becomes scratch
        std::mem::swap(&mut previous, &mut current);
        std::mem::swap(&mut current, &mut next);
        ll_old = ll;

        if converged || flow.is_break() {
            if flow.is_break() {
                debug!("em interrupted by hook at step {}", n_steps);
            }
            return Ok(EmResult {
                model: current,
                log_likelihood: ll,
                n_steps,
                converged,
            });
        }
    }
    Ok(EmResult {
        model: current,
        log_likelihood: ll_old,
        n_steps,
        converged: false,
    })
}

///
/// M-step of the emission distributions. Classes without posterior weight
/// keep their current distribution.
///
fn estimate_emissions<M: EmModel>(
    current: &M,
    next: &mut M,
    data: &ObservationSet,
    weights: &Array2<Prob>,
    estimators: &mut [Box<dyn Estimator>],
    pool: &ThreadPool,
) -> Result<()> {
    for (class, estimator) in estimators.iter_mut().enumerate() {
        let w: Vec<Prob> = weights.row(class).to_vec();
        let dist = if w.iter().all(|x| x.is_zero()) {
            warn!("emission class {} has no weight; keeping its distribution", class);
            current.edist()[class].clone()
        } else {
            estimator.set_starting_point(current.edist()[class].as_ref())?;
            estimator.estimate_on_data(data.values(), Some(&w), pool)?
        };
        next.set_edist(class, dist);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json() {
        let c: EmConfig = serde_json::from_str(r#"{"epsilon": 1e-4}"#).unwrap();
        assert_eq!(
            c,
            EmConfig {
                epsilon: 1e-4,
                max_steps: Some(1000),
            }
        );
        let json = serde_json::to_string(&EmConfig::default()).unwrap();
        assert!(!json.contains("threads"));
        let back: EmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmConfig::default());
        let c: EmConfig = serde_json::from_str(r#"{"max_steps": null}"#).unwrap();
        assert_eq!(c.max_steps, None);
    }
}
