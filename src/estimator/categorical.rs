//!
//! Categorical estimator: weighted category frequencies
//!
use super::{Accumulators, Estimator, Statistics};
use crate::distribution::{as_count, categorical, Categorical, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;

#[derive(Debug, Clone)]
struct Counts(Vec<f64>);

impl Statistics for Counts {
    fn add(&mut self, x: f64, weight: f64) -> Result<()> {
        let n = self.0.len();
        match as_count(x).map(|c| c as usize).filter(|&c| c < n) {
            Some(c) => {
                self.0[c] += weight;
                Ok(())
            }
            None => Err(HmmError::InvalidParameter(format!(
                "{} is not a category of {} categories",
                x, n
            ))),
        }
    }
    fn merge(&mut self, other: &Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }
}

///
/// Estimates `theta_c` proportional to the total weight of category `c`
/// plus an optional pseudocount.
///
#[derive(Debug, Clone)]
pub struct CategoricalEstimator {
    acc: Accumulators<Counts>,
    pseudocount: f64,
}

impl CategoricalEstimator {
    pub fn new(n_categories: usize) -> Self {
        CategoricalEstimator {
            acc: Accumulators::new(Counts(vec![0.0; n_categories])),
            pseudocount: 0.0,
        }
    }
    pub fn with_pseudocount(mut self, pseudocount: f64) -> Self {
        self.pseudocount = pseudocount;
        self
    }
}

impl Estimator for CategoricalEstimator {
    fn name(&self) -> &'static str {
        categorical::NAME
    }
    fn initialize(&mut self, n_threads: usize) {
        self.acc.initialize(n_threads);
    }
    fn new_observation(&mut self, x: f64, weight: Option<Prob>, thread_id: usize) -> Result<()> {
        self.acc.add(x, weight, thread_id)
    }
    fn set_data(&mut self, xs: &[f64], weights: Option<&[Prob]>, pool: &ThreadPool) -> Result<()> {
        self.acc.add_all(xs, weights, pool)
    }
    fn estimate(&mut self) -> Result<Box<dyn ScalarPdf>> {
        let counts: Vec<f64> = self
            .acc
            .merged()
            .0
            .iter()
            .map(|c| c + self.pseudocount)
            .collect();
        if counts.iter().sum::<f64>() <= 0.0 {
            return Err(HmmError::InvalidParameter(
                "no observations for categorical estimation".to_owned(),
            ));
        }
        Ok(Box::new(Categorical::new(&counts)?))
    }
}
