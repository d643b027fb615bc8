//!
//! Poisson estimator: weighted mean
//!
use super::{Accumulators, Estimator, Moments};
use crate::distribution::{poisson, Poisson, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;

/// smallest rate returned for all-zero data
const MIN_LAMBDA: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct PoissonEstimator {
    acc: Accumulators<Moments>,
}

impl PoissonEstimator {
    pub fn new() -> Self {
        PoissonEstimator {
            acc: Accumulators::new(Moments::default()),
        }
    }
}

impl Default for PoissonEstimator {
    fn default() -> Self {
        PoissonEstimator::new()
    }
}

impl Estimator for PoissonEstimator {
    fn name(&self) -> &'static str {
        poisson::NAME
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
        let m = self.acc.merged();
        if !(m.weight() > 0.0) {
            return Err(HmmError::InvalidParameter(
                "no observations for poisson estimation".to_owned(),
            ));
        }
        Ok(Box::new(Poisson::new(m.mean().max(MIN_LAMBDA))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_counts() {
        let mut e = PoissonEstimator::new();
        let pool = ThreadPool::sequential();
        let d = e.estimate_on_data(&[0.0, 2.0, 4.0, 6.0], None, &pool).unwrap();
        assert_abs_diff_eq!(d.parameters()[0], 3.0, epsilon = 1e-12);
        let d = e.estimate_on_data(&[0.0, 0.0], None, &pool).unwrap();
        assert_abs_diff_eq!(d.parameters()[0], MIN_LAMBDA);
    }
}
