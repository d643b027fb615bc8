//!
//! Normal estimator: weighted mean and standard deviation
//!
use super::{Accumulators, Estimator, Moments};
use crate::distribution::{normal, Normal, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;

///
/// Maximum likelihood normal distribution, with `sigma` bounded from below
/// by `min_sigma` so that a component collapsing on a single value stays valid.
///
#[derive(Debug, Clone)]
pub struct NormalEstimator {
    acc: Accumulators<Moments>,
    min_sigma: f64,
}

impl NormalEstimator {
    pub fn new() -> Self {
        NormalEstimator {
            acc: Accumulators::new(Moments::default()),
            min_sigma: 1e-6,
        }
    }
    pub fn with_min_sigma(mut self, min_sigma: f64) -> Self {
        self.min_sigma = min_sigma;
        self
    }
}

impl Default for NormalEstimator {
    fn default() -> Self {
        NormalEstimator::new()
    }
}

impl Estimator for NormalEstimator {
    fn name(&self) -> &'static str {
        normal::NAME
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
                "no observations for normal estimation".to_owned(),
            ));
        }
        let sigma = m.variance().sqrt().max(self.min_sigma);
        Ok(Box::new(Normal::new(m.mean(), sigma)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prob::p;

    #[test]
    fn weighted_moments() {
        let mut e = NormalEstimator::new();
        let pool = ThreadPool::new(2).unwrap();
        let d = e
            .estimate_on_data(&[1.0, 2.0, 4.0], Some(&[p(1.0), p(2.0), p(1.0)]), &pool)
            .unwrap();
        // mean = 9/4, E[x^2] = 25/4
        let ps = d.parameters();
        assert_abs_diff_eq!(ps[0], 2.25, epsilon = 1e-12);
        assert_abs_diff_eq!(ps[1], (25.0f64 / 4.0 - 2.25 * 2.25).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn large_offset_keeps_spread() {
        // small spread on a large offset
        let xs = [1e9 + 1.0, 1e9 + 2.0, 1e9 + 3.0, 1e9 + 4.0];
        for n_threads in [1, 2] {
            let pool = ThreadPool::new(n_threads).unwrap();
            let mut e = NormalEstimator::new();
            let ps = e.estimate_on_data(&xs, None, &pool).unwrap().parameters();
            assert_abs_diff_eq!(ps[0], 1e9 + 2.5, epsilon = 1e-6);
            assert_abs_diff_eq!(ps[1], 1.25f64.sqrt(), epsilon = 1e-6);
        }
    }

    #[test]
    fn single_value_is_bounded() {
        let mut e = NormalEstimator::new().with_min_sigma(0.1);
        e.initialize(1);
        e.new_observation(3.0, None, 0).unwrap();
        let d = e.estimate().unwrap();
        assert_eq!(d.parameters(), vec![3.0, 0.1]);
        e.initialize(1);
        assert!(e.estimate().is_err());
        assert!(e.new_observation(f64::NAN, None, 0).is_err());
    }
}
