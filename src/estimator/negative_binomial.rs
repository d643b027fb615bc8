//!
//! Negative binomial estimator
//!
//! For a fixed `r` the likelihood is maximized by `p = r / (r + mean)`, so only
//! the profile likelihood of `r` is optimized (golden-section search on
//! `log r`).
//!
use super::{Accumulators, Estimator, Statistics};
use crate::distribution::{as_count, negative_binomial, NegativeBinomial, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;
use std::collections::BTreeMap;

/// search interval of `log r`
const LOG_R_MIN: f64 = -7.0;
const LOG_R_MAX: f64 = 12.0;
const N_ITERATIONS: usize = 100;

///
/// Weighted histogram of counts.
///
#[derive(Debug, Clone, Default)]
struct Histogram(BTreeMap<u64, f64>);

impl Statistics for Histogram {
    fn add(&mut self, x: f64, weight: f64) -> Result<()> {
        let k = as_count(x).ok_or_else(|| {
            HmmError::InvalidParameter(format!("{} is not a count", x))
        })?;
        *self.0.entry(k).or_insert(0.0) += weight;
        Ok(())
    }
    fn merge(&mut self, other: &Self) {
        for (&k, &w) in other.0.iter() {
            *self.0.entry(k).or_insert(0.0) += w;
        }
    }
}

impl Histogram {
    fn total_weight(&self) -> f64 {
        self.0.values().sum()
    }
    fn weighted_sum(&self) -> f64 {
        self.0.iter().map(|(&k, &w)| k as f64 * w).sum()
    }
    ///
    /// log likelihood with `p` profiled out (terms constant in `r` omitted)
    fn profile(&self, r: f64, mean: f64) -> f64 {
        let total = self.total_weight();
        let p = r / (r + mean);
        let s: f64 = self
            .0
            .iter()
            .map(|(&k, &w)| w * (libm::lgamma(k as f64 + r) - libm::lgamma(r)))
            .sum();
        s + total * r * p.ln() + self.weighted_sum() * (1.0 - p).ln()
    }
}

#[derive(Debug, Clone)]
pub struct NegativeBinomialEstimator {
    acc: Accumulators<Histogram>,
}

impl NegativeBinomialEstimator {
    pub fn new() -> Self {
        NegativeBinomialEstimator {
            acc: Accumulators::new(Histogram::default()),
        }
    }
}

impl Default for NegativeBinomialEstimator {
    fn default() -> Self {
        NegativeBinomialEstimator::new()
    }
}

impl Estimator for NegativeBinomialEstimator {
    fn name(&self) -> &'static str {
        negative_binomial::NAME
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
        let h = self.acc.merged();
        let total = h.total_weight();
        if !(total > 0.0) {
            return Err(HmmError::InvalidParameter(
                "no observations for negative binomial estimation".to_owned(),
            ));
        }
        let mean = h.weighted_sum() / total;
        if mean <= 0.0 {
            // all mass on zero
            return Ok(Box::new(NegativeBinomial::new(1.0, 1.0)?));
        }
        let log_r = golden_section_max(|t| h.profile(t.exp(), mean), LOG_R_MIN, LOG_R_MAX);
        let r = log_r.exp();
        Ok(Box::new(NegativeBinomial::new(r, r / (r + mean))?))
    }
}

///
/// Maximizer of a unimodal function on `[a, b]`.
///
fn golden_section_max<F: Fn(f64) -> f64>(f: F, mut a: f64, mut b: f64) -> f64 {
    let g = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = b - g * (b - a);
    let mut d = a + g * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..N_ITERATIONS {
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - g * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + g * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_section_finds_maximum() {
        let x = golden_section_max(|x| -(x - 1.5) * (x - 1.5), -10.0, 10.0);
        assert_abs_diff_eq!(x, 1.5, epsilon = 1e-8);
    }

    #[test]
    fn fit_keeps_mean_and_beats_neighbours() {
        let xs = [0.0, 0.0, 1.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 0.0, 4.0, 2.0];
        let mut e = NegativeBinomialEstimator::new();
        let pool = ThreadPool::new(2).unwrap();
        let d = e.estimate_on_data(&xs, None, &pool).unwrap();
        let ps = d.parameters();
        let nb = NegativeBinomial::new(ps[0], ps[1]).unwrap();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert_abs_diff_eq!(nb.mean(), mean, epsilon = 1e-9);

        let ll = |d: &dyn ScalarPdf| -> f64 { xs.iter().map(|&x| d.log_pdf(x).to_log_value()).sum() };
        let best = ll(&nb);
        for &f in [0.8, 1.25].iter() {
            let r = ps[0] * f;
            let other = NegativeBinomial::new(r, r / (r + mean)).unwrap();
            assert!(ll(&other) < best);
        }
    }

    #[test]
    fn all_zero_and_invalid() {
        let mut e = NegativeBinomialEstimator::new();
        let pool = ThreadPool::sequential();
        let d = e.estimate_on_data(&[0.0, 0.0, 0.0], None, &pool).unwrap();
        assert_abs_diff_eq!(d.log_pdf(0.0), Prob::one(), epsilon = 1e-12);
        assert!(e.estimate_on_data(&[1.5], None, &pool).is_err());
    }
}
