//!
//! Numeric maximum likelihood estimator for any `ScalarPdf`
//!
//! Minimizes the weighted mean negative log likelihood over the parameter
//! vector with the Nelder-Mead simplex method. Parameter vectors rejected by
//! `set_parameters` count as infinitely bad.
//!
use super::{Accumulators, Estimator, Statistics};
use crate::distribution::ScalarPdf;
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;
use log::debug;

#[derive(Debug, Clone, Default)]
struct Samples(Vec<(f64, f64)>);

impl Statistics for Samples {
    fn add(&mut self, x: f64, weight: f64) -> Result<()> {
        self.0.push((x, weight));
        Ok(())
    }
    fn merge(&mut self, other: &Self) {
        self.0.extend_from_slice(&other.0);
    }
}

#[derive(Debug, Clone)]
pub struct NumericEstimator {
    dist: Box<dyn ScalarPdf>,
    acc: Accumulators<Samples>,
    max_iterations: usize,
    tolerance: f64,
}

impl NumericEstimator {
    ///
    /// Estimator of the family of `dist`, starting from its parameters.
    ///
    pub fn new(dist: Box<dyn ScalarPdf>) -> Self {
        NumericEstimator {
            dist,
            acc: Accumulators::new(Samples::default()),
            max_iterations: 5000,
            tolerance: 1e-12,
        }
    }
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Estimator for NumericEstimator {
    fn name(&self) -> &'static str {
        self.dist.name()
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
    fn set_starting_point(&mut self, current: &dyn ScalarPdf) -> Result<()> {
        if current.name() != self.dist.name() {
            return Err(HmmError::InvalidParameter(format!(
                "estimator of `{}` cannot start from `{}`",
                self.dist.name(),
                current.name()
            )));
        }
        self.dist = current.clone_box();
        Ok(())
    }
    fn estimate(&mut self) -> Result<Box<dyn ScalarPdf>> {
        let samples = self.acc.merged().0;
        let total: f64 = samples.iter().map(|&(_, w)| w).sum();
        if !(total > 0.0) {
            return Err(HmmError::InvalidParameter(format!(
                "no observations for {} estimation",
                self.dist.name()
            )));
        }
        let mut work = self.dist.clone_box();
        let objective = |theta: &[f64]| -> f64 {
            if work.set_parameters(theta).is_err() {
                return f64::INFINITY;
            }
            let s: f64 = samples
                .iter()
                .map(|&(x, w)| w * work.log_pdf(x).to_log_value())
                .sum();
            let f = -s / total;
            if f.is_nan() {
                f64::INFINITY
            } else {
                f
            }
        };
        let start = self.dist.parameters();
        let (theta, n_iterations) = nelder_mead(objective, &start, self.max_iterations, self.tolerance);
        debug!(
            "{} estimated in {} iterations: {:?}",
            self.dist.name(),
            n_iterations,
            theta
        );
        let mut dist = self.dist.clone_box();
        dist.set_parameters(&theta)?;
        self.dist = dist.clone_box();
        Ok(dist)
    }
}

///
/// Nelder-Mead minimization of `f` from `x0`. Returns the best point and the
/// number of iterations used.
///
pub fn nelder_mead<F: FnMut(&[f64]) -> f64>(
    mut f: F,
    x0: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> (Vec<f64>, usize) {
    let n = x0.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    // initial simplex
    let mut simplex: Vec<Vec<f64>> = vec![x0.to_vec()];
    for i in 0..n {
        let mut x = x0.to_vec();
        x[i] += if x[i] != 0.0 { 0.1 * x[i] } else { 0.1 };
        simplex.push(x);
    }
    let mut values: Vec<f64> = simplex.iter().map(|x| f(x.as_slice())).collect();

    let mut iteration = 0;
    while iteration < max_iterations {
        iteration += 1;
        // sort vertices by value
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        if (values[n] - values[0]).abs() <= tolerance * (values[0].abs() + tolerance) {
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|x| x[j]).sum::<f64>() / n as f64)
            .collect();
        let towards = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(simplex[n].iter())
                .map(|(&c, &w)| c + t * (w - c))
                .collect()
        };

        let reflected = towards(-1.0);
        let fr = f(reflected.as_slice());
        if fr < values[0] {
            let expanded = towards(-2.0);
            let fe = f(expanded.as_slice());
            if fe < fr {
                simplex[n] = expanded;
                values[n] = fe;
            } else {
                simplex[n] = reflected;
                values[n] = fr;
            }
        } else if fr < values[n - 1] {
            simplex[n] = reflected;
            values[n] = fr;
        } else {
            let contracted = if fr < values[n] { towards(-0.5) } else { towards(0.5) };
            let fc = f(contracted.as_slice());
            if fc < values[n].min(fr) {
                simplex[n] = contracted;
                values[n] = fc;
            } else {
                // shrink toward the best vertex
                let best = simplex[0].clone();
                for i in 1..=n {
                    for (x, b) in simplex[i].iter_mut().zip(best.iter()) {
                        *x = b + 0.5 * (*x - b);
                    }
                    values[i] = f(simplex[i].as_slice());
                }
            }
        }
    }
    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    (simplex[best].clone(), iteration)
}
