//!
//! EM step of `Mixture`
//!
//! For every unique value `u` with count `n_u`, the responsibilities
//! `r[c, u] = n_u P(c | x_u)` are the class weights handed to the estimators,
//! and the new mixture weights are proportional to `sum_u r[c, u]`.
//!
use super::Mixture;
use crate::data::{EmissionTable, ObservationSet};
use crate::distribution::ScalarPdf;
use crate::em::{EmModel, StepResult};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::{normalize, Prob};
use ndarray::Array2;

#[derive(Debug, Clone)]
pub struct MixtureTmp {
    totals: Vec<Prob>,
    weights: Array2<Prob>,
    log_likelihood: f64,
}

impl MixtureTmp {
    fn new(n_components: usize, n_unique: usize) -> Self {
        MixtureTmp {
            totals: vec![Prob::zero(); n_components],
            weights: Array2::from_elem((n_components, n_unique), Prob::zero()),
            log_likelihood: 0.0,
        }
    }
    fn clear(&mut self) {
        self.totals.iter_mut().for_each(|x| *x = Prob::zero());
        self.weights.iter_mut().for_each(|x| *x = Prob::zero());
        self.log_likelihood = 0.0;
    }
}

impl EmModel for Mixture {
    type Tmp = MixtureTmp;

    fn edist(&self) -> &[Box<dyn ScalarPdf>] {
        Mixture::edist(self)
    }
    fn set_edist(&mut self, class: usize, dist: Box<dyn ScalarPdf>) {
        Mixture::set_edist(self, class, dist)
    }
    fn new_tmp(&self, data: &ObservationSet) -> MixtureTmp {
        MixtureTmp::new(self.n_components(), data.n_unique())
    }
    fn step(
        &self,
        next: &mut Self,
        data: &ObservationSet,
        table: &EmissionTable,
        tmp: &mut [MixtureTmp],
        pool: &ThreadPool,
    ) -> Result<StepResult> {
        let n = self.n_components();
        let log_weights = self.log_weights();
        let values = data.values();
        let counts = data.counts();
        pool.run_chunked(data.n_unique(), tmp, |_, t, range| {
            t.clear();
            let mut r = vec![Prob::zero(); n];
            for u in range {
                for (c, x) in r.iter_mut().enumerate() {
                    *x = log_weights[c] * table.get(c, u);
                }
                let s = normalize(&mut r);
                if s.is_zero() {
                    return Err(HmmError::ZeroObservation(values[u]));
                }
                t.log_likelihood += counts[u] * s.to_log_value();
                for (c, &x) in r.iter().enumerate() {
                    let w = x * counts[u];
                    t.weights[[c, u]] = w;
                    t.totals[c] += w;
                }
            }
            Ok(())
        })?;

        let mut totals = vec![Prob::zero(); n];
        let mut weights = Array2::from_elem((n, data.n_unique()), Prob::zero());
        let mut log_likelihood = 0.0;
        for t in tmp.iter() {
            for (a, &b) in totals.iter_mut().zip(t.totals.iter()) {
                *a += b;
            }
            weights.zip_mut_with(&t.weights, |a, &b| *a += b);
            log_likelihood += t.log_likelihood;
        }
        if normalize(&mut totals).is_zero() {
            totals = log_weights.to_vec();
        }
        next.set_log_weights(totals);

        Ok(StepResult {
            log_likelihood,
            weights,
        })
    }
}
