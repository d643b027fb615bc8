//!
//! Baum-Welch E-step of `Hmm`
//!
//! Expected counts accumulated per sequence:
//!
//! * `pi[i] += gamma[i, 0]`
//! * `tr[i, j] += xi[i, j, k]` for every transition `k -> k+1` that uses `Tr`,
//!   i.e. `k + 1 < N - 1`. The last transition uses `Tf` and is excluded.
//! * `weights[state_map[i], u] += gamma[i, k]` where `u` is the unique value
//!   observed at `k`.
//!
//! `Tf` of the next model is derived from its re-estimated `Tr`.
//!
use super::base::CoreHmm;
use super::model::Hmm;
use crate::data::{DataRecord, EmissionTable, ObservationSet};
use crate::distribution::ScalarPdf;
use crate::em::{EmModel, StepResult};
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;
use ndarray::Array2;

///
/// Expected counts of one worker.
///
#[derive(Debug, Clone)]
pub struct BaumWelchTmp {
    pi: Vec<Prob>,
    tr: Array2<Prob>,
    weights: Array2<Prob>,
    log_likelihood: f64,
}

impl BaumWelchTmp {
    pub fn new(n_states: usize, n_classes: usize, n_unique: usize) -> Self {
        BaumWelchTmp {
            pi: vec![Prob::zero(); n_states],
            tr: Array2::from_elem((n_states, n_states), Prob::zero()),
            weights: Array2::from_elem((n_classes, n_unique), Prob::zero()),
            log_likelihood: 0.0,
        }
    }
    fn clear(&mut self) {
        self.pi.iter_mut().for_each(|x| *x = Prob::zero());
        self.tr.iter_mut().for_each(|x| *x = Prob::zero());
        self.weights.iter_mut().for_each(|x| *x = Prob::zero());
        self.log_likelihood = 0.0;
    }
    fn merge(&mut self, other: &BaumWelchTmp) {
        for (x, &y) in self.pi.iter_mut().zip(other.pi.iter()) {
            *x += y;
        }
        self.tr.zip_mut_with(&other.tr, |x, &y| *x += y);
        self.weights.zip_mut_with(&other.weights, |x, &y| *x += y);
        self.log_likelihood += other.log_likelihood;
    }
}

impl CoreHmm {
    ///
    /// Add the expected counts of one record to `tmp`.
    ///
    fn accumulate<R: DataRecord + ?Sized>(&self, record: &R, tmp: &mut BaumWelchTmp) -> Result<()> {
        let m = self.n_states();
        let n = record.len();
        if n == 0 {
            return Ok(());
        }
        let alpha = self.forward(record);
        let beta = self.backward(record);
        let total: Prob = alpha.column(n - 1).iter().sum();
        if total.is_zero() {
            return Err(HmmError::ZeroProbability);
        }

        for k in 0..n {
            let u = record.map_index(k);
            for i in 0..m {
                let gamma = alpha[[i, k]] * beta[[i, k]] / total;
                if k == 0 {
                    tmp.pi[i] += gamma;
                }
                tmp.weights[[self.state_map()[i], u]] += gamma;
            }
        }

        let tr = self.tr();
        for k in 0..n.saturating_sub(2) {
            for j in 0..m {
                let e = self.emission(record, j, k + 1) * beta[[j, k + 1]] / total;
                for i in 0..m {
                    tmp.tr[[i, j]] += alpha[[i, k]] * tr[[i, j]] * e;
                }
            }
        }

        tmp.log_likelihood += total.to_log_value();
        Ok(())
    }
}

impl EmModel for Hmm {
    type Tmp = BaumWelchTmp;

    fn edist(&self) -> &[Box<dyn ScalarPdf>] {
        Hmm::edist(self)
    }
    fn set_edist(&mut self, class: usize, dist: Box<dyn ScalarPdf>) {
        Hmm::set_edist(self, class, dist)
    }
    fn new_tmp(&self, data: &ObservationSet) -> BaumWelchTmp {
        BaumWelchTmp::new(self.n_states(), self.n_classes(), data.n_unique())
    }
    fn step(
        &self,
        next: &mut Self,
        data: &ObservationSet,
        table: &EmissionTable,
        tmp: &mut [BaumWelchTmp],
        pool: &ThreadPool,
    ) -> Result<StepResult> {
        let core = self.core();
        pool.run_chunked(data.n_sequences(), tmp, |_, t, range| {
            t.clear();
            for s in range {
                core.accumulate(&data.record(table, s), t)?;
            }
            Ok(())
        })?;

        let mut sum = BaumWelchTmp::new(self.n_states(), self.n_classes(), data.n_unique());
        for t in tmp.iter() {
            sum.merge(t);
        }

        // states never left keep their transition row
        for (i, mut row) in sum.tr.rows_mut().into_iter().enumerate() {
            if row.iter().all(|x| x.is_zero()) {
                row.assign(&core.tr().row(i));
            }
        }
        if sum.pi.iter().all(|x| x.is_zero()) {
            sum.pi.copy_from_slice(core.pi());
        }
        next.core_mut().update(&sum.pi, &sum.tr);

        Ok(StepResult {
            log_likelihood: sum.log_likelihood,
            weights: sum.weights,
        })
    }
}
