//!
//! Forward and backward algorithms, likelihood and posteriors
//!
//! Tables have shape `(n_states, len)`:
//!
//! * `alpha[i, k] = P(x[0..=k], state_k = i)`
//! * `beta[i, k] = P(x[k+1..] | state_k = i)`
//!
use super::base::CoreHmm;
use crate::data::DataRecord;
use crate::error::{HmmError, Result};
use crate::prob::{normalize, Prob};
use fixedbitset::FixedBitSet;
use ndarray::Array2;

impl CoreHmm {
    ///
    /// Emission of state `i` at `position`.
    ///
    #[inline]
    pub(crate) fn emission<R: DataRecord + ?Sized>(&self, record: &R, i: usize, position: usize) -> Prob {
        record.log_pdf(self.state_map()[i], position)
    }
    ///
    /// Fill `next` with forward probabilities at `position >= 1` from the
    /// forward probabilities `prev` at `position - 1`.
    ///
    fn forward_step<R: DataRecord + ?Sized>(
        &self,
        record: &R,
        position: usize,
        prev: &[Prob],
        next: &mut [Prob],
    ) {
        let t = self.transition_into(position, record.len());
        for (j, x) in next.iter_mut().enumerate() {
            let s: Prob = prev.iter().enumerate().map(|(i, &a)| a * t[[i, j]]).sum();
            *x = s * self.emission(record, j, position);
        }
    }
    fn forward_init<R: DataRecord + ?Sized>(&self, record: &R) -> Vec<Prob> {
        (0..self.n_states())
            .map(|i| self.pi()[i] * self.emission(record, i, 0))
            .collect()
    }
    ///
    /// Forward table.
    ///
    pub fn forward<R: DataRecord + ?Sized>(&self, record: &R) -> Array2<Prob> {
        let m = self.n_states();
        let n = record.len();
        let mut alpha = Array2::from_elem((m, n), Prob::zero());
        if n == 0 {
            return alpha;
        }
        let mut prev = self.forward_init(record);
        let mut next = vec![Prob::zero(); m];
        alpha.column_mut(0).iter_mut().zip(prev.iter()).for_each(|(x, &y)| *x = y);
        for k in 1..n {
            self.forward_step(record, k, &prev, &mut next);
            alpha.column_mut(k).iter_mut().zip(next.iter()).for_each(|(x, &y)| *x = y);
            std::mem::swap(&mut prev, &mut next);
        }
        alpha
    }
    ///
    /// Backward table.
    ///
    pub fn backward<R: DataRecord + ?Sized>(&self, record: &R) -> Array2<Prob> {
        let m = self.n_states();
        let n = record.len();
        let mut beta = Array2::from_elem((m, n), Prob::zero());
        if n == 0 {
            return beta;
        }
        beta.column_mut(n - 1).iter_mut().for_each(|x| *x = Prob::one());
        let mut e = vec![Prob::zero(); m];
        for k in (0..n - 1).rev() {
            let t = self.transition_into(k + 1, n);
            for (j, x) in e.iter_mut().enumerate() {
                *x = self.emission(record, j, k + 1) * beta[[j, k + 1]];
            }
            for i in 0..m {
                beta[[i, k]] = e.iter().enumerate().map(|(j, &b)| t[[i, j]] * b).sum();
            }
        }
        beta
    }
    ///
    /// Log likelihood `log P(x)` by the forward algorithm.
    /// The empty sequence has probability one.
    ///
    pub fn log_pdf<R: DataRecord + ?Sized>(&self, record: &R) -> Prob {
        let n = record.len();
        if n == 0 {
            return Prob::one();
        }
        let mut prev = self.forward_init(record);
        let mut next = vec![Prob::zero(); self.n_states()];
        for k in 1..n {
            self.forward_step(record, k, &prev, &mut next);
            std::mem::swap(&mut prev, &mut next);
        }
        prev.iter().sum()
    }
    ///
    /// `P(state_k = i | x)` as a `(n_states, len)` table. Every column sums to one.
    ///
    /// Fails with `ZeroProbability` if the sequence is impossible under the model.
    ///
    pub fn posterior_marginals<R: DataRecord + ?Sized>(&self, record: &R) -> Result<Array2<Prob>> {
        let alpha = self.forward(record);
        let beta = self.backward(record);
        let mut gamma = alpha * &beta;
        for mut column in gamma.columns_mut() {
            let mut xs = column.to_vec();
            if normalize(&mut xs).is_zero() {
                return Err(HmmError::ZeroProbability);
            }
            for (x, y) in column.iter_mut().zip(xs) {
                *x = y;
            }
        }
        Ok(gamma)
    }
    ///
    /// Posterior probability `P(state_k ∈ allowed[k] for all k < L | x)` with
    /// `L = allowed.len() <= len`.
    ///
    /// An empty set at a position leaves that position unrestricted. The
    /// restricted forward probabilities at `L-1` are completed with the
    /// unrestricted backward probabilities.
    ///
    pub fn posterior<R: DataRecord + ?Sized>(&self, record: &R, allowed: &[FixedBitSet]) -> Result<Prob> {
        let m = self.n_states();
        let n = record.len();
        let l = allowed.len();
        if l > n {
            return Err(HmmError::DimensionMismatch(format!(
                "{} position restrictions for a sequence of length {}",
                l, n
            )));
        }
        let total = self.log_pdf(record);
        if total.is_zero() {
            return Err(HmmError::ZeroProbability);
        }
        if l == 0 {
            return Ok(Prob::one());
        }
        let is_allowed = |k: usize, i: usize| allowed[k].count_ones(..) == 0 || allowed[k].contains(i);

        let mut prev = self.forward_init(record);
        let mut next = vec![Prob::zero(); m];
        restrict(&mut prev, |i| is_allowed(0, i));
        for k in 1..l {
            self.forward_step(record, k, &prev, &mut next);
            restrict(&mut next, |i| is_allowed(k, i));
            std::mem::swap(&mut prev, &mut next);
        }
        let beta = self.backward(record);
        let restricted: Prob = prev
            .iter()
            .enumerate()
            .map(|(i, &a)| a * beta[[i, l - 1]])
            .sum();
        Ok(restricted / total)
    }
}

fn restrict<F: Fn(usize) -> bool>(xs: &mut [Prob], is_allowed: F) {
    for (i, x) in xs.iter_mut().enumerate() {
        if !is_allowed(i) {
            *x = Prob::zero();
        }
    }
}

//
// Tests
//
