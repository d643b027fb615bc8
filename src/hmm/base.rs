//!
//! Definition of `CoreHmm`
//!
use crate::error::{HmmError, Result};
use crate::prob::{normalize, Prob};
use ndarray::Array2;

///
/// Transition structure of an HMM, independent of the emission distributions.
///
/// All probabilities are stored in log space. The invariants after
/// construction (and after every `normalize()`) are
///
/// * `pi` sums to one and is zero outside the start states (if set)
/// * each row of `tr` sums to one
/// * `tf` is `tr` with the columns of non-final states zeroed and rows
///   renormalized (equal to `tr` if no final states are set)
///
#[derive(Debug, Clone, PartialEq)]
pub struct CoreHmm {
    pi: Vec<Prob>,
    tr: Array2<Prob>,
    tf: Array2<Prob>,
    state_map: Vec<usize>,
    n_classes: usize,
    start_states: Option<Vec<usize>>,
    final_states: Option<Vec<usize>>,
}

impl CoreHmm {
    ///
    /// Create from log initial probabilities `pi` (length `M`), log transition
    /// matrix `tr` (`M x M`) and the state map (identity if `None`).
    ///
    /// Values need not be normalized.
    ///
    pub fn new(pi: Vec<Prob>, tr: Array2<Prob>, state_map: Option<Vec<usize>>) -> Result<Self> {
        let m = pi.len();
        if m == 0 {
            return Err(HmmError::DimensionMismatch(
                "model must have at least one state".to_owned(),
            ));
        }
        if tr.nrows() != m || tr.ncols() != m {
            return Err(HmmError::DimensionMismatch(format!(
                "transition matrix is {}x{} but there are {} states",
                tr.nrows(),
                tr.ncols(),
                m
            )));
        }
        let state_map = state_map.unwrap_or_else(|| (0..m).collect());
        if state_map.len() != m {
            return Err(HmmError::DimensionMismatch(format!(
                "state map has length {} but there are {} states",
                state_map.len(),
                m
            )));
        }
        if pi.iter().chain(tr.iter()).any(|x| x.is_nan()) {
            return Err(HmmError::InvalidParameter(
                "initial/transition probabilities contain NaN".to_owned(),
            ));
        }
        let n_classes = state_map.iter().max().map_or(0, |&c| c + 1);
        let tf = tr.clone();
        let mut hmm = CoreHmm {
            pi,
            tr,
            tf,
            state_map,
            n_classes,
            start_states: None,
            final_states: None,
        };
        hmm.normalize();
        Ok(hmm)
    }
    ///
    /// Create from probabilities (not logs). `tr` is row-major.
    ///
    pub fn from_probs(pi: &[f64], tr: &[f64], state_map: Option<Vec<usize>>) -> Result<Self> {
        let m = pi.len();
        if pi.iter().chain(tr.iter()).any(|&x| x < 0.0) {
            return Err(HmmError::InvalidParameter(
                "initial/transition probabilities must be non-negative".to_owned(),
            ));
        }
        let tr = Array2::from_shape_vec((m, m), tr.iter().map(|&x| Prob::from_prob(x)).collect())
            .map_err(|e| HmmError::DimensionMismatch(format!("transition matrix: {}", e)))?;
        CoreHmm::new(
            pi.iter().map(|&x| Prob::from_prob(x)).collect(),
            tr,
            state_map,
        )
    }
    pub fn n_states(&self) -> usize {
        self.pi.len()
    }
    ///
    /// number of emission classes `K = max(state_map) + 1`
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
    pub fn pi(&self) -> &[Prob] {
        &self.pi
    }
    pub fn tr(&self) -> &Array2<Prob> {
        &self.tr
    }
    pub fn tf(&self) -> &Array2<Prob> {
        &self.tf
    }
    pub fn state_map(&self) -> &[usize] {
        &self.state_map
    }
    pub fn start_states(&self) -> Option<&[usize]> {
        self.start_states.as_deref()
    }
    pub fn final_states(&self) -> Option<&[usize]> {
        self.final_states.as_deref()
    }
    ///
    /// Transition matrix used for the transition into `position` of a
    /// sequence of length `len`.
    ///
    #[inline]
    pub fn transition_into(&self, position: usize, len: usize) -> &Array2<Prob> {
        if position + 1 == len {
            &self.tf
        } else {
            &self.tr
        }
    }
    ///
    /// Restrict the first state of every path to `states`.
    ///
    pub fn set_start_states(&mut self, states: &[usize]) -> Result<()> {
        self.start_states = Some(self.check_states(states)?);
        self.normalize();
        Ok(())
    }
    ///
    /// Restrict the last state of every path to `states`.
    ///
    pub fn set_final_states(&mut self, states: &[usize]) -> Result<()> {
        self.final_states = Some(self.check_states(states)?);
        self.normalize();
        Ok(())
    }
    fn check_states(&self, states: &[usize]) -> Result<Vec<usize>> {
        if states.is_empty() {
            return Err(HmmError::InvalidParameter(
                "state set must not be empty".to_owned(),
            ));
        }
        let n_states = self.n_states();
        if let Some(&state) = states.iter().find(|&&s| s >= n_states) {
            return Err(HmmError::InvalidState { state, n_states });
        }
        let mut states = states.to_vec();
        states.sort_unstable();
        states.dedup();
        Ok(states)
    }
    ///
    /// Restore the invariants. Normalizing a normalized model changes nothing.
    ///
    pub fn normalize(&mut self) {
        // pi
        if let Some(start) = &self.start_states {
            for (i, x) in self.pi.iter_mut().enumerate() {
                if start.binary_search(&i).is_err() {
                    *x = Prob::zero();
                }
            }
        }
        normalize(&mut self.pi);

        // tr
        normalize_rows(&mut self.tr);

        // tf
        self.tf = self.tr.clone();
        if let Some(fin) = &self.final_states {
            for ((_, j), x) in self.tf.indexed_iter_mut() {
                if fin.binary_search(&j).is_err() {
                    *x = Prob::zero();
                }
            }
            normalize_rows(&mut self.tf);
        }
    }
    ///
    /// Replace `pi` and `tr` (e.g. by re-estimated values) and renormalize.
    ///
    pub(crate) fn update(&mut self, pi: &[Prob], tr: &Array2<Prob>) {
        self.pi.copy_from_slice(pi);
        self.tr.assign(tr);
        self.normalize();
    }
    ///
    /// Flat parameter vector: `log pi` followed by `log tr` (row-major).
    ///
    pub fn parameters(&self) -> Vec<f64> {
        self.pi
            .iter()
            .chain(self.tr.iter())
            .map(|x| x.to_log_value())
            .collect()
    }
}

fn normalize_rows(m: &mut Array2<Prob>) {
    for mut row in m.rows_mut() {
        let mut xs = row.to_vec();
        normalize(&mut xs);
        for (x, y) in row.iter_mut().zip(xs) {
            *x = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prob::p;

    fn hmm() -> CoreHmm {
        CoreHmm::from_probs(&[1.0, 3.0], &[1.0, 1.0, 1.0, 3.0], None).unwrap()
    }

    #[test]
    fn new_normalizes() {
        let h = hmm();
        assert_eq!(h.n_states(), 2);
        assert_eq!(h.n_classes(), 2);
        assert_abs_diff_eq!(h.pi()[0], p(0.25), epsilon = 1e-12);
        assert_abs_diff_eq!(h.pi()[1], p(0.75), epsilon = 1e-12);
        assert_abs_diff_eq!(h.tr()[[0, 1]], p(0.5), epsilon = 1e-12);
        assert_abs_diff_eq!(h.tr()[[1, 1]], p(0.75), epsilon = 1e-12);
        assert_eq!(h.tr(), h.tf());
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut h = hmm();
        h.set_final_states(&[1]).unwrap();
        let before = h.clone();
        h.normalize();
        assert_eq!(h, before);
    }

    #[test]
    fn start_and_final_states() {
        let mut h = hmm();
        h.set_start_states(&[1]).unwrap();
        assert!(h.pi()[0].is_zero());
        assert!(h.pi()[1].is_one());
        h.set_final_states(&[0]).unwrap();
        assert!(h.tf()[[0, 0]].is_one());
        assert!(h.tf()[[1, 0]].is_one());
        assert!(h.tf()[[1, 1]].is_zero());
        // tr is untouched
        assert_abs_diff_eq!(h.tr()[[1, 0]], p(0.25), epsilon = 1e-12);
        assert_eq!(h.final_states(), Some(&[0][..]));
    }

    #[test]
    fn invalid_models() {
        assert!(matches!(
            CoreHmm::from_probs(&[0.5, 0.5], &[1.0, 0.0, 0.0], None),
            Err(HmmError::DimensionMismatch(_))
        ));
        assert!(matches!(
            CoreHmm::from_probs(&[0.5, 0.5], &[1.0, 0.0, 0.0, 1.0], Some(vec![0])),
            Err(HmmError::DimensionMismatch(_))
        ));
        assert!(matches!(
            CoreHmm::from_probs(&[], &[], None),
            Err(HmmError::DimensionMismatch(_))
        ));
        let mut h = hmm();
        assert!(matches!(
            h.set_start_states(&[2]),
            Err(HmmError::InvalidState {
                state: 2,
                n_states: 2
            })
        ));
        assert!(h.set_final_states(&[]).is_err());
    }

    #[test]
    fn state_map_classes() {
        let h = CoreHmm::from_probs(
            &[1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            Some(vec![0, 1, 0]),
        )
        .unwrap();
        assert_eq!(h.n_classes(), 2);
        assert_eq!(h.state_map(), &[0, 1, 0]);
        assert_eq!(h.parameters().len(), 3 + 9);
    }
}
