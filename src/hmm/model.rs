//!
//! `Hmm`: transition structure plus emission distributions
//!
use super::base::CoreHmm;
use crate::data::RawRecord;
use crate::distribution::ScalarPdf;
use crate::error::{HmmError, Result};
use crate::prob::Prob;
use fixedbitset::FixedBitSet;
use ndarray::Array2;

///
/// HMM with one emission distribution per emission class.
///
/// States `i` emit with `edist[state_map[i]]`, so several states may share a
/// distribution.
///
#[derive(Debug, Clone)]
pub struct Hmm {
    core: CoreHmm,
    edist: Vec<Box<dyn ScalarPdf>>,
}

impl Hmm {
    ///
    /// Create from log probabilities. Fails unless `edist` has one
    /// distribution per emission class.
    ///
    pub fn new(
        pi: Vec<Prob>,
        tr: Array2<Prob>,
        state_map: Option<Vec<usize>>,
        edist: Vec<Box<dyn ScalarPdf>>,
    ) -> Result<Self> {
        Hmm::from_core(CoreHmm::new(pi, tr, state_map)?, edist)
    }
    ///
    /// Create from probabilities; `tr` is row-major.
    ///
    pub fn from_probs(
        pi: &[f64],
        tr: &[f64],
        state_map: Option<Vec<usize>>,
        edist: Vec<Box<dyn ScalarPdf>>,
    ) -> Result<Self> {
        Hmm::from_core(CoreHmm::from_probs(pi, tr, state_map)?, edist)
    }
    pub fn from_core(core: CoreHmm, edist: Vec<Box<dyn ScalarPdf>>) -> Result<Self> {
        if edist.len() != core.n_classes() {
            return Err(HmmError::DimensionMismatch(format!(
                "{} emission classes but {} distributions",
                core.n_classes(),
                edist.len()
            )));
        }
        Ok(Hmm { core, edist })
    }
    pub fn core(&self) -> &CoreHmm {
        &self.core
    }
    pub(crate) fn core_mut(&mut self) -> &mut CoreHmm {
        &mut self.core
    }
    pub fn edist(&self) -> &[Box<dyn ScalarPdf>] {
        &self.edist
    }
    pub fn set_edist(&mut self, class: usize, dist: Box<dyn ScalarPdf>) {
        self.edist[class] = dist;
    }
    pub fn n_states(&self) -> usize {
        self.core.n_states()
    }
    pub fn n_classes(&self) -> usize {
        self.core.n_classes()
    }
    pub fn set_start_states(&mut self, states: &[usize]) -> Result<()> {
        self.core.set_start_states(states)
    }
    pub fn set_final_states(&mut self, states: &[usize]) -> Result<()> {
        self.core.set_final_states(states)
    }
    pub fn normalize(&mut self) {
        self.core.normalize()
    }
    ///
    /// Transition parameters followed by the parameters of every emission
    /// distribution in class order.
    ///
    pub fn parameters(&self) -> Vec<f64> {
        let mut ps = self.core.parameters();
        for d in self.edist.iter() {
            ps.extend(d.parameters());
        }
        ps
    }

    //
    // inference on raw observation sequences
    //

    ///
    /// Log likelihood `log P(x)` of a sequence.
    ///
    pub fn log_pdf(&self, x: &[f64]) -> Prob {
        self.core.log_pdf(&RawRecord::new(&self.edist, x))
    }
    ///
    /// Posterior marginals `P(state_k = i | x)` of shape `(M, N)`.
    ///
    pub fn posterior_marginals(&self, x: &[f64]) -> Result<Array2<Prob>> {
        self.core
            .posterior_marginals(&RawRecord::new(&self.edist, x))
    }
    ///
    /// Posterior probability of the paths through `allowed`.
    /// See `CoreHmm::posterior`.
    ///
    pub fn posterior(&self, x: &[f64], allowed: &[FixedBitSet]) -> Result<Prob> {
        self.core
            .posterior(&RawRecord::new(&self.edist, x), allowed)
    }
    ///
    /// Most probable state path and its joint log probability.
    ///
    pub fn viterbi(&self, x: &[f64]) -> Result<(Vec<usize>, Prob)> {
        self.core.viterbi(&RawRecord::new(&self.edist, x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Categorical;

    #[test]
    fn edist_count_must_match_classes() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![Box::new(Categorical::new(&[0.5, 0.5]).unwrap())];
        let r = Hmm::from_probs(&[0.5, 0.5], &[0.5, 0.5, 0.5, 0.5], None, edist.clone());
        assert!(matches!(r, Err(HmmError::DimensionMismatch(_))));
        let h = Hmm::from_probs(&[0.5, 0.5], &[0.5, 0.5, 0.5, 0.5], Some(vec![0, 0]), edist).unwrap();
        assert_eq!(h.n_states(), 2);
        assert_eq!(h.n_classes(), 1);
        assert_eq!(h.parameters().len(), 2 + 4 + 2);
    }
}
