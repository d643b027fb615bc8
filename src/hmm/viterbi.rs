//!
//! Viterbi decoding
//!
use super::base::CoreHmm;
use crate::data::DataRecord;
use crate::error::{HmmError, Result};
use crate::prob::Prob;
use ndarray::Array2;

impl CoreHmm {
    ///
    /// Most probable state path for the record and its joint log probability
    /// `log P(path, x)`.
    ///
    /// Ties are broken toward the lower state index. The empty record decodes to
    /// the empty path with probability one.
    ///
    pub fn viterbi<R: DataRecord + ?Sized>(&self, record: &R) -> Result<(Vec<usize>, Prob)> {
        let m = self.n_states();
        let n = record.len();
        if n == 0 {
            return Ok((Vec::new(), Prob::one()));
        }
        let mut back: Array2<usize> = Array2::zeros((m, n));
        let mut prev: Vec<Prob> = (0..m)
            .map(|i| self.pi()[i] * self.emission(record, i, 0))
            .collect();
        let mut next = vec![Prob::zero(); m];
        for k in 1..n {
            let t = self.transition_into(k, n);
            for j in 0..m {
                let (best_i, best) = argmax((0..m).map(|i| prev[i] * t[[i, j]]));
                back[[j, k]] = best_i;
                next[j] = best * self.emission(record, j, k);
            }
            std::mem::swap(&mut prev, &mut next);
        }
        let (last, score) = argmax(prev.iter().copied());
        if score.is_zero() {
            return Err(HmmError::ZeroProbability);
        }
        let mut path = vec![0; n];
        path[n - 1] = last;
        for k in (1..n).rev() {
            path[k - 1] = back[[path[k], k]];
        }
        Ok((path, score))
    }
}

/// index and value of the first maximum
fn argmax<I: Iterator<Item = Prob>>(xs: I) -> (usize, Prob) {
    let mut best = (0, Prob::zero());
    for (i, x) in xs.enumerate() {
        if x > best.1 {
            best = (i, x);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PrecomputedRecord;
    use crate::prob::p;

    #[test]
    fn decode_follows_emissions() {
        let h = CoreHmm::from_probs(&[0.5, 0.5], &[0.9, 0.1, 0.1, 0.9], None).unwrap();
        let e = [[0.9, 0.1], [0.9, 0.1], [0.1, 0.9], [0.1, 0.9], [0.1, 0.9]];
        let v: Vec<Prob> = e.iter().flat_map(|r| r.iter().map(|&x| p(x))).collect();
        let r = PrecomputedRecord::new(Array2::from_shape_vec((5, 2), v).unwrap());
        let (path, score) = h.viterbi(&r).unwrap();
        assert_eq!(path, vec![0, 0, 1, 1, 1]);
        let expected = 0.5 * 0.9 * 0.9 * 0.9 * 0.1 * 0.9 * 0.9 * 0.9 * 0.9 * 0.9;
        assert_abs_diff_eq!(score, p(expected), epsilon = 1e-12);
        assert!(score <= h.log_pdf(&r));
    }

    #[test]
    fn decode_respects_final_states() {
        let mut h = CoreHmm::from_probs(&[0.5, 0.5], &[0.9, 0.1, 0.1, 0.9], None).unwrap();
        h.set_final_states(&[1]).unwrap();
        let v: Vec<Prob> = vec![p(0.9), p(0.1), p(0.9), p(0.1)];
        let r = PrecomputedRecord::new(Array2::from_shape_vec((2, 2), v).unwrap());
        let (path, _) = h.viterbi(&r).unwrap();
        assert_eq!(path, vec![0, 1]);
    }

    #[test]
    fn decode_impossible() {
        let h = CoreHmm::from_probs(&[1.0, 0.0], &[1.0, 0.0, 0.0, 1.0], None).unwrap();
        let v: Vec<Prob> = vec![p(0.0), p(1.0)];
        let r = PrecomputedRecord::new(Array2::from_shape_vec((1, 2), v).unwrap());
        assert!(matches!(h.viterbi(&r), Err(HmmError::ZeroProbability)));
    }
}
