//!
//! Negative binomial distribution
//!
use super::{as_count, check_n_parameters, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::prob::Prob;

pub const NAME: &str = "scalar:negative binomial distribution";

///
/// Negative binomial distribution with parameters `[r, p]`
///
/// ```text
/// P(x) = Gamma(x + r) / (Gamma(r) x!) p^r (1-p)^x
/// ```
///
/// mean is `r (1-p) / p`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeBinomial {
    r: f64,
    p: f64,
}

impl NegativeBinomial {
    pub fn new(r: f64, p: f64) -> Result<Self> {
        if !(r > 0.0) || !r.is_finite() || !(p > 0.0 && p <= 1.0) {
            return Err(HmmError::InvalidParameter(format!(
                "negative binomial distribution requires r > 0 and 0 < p <= 1 (r={}, p={})",
                r, p
            )));
        }
        Ok(NegativeBinomial { r, p })
    }
    pub fn from_parameters(parameters: &[f64]) -> Result<Self> {
        check_n_parameters(NAME, parameters, 2)?;
        NegativeBinomial::new(parameters[0], parameters[1])
    }
    pub fn mean(&self) -> f64 {
        self.r * (1.0 - self.p) / self.p
    }
}

impl ScalarPdf for NegativeBinomial {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        match as_count(x) {
            Some(k) => {
                let k = k as f64;
                let log_q = if k == 0.0 { 0.0 } else { k * (1.0 - self.p).ln() };
                Prob::from_log_prob(
                    libm::lgamma(k + self.r) - libm::lgamma(self.r) - libm::lgamma(k + 1.0)
                        + self.r * self.p.ln()
                        + log_q,
                )
            }
            None => Prob::zero(),
        }
    }
    fn parameters(&self) -> Vec<f64> {
        vec![self.r, self.p]
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        *self = NegativeBinomial::from_parameters(parameters)?;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_binomial_pmf() {
        // r=1 is a geometric distribution
        let d = NegativeBinomial::new(1.0, 0.25).unwrap();
        assert_abs_diff_eq!(d.log_pdf(0.0).to_value(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(d.log_pdf(2.0).to_value(), 0.25 * 0.75 * 0.75, epsilon = 1e-12);
        let d = NegativeBinomial::new(3.5, 0.4).unwrap();
        let total: f64 = (0..400).map(|k| d.log_pdf(k as f64).to_value()).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(d.mean(), 3.5 * 0.6 / 0.4, epsilon = 1e-12);
    }

    #[test]
    fn negative_binomial_degenerate_p_one() {
        let d = NegativeBinomial::new(2.0, 1.0).unwrap();
        assert_abs_diff_eq!(d.log_pdf(0.0).to_value(), 1.0, epsilon = 1e-12);
        assert!(d.log_pdf(1.0).is_zero());
    }
}
