//!
//! Gamma distribution
//!
use super::{check_n_parameters, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::prob::Prob;

pub const NAME: &str = "scalar:gamma distribution";

///
/// Gamma distribution with parameters `[shape, rate]`
///
/// ```text
/// p(x) = rate^shape / Gamma(shape) x^(shape-1) exp(-rate x)    (x > 0)
/// ```
///
/// There is no closed form maximum likelihood estimate for `shape`, so it is
/// fitted with `NumericEstimator`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Gamma {
    shape: f64,
    rate: f64,
    log_z: f64,
}

impl Gamma {
    pub fn new(shape: f64, rate: f64) -> Result<Self> {
        if !(shape > 0.0) || !(rate > 0.0) || !shape.is_finite() || !rate.is_finite() {
            return Err(HmmError::InvalidParameter(format!(
                "gamma distribution requires shape > 0 and rate > 0 (shape={}, rate={})",
                shape, rate
            )));
        }
        Ok(Gamma {
            shape,
            rate,
            log_z: shape * rate.ln() - libm::lgamma(shape),
        })
    }
    pub fn from_parameters(parameters: &[f64]) -> Result<Self> {
        check_n_parameters(NAME, parameters, 2)?;
        Gamma::new(parameters[0], parameters[1])
    }
}

impl ScalarPdf for Gamma {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        if !(x > 0.0) || !x.is_finite() {
            return Prob::zero();
        }
        Prob::from_log_prob(self.log_z + (self.shape - 1.0) * x.ln() - self.rate * x)
    }
    fn parameters(&self) -> Vec<f64> {
        vec![self.shape, self.rate]
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        *self = Gamma::from_parameters(parameters)?;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
}
