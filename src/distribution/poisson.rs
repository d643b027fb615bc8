//!
//! Poisson distribution
//!
use super::{as_count, check_n_parameters, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::prob::Prob;

pub const NAME: &str = "scalar:poisson distribution";

///
/// Poisson distribution with parameter `[lambda]`
///
#[derive(Debug, Clone, PartialEq)]
pub struct Poisson {
    lambda: f64,
}

impl Poisson {
    pub fn new(lambda: f64) -> Result<Self> {
        if !(lambda > 0.0) || !lambda.is_finite() {
            return Err(HmmError::InvalidParameter(format!(
                "poisson distribution requires lambda > 0 (lambda={})",
                lambda
            )));
        }
        Ok(Poisson { lambda })
    }
    pub fn from_parameters(parameters: &[f64]) -> Result<Self> {
        check_n_parameters(NAME, parameters, 1)?;
        Poisson::new(parameters[0])
    }
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl ScalarPdf for Poisson {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        match as_count(x) {
            Some(k) => {
                let k = k as f64;
                Prob::from_log_prob(k * self.lambda.ln() - self.lambda - libm::lgamma(k + 1.0))
            }
            None => Prob::zero(),
        }
    }
    fn parameters(&self) -> Vec<f64> {
        vec![self.lambda]
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        *self = Poisson::from_parameters(parameters)?;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
}
