//!
//! Normal distribution
//!
use super::{check_n_parameters, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::prob::Prob;

pub const NAME: &str = "scalar:normal distribution";

///
/// Normal distribution with parameters `[mu, sigma]`
///
#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    mu: f64,
    sigma: f64,
    /// `-log(sigma) - log(2 pi)/2`
    log_z: f64,
}

impl Normal {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() || !(sigma > 0.0) || !sigma.is_finite() {
            return Err(HmmError::InvalidParameter(format!(
                "normal distribution requires finite mu and sigma > 0 (mu={}, sigma={})",
                mu, sigma
            )));
        }
        Ok(Normal {
            mu,
            sigma,
            log_z: -sigma.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln(),
        })
    }
    pub fn from_parameters(parameters: &[f64]) -> Result<Self> {
        check_n_parameters(NAME, parameters, 2)?;
        Normal::new(parameters[0], parameters[1])
    }
    pub fn mu(&self) -> f64 {
        self.mu
    }
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl ScalarPdf for Normal {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        if !x.is_finite() {
            return Prob::zero();
        }
        let z = (x - self.mu) / self.sigma;
        Prob::from_log_prob(self.log_z - 0.5 * z * z)
    }
    fn parameters(&self) -> Vec<f64> {
        vec![self.mu, self.sigma]
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        *self = Normal::from_parameters(parameters)?;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
}
