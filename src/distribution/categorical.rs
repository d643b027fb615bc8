//!
//! Categorical distribution over `{0, 1, ..., k-1}`
//!
use super::{as_count, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::prob::{normalize, Prob};

pub const NAME: &str = "scalar:categorical distribution";

///
/// `P(x = i) = theta[i]`, parameters are the probabilities `theta`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    log_theta: Vec<Prob>,
}

impl Categorical {
    ///
    /// Create from (not necessarily normalized) non-negative weights.
    ///
    pub fn new(theta: &[f64]) -> Result<Self> {
        let mut c = Categorical {
            log_theta: Vec::new(),
        };
        c.set_parameters(theta)?;
        Ok(c)
    }
    pub fn from_parameters(parameters: &[f64]) -> Result<Self> {
        Categorical::new(parameters)
    }
    ///
    /// Number of categories
    pub fn n_categories(&self) -> usize {
        self.log_theta.len()
    }
}

impl ScalarPdf for Categorical {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        match as_count(x) {
            Some(i) if (i as usize) < self.log_theta.len() => self.log_theta[i as usize],
            _ => Prob::zero(),
        }
    }
    fn parameters(&self) -> Vec<f64> {
        self.log_theta.iter().map(|p| p.to_value()).collect()
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        if parameters.is_empty() {
            return Err(HmmError::InvalidParameter(
                "categorical distribution needs at least one category".to_owned(),
            ));
        }
        if parameters.iter().any(|&t| !(t >= 0.0) || !t.is_finite()) {
            return Err(HmmError::InvalidParameter(format!(
                "categorical parameters must be non-negative: {:?}",
                parameters
            )));
        }
        let mut log_theta: Vec<Prob> = parameters.iter().map(|&t| Prob::from_prob(t)).collect();
        if normalize(&mut log_theta).is_zero() {
            return Err(HmmError::InvalidParameter(
                "categorical parameters sum to zero".to_owned(),
            ));
        }
        self.log_theta = log_theta;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
}
