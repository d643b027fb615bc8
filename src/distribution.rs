//!
//! Emission distributions
//!
//! HMM states and mixture components only see the `ScalarPdf` capability,
//! so any family implementing it can be plugged into the models.
//! Concrete families live in the submodules and are reachable by name
//! through `new_distribution` for config import.
//!
pub mod categorical;
pub mod gamma;
pub mod negative_binomial;
pub mod normal;
pub mod poisson;

pub use categorical::Categorical;
pub use gamma::Gamma;
pub use negative_binomial::NegativeBinomial;
pub use normal::Normal;
pub use poisson::Poisson;

use crate::config::Config;
use crate::error::{HmmError, Result};
use crate::prob::Prob;
use fnv::FnvHashMap;
use once_cell::sync::Lazy;

///
/// Distribution over scalar observations.
///
/// * `log_pdf(x)` log density (or mass) at `x`; zero outside of the support.
/// * `parameters()`/`set_parameters()` flat parameter vector, used by estimators
///   and config export.
///
pub trait ScalarPdf: Send + Sync + std::fmt::Debug {
    ///
    /// Registry name of the family
    fn name(&self) -> &'static str;
    fn log_pdf(&self, x: f64) -> Prob;
    fn parameters(&self) -> Vec<f64>;
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()>;
    fn clone_box(&self) -> Box<dyn ScalarPdf>;
    ///
    /// Config node of this distribution. Families with child distributions
    /// override the flat default.
    fn to_config(&self) -> Result<Config> {
        Config::new(self.name(), &self.parameters(), Vec::new())
    }
}

impl Clone for Box<dyn ScalarPdf> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

///
/// `x` as a count (non-negative integer) if it is one.
///
pub fn as_count(x: f64) -> Option<u64> {
    if x.is_finite() && x >= 0.0 && x.fract() == 0.0 {
        Some(x as u64)
    } else {
        None
    }
}

pub(crate) fn check_n_parameters(name: &str, parameters: &[f64], n: usize) -> Result<()> {
    if parameters.len() != n {
        Err(HmmError::InvalidParameter(format!(
            "{} takes {} parameters but {} were given",
            name,
            n,
            parameters.len()
        )))
    } else {
        Ok(())
    }
}

type Constructor = fn(&[f64]) -> Result<Box<dyn ScalarPdf>>;

static REGISTRY: Lazy<FnvHashMap<&'static str, Constructor>> = Lazy::new(|| {
    let mut m: FnvHashMap<&'static str, Constructor> = FnvHashMap::default();
    m.insert(categorical::NAME, |ps| {
        Ok(Box::new(Categorical::from_parameters(ps)?))
    });
    m.insert(normal::NAME, |ps| Ok(Box::new(Normal::from_parameters(ps)?)));
    m.insert(poisson::NAME, |ps| Ok(Box::new(Poisson::from_parameters(ps)?)));
    m.insert(gamma::NAME, |ps| Ok(Box::new(Gamma::from_parameters(ps)?)));
    m.insert(negative_binomial::NAME, |ps| {
        Ok(Box::new(NegativeBinomial::from_parameters(ps)?))
    });
    m
});

///
/// Construct a distribution from its registry name and parameter vector.
///
pub fn new_distribution(name: &str, parameters: &[f64]) -> Result<Box<dyn ScalarPdf>> {
    match REGISTRY.get(name) {
        Some(constructor) => constructor(parameters),
        None => Err(HmmError::UnknownDistribution(name.to_owned())),
    }
}

///
/// Names accepted by `new_distribution`, sorted.
///
pub fn registered_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}
