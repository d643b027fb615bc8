//!
//! Finite mixture of scalar distributions
//!
//! ```text
//! p(x) = sum_c w_c p_c(x)
//! ```
//!
//! A `Mixture` is itself a `ScalarPdf`, so it can be used as an emission
//! distribution, and an `EmModel` trained by `em::run`.
//!
pub mod em;

use crate::config::{
    export_distributions, import_distributions, neg_inf_as_null, Config, ConfigExport,
};
use crate::distribution::ScalarPdf;
use crate::error::{HmmError, Result};
use crate::prob::{normalize, Prob};
use log::warn;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "scalar:mixture distribution";

#[derive(Debug, Clone)]
pub struct Mixture {
    log_weights: Vec<Prob>,
    edist: Vec<Box<dyn ScalarPdf>>,
}

impl Mixture {
    ///
    /// Create from non-negative (not necessarily normalized) weights.
    ///
    pub fn new(weights: &[f64], edist: Vec<Box<dyn ScalarPdf>>) -> Result<Self> {
        if weights.len() != edist.len() {
            return Err(HmmError::DimensionMismatch(format!(
                "{} weights for {} components",
                weights.len(),
                edist.len()
            )));
        }
        let log_weights = weights_to_log(weights)?;
        Ok(Mixture { log_weights, edist })
    }
    ///
    /// Create from log weights, normalized here.
    ///
    pub fn from_log_weights(mut log_weights: Vec<Prob>, edist: Vec<Box<dyn ScalarPdf>>) -> Result<Self> {
        if log_weights.len() != edist.len() {
            return Err(HmmError::DimensionMismatch(format!(
                "{} weights for {} components",
                log_weights.len(),
                edist.len()
            )));
        }
        if log_weights.iter().any(|w| w.is_nan()) {
            return Err(HmmError::InvalidParameter(
                "mixture log weights contain NaN".to_owned(),
            ));
        }
        let total = normalize(&mut log_weights);
        if total.is_zero() {
            return Err(HmmError::InvalidParameter(
                "mixture weights sum to zero".to_owned(),
            ));
        }
        if total.to_log_value().abs() > 1e-6 {
            warn!("mixture weights sum to {}; normalized", total.to_value());
        }
        Ok(Mixture { log_weights, edist })
    }
    pub fn n_components(&self) -> usize {
        self.edist.len()
    }
    pub fn log_weights(&self) -> &[Prob] {
        &self.log_weights
    }
    pub fn edist(&self) -> &[Box<dyn ScalarPdf>] {
        &self.edist
    }
    pub fn set_edist(&mut self, component: usize, dist: Box<dyn ScalarPdf>) {
        self.edist[component] = dist;
    }
    pub(crate) fn set_log_weights(&mut self, log_weights: Vec<Prob>) {
        self.log_weights = log_weights;
    }
    ///
    /// `log(w_c p_c(x))` for every component.
    ///
    pub fn joint(&self, x: f64) -> Vec<Prob> {
        self.log_weights
            .iter()
            .zip(self.edist.iter())
            .map(|(&w, d)| w * d.log_pdf(x))
            .collect()
    }
    ///
    /// Responsibilities `P(c | x)`. Fails with `ZeroObservation` if `x` has
    /// zero probability under every component.
    ///
    pub fn posterior(&self, x: f64) -> Result<Vec<Prob>> {
        let mut r = self.joint(x);
        if normalize(&mut r).is_zero() {
            return Err(HmmError::ZeroObservation(x));
        }
        Ok(r)
    }
    ///
    /// Log posterior probability that `x` comes from one of `components`.
    ///
    pub fn posterior_of(&self, x: f64, components: &[usize]) -> Result<Prob> {
        let r = self.posterior(x)?;
        components
            .iter()
            .map(|&c| {
                r.get(c).copied().ok_or(HmmError::InvalidState {
                    state: c,
                    n_states: r.len(),
                })
            })
            .sum()
    }
    ///
    /// Most probable component for `x` (lowest index on ties).
    ///
    pub fn classify(&self, x: f64) -> Result<usize> {
        let r = self.posterior(x)?;
        let mut best = 0;
        for (c, p) in r.iter().enumerate() {
            if *p > r[best] {
                best = c;
            }
        }
        Ok(best)
    }
}

fn weights_to_log(weights: &[f64]) -> Result<Vec<Prob>> {
    if let Some((index, &weight)) = weights.iter().enumerate().find(|(_, w)| !(**w >= 0.0)) {
        return Err(HmmError::NegativeWeight { index, weight });
    }
    let mut log_weights: Vec<Prob> = weights.iter().map(|&w| Prob::from_prob(w)).collect();
    if normalize(&mut log_weights).is_zero() {
        return Err(HmmError::InvalidParameter(
            "mixture weights sum to zero".to_owned(),
        ));
    }
    Ok(log_weights)
}

impl ScalarPdf for Mixture {
    fn name(&self) -> &'static str {
        NAME
    }
    fn log_pdf(&self, x: f64) -> Prob {
        self.joint(x).into_iter().sum()
    }
    ///
    /// weights (probabilities) followed by the parameters of every component
    fn parameters(&self) -> Vec<f64> {
        let mut ps: Vec<f64> = self.log_weights.iter().map(|w| w.to_value()).collect();
        for d in self.edist.iter() {
            ps.extend(d.parameters());
        }
        ps
    }
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        let n = self.n_components();
        let sizes: Vec<usize> = self.edist.iter().map(|d| d.parameters().len()).collect();
        let expected = n + sizes.iter().sum::<usize>();
        if parameters.len() != expected {
            return Err(HmmError::InvalidParameter(format!(
                "mixture takes {} parameters but {} were given",
                expected,
                parameters.len()
            )));
        }
        let log_weights = weights_to_log(&parameters[..n])?;
        let mut edist = self.edist.clone();
        let mut offset = n;
        for (d, size) in edist.iter_mut().zip(sizes) {
            d.set_parameters(&parameters[offset..offset + size])?;
            offset += size;
        }
        self.log_weights = log_weights;
        self.edist = edist;
        Ok(())
    }
    fn clone_box(&self) -> Box<dyn ScalarPdf> {
        Box::new(self.clone())
    }
    fn to_config(&self) -> Result<Config> {
        self.export_config()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MixtureParameters {
    #[serde(rename = "LogWeights", with = "neg_inf_as_null")]
    log_weights: Vec<f64>,
}

impl ConfigExport for Mixture {
    fn export_config(&self) -> Result<Config> {
        let parameters = MixtureParameters {
            log_weights: self.log_weights.iter().map(|w| w.to_log_value()).collect(),
        };
        Config::new(NAME, &parameters, export_distributions(&self.edist)?)
    }
    fn import_config(config: &Config) -> Result<Self> {
        config.expect_name(NAME)?;
        let ps: MixtureParameters = config.parameters_as()?;
        let edist = import_distributions(&config.distributions)?;
        let log_weights = ps.log_weights.into_iter().map(Prob::from_log_prob).collect();
        Mixture::from_log_weights(log_weights, edist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Categorical, Normal};
    use crate::hmm::Hmm;
    use crate::prob::{lp, p};

    fn mixture() -> Mixture {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Normal::new(-2.0, 1.0).unwrap()),
            Box::new(Normal::new(3.0, 0.5).unwrap()),
        ];
        Mixture::new(&[1.0, 3.0], edist).unwrap()
    }

    #[test]
    fn weights_are_normalized() {
        let m = mixture();
        assert_abs_diff_eq!(m.log_weights()[0], p(0.25), epsilon = 1e-12);
        assert_abs_diff_eq!(m.log_weights()[1], p(0.75), epsilon = 1e-12);
    }

    #[test]
    fn invalid_weights() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Normal::new(0.0, 1.0).unwrap()),
            Box::new(Normal::new(1.0, 1.0).unwrap()),
        ];
        assert!(matches!(
            Mixture::new(&[0.5, -0.1], edist.clone()),
            Err(HmmError::NegativeWeight { index: 1, .. })
        ));
        assert!(Mixture::new(&[0.0, 0.0], edist.clone()).is_err());
        assert!(matches!(
            Mixture::new(&[1.0], edist),
            Err(HmmError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn density_and_posterior() {
        let m = mixture();
        let x = 0.4;
        let expected = 0.25 * Normal::new(-2.0, 1.0).unwrap().log_pdf(x).to_value()
            + 0.75 * Normal::new(3.0, 0.5).unwrap().log_pdf(x).to_value();
        assert_abs_diff_eq!(m.log_pdf(x), p(expected), epsilon = 1e-12);
        let r = m.posterior(x).unwrap();
        let s: Prob = r.iter().sum();
        assert_abs_diff_eq!(s, Prob::one(), epsilon = 1e-12);
        assert_eq!(m.classify(-1.0).unwrap(), 0);
        assert_eq!(m.classify(2.5).unwrap(), 1);
        let q = m.posterior_of(x, &[0, 1]).unwrap();
        assert_abs_diff_eq!(q, Prob::one(), epsilon = 1e-12);
        assert!(m.posterior_of(x, &[2]).is_err());
    }

    #[test]
    fn zero_observation() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Categorical::new(&[1.0, 0.0]).unwrap()),
            Box::new(Categorical::new(&[1.0, 0.0]).unwrap()),
        ];
        let m = Mixture::new(&[0.5, 0.5], edist).unwrap();
        assert!(matches!(m.posterior(1.0), Err(HmmError::ZeroObservation(_))));
    }

    #[test]
    fn parameters_roundtrip() {
        let m = mixture();
        let mut m2 = m.clone();
        m2.set_parameters(&[0.5, 0.5, 0.0, 1.0, 1.0, 2.0]).unwrap();
        assert_abs_diff_eq!(m2.log_weights()[0], p(0.5), epsilon = 1e-12);
        assert_eq!(m2.edist()[1].parameters(), vec![1.0, 2.0]);
        assert!(m2.set_parameters(&[1.0]).is_err());

        let c = m.export_config().unwrap();
        let m3 = Mixture::import_config(&Config::from_json_str(&c.to_json_string().unwrap()).unwrap())
            .unwrap();
        for (a, b) in m.parameters().iter().zip(m3.parameters().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn tiny_log_weight_survives_config() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Normal::new(0.0, 1.0).unwrap()),
            Box::new(Normal::new(4.0, 1.0).unwrap()),
            Box::new(Normal::new(8.0, 1.0).unwrap()),
        ];
        let m = Mixture::from_log_weights(vec![Prob::one(), lp(-900.0), Prob::zero()], edist).unwrap();
        let json = m.export_config().unwrap().to_json_string().unwrap();
        assert!(json.contains("\"LogWeights\""));
        let m2 = Mixture::import_config(&Config::from_json_str(&json).unwrap()).unwrap();
        assert_eq!(m2.log_weights()[1].to_log_value(), -900.0);
        assert!(m2.log_weights()[2].is_zero());
        assert_eq!(m2.edist()[2].parameters(), vec![8.0, 1.0]);
    }

    #[test]
    fn from_log_weights_normalizes() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Normal::new(0.0, 1.0).unwrap()),
            Box::new(Normal::new(1.0, 1.0).unwrap()),
        ];
        let m = Mixture::from_log_weights(vec![p(1.0), p(3.0)], edist.clone()).unwrap();
        assert_abs_diff_eq!(m.log_weights()[1], p(0.75), epsilon = 1e-12);
        assert!(Mixture::from_log_weights(vec![Prob::zero(), Prob::zero()], edist.clone()).is_err());
        assert!(matches!(
            Mixture::from_log_weights(vec![Prob::one()], edist),
            Err(HmmError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn mixture_emission_in_hmm_config() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(mixture()),
            Box::new(Normal::new(10.0, 2.0).unwrap()),
        ];
        let h = Hmm::from_probs(&[0.5, 0.5], &[0.9, 0.1, 0.2, 0.8], None, edist).unwrap();
        let c = h.export_config().unwrap();
        assert_eq!(c.distributions[0].name, NAME);
        assert_eq!(c.distributions[0].distributions.len(), 2);

        let h2 = Hmm::import_config(&Config::from_json_str(&c.to_json_string().unwrap()).unwrap())
            .unwrap();
        assert_eq!(h2.edist()[0].name(), NAME);
        let (a, b) = (h.parameters(), h2.parameters());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
        let x = [0.3, -1.0, 9.5, 3.1];
        assert_abs_diff_eq!(h.log_pdf(&x), h2.log_pdf(&x), epsilon = 1e-10);
    }
}
