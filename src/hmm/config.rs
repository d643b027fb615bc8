//!
//! `Hmm` as a `Config` tree
//!
//! Initial and transition probabilities are written as log probabilities,
//! `Tr` in row-major order, with `null` for log zero. Emission distributions
//! are the children.
//!
use super::model::Hmm;
use crate::config::{
    export_distributions, import_distributions, neg_inf_as_null, Config, ConfigExport,
};
use crate::error::{HmmError, Result};
use crate::prob::Prob;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "matrix:hmm distribution";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HmmParameters {
    #[serde(rename = "Pi", with = "neg_inf_as_null")]
    pi: Vec<f64>,
    #[serde(rename = "Tr", with = "neg_inf_as_null")]
    tr: Vec<f64>,
    #[serde(rename = "StateMap")]
    state_map: Vec<usize>,
    #[serde(rename = "N")]
    n: usize,
    #[serde(rename = "StartStates", default, skip_serializing_if = "Option::is_none")]
    start_states: Option<Vec<usize>>,
    #[serde(rename = "FinalStates", default, skip_serializing_if = "Option::is_none")]
    final_states: Option<Vec<usize>>,
}

impl ConfigExport for Hmm {
    fn export_config(&self) -> Result<Config> {
        let core = self.core();
        let parameters = HmmParameters {
            pi: core.pi().iter().map(|x| x.to_log_value()).collect(),
            tr: core.tr().iter().map(|x| x.to_log_value()).collect(),
            state_map: core.state_map().to_vec(),
            n: core.n_states(),
            start_states: core.start_states().map(|s| s.to_vec()),
            final_states: core.final_states().map(|s| s.to_vec()),
        };
        Config::new(NAME, &parameters, export_distributions(self.edist())?)
    }
    fn import_config(config: &Config) -> Result<Self> {
        config.expect_name(NAME)?;
        let ps: HmmParameters = config.parameters_as()?;
        if ps.pi.len() != ps.n || ps.tr.len() != ps.n * ps.n {
            return Err(HmmError::Config(format!(
                "N={} but Pi has {} and Tr has {} elements",
                ps.n,
                ps.pi.len(),
                ps.tr.len()
            )));
        }
        let pi = ps.pi.iter().map(|&x| Prob::from_log_prob(x)).collect();
        let tr: Vec<Prob> = ps.tr.iter().map(|&x| Prob::from_log_prob(x)).collect();
        let tr = Array2::from_shape_vec((ps.n, ps.n), tr).map_err(|e| HmmError::Config(e.to_string()))?;
        let edist = import_distributions(&config.distributions)?;
        let mut hmm = Hmm::new(pi, tr, Some(ps.state_map), edist)?;
        if let Some(states) = ps.start_states {
            hmm.set_start_states(&states)?;
        }
        if let Some(states) = ps.final_states {
            hmm.set_final_states(&states)?;
        }
        Ok(hmm)
    }
}
