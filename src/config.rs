//!
//! Model (de)serialization as a named, parameterized tree
//!
//! ```text
//! {
//!   "Name": "matrix:hmm distribution",
//!   "Parameters": { "Pi": [...], "Tr": [...], "StateMap": [...], "N": 2 },
//!   "Distributions": [
//!     { "Name": "scalar:categorical distribution", "Parameters": [0.1, 0.9], "Distributions": [] },
//!     ...
//!   ]
//! }
//! ```
//!
use crate::distribution::{new_distribution, ScalarPdf};
use crate::error::{HmmError, Result};
use crate::mixture::{self, Mixture};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

///
/// Node of an exported model.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Parameters", default)]
    pub parameters: serde_json::Value,
    #[serde(rename = "Distributions", default)]
    pub distributions: Vec<Config>,
}

impl Config {
    pub fn new<T: Serialize>(name: &str, parameters: &T, distributions: Vec<Config>) -> Result<Self> {
        Ok(Config {
            name: name.to_owned(),
            parameters: serde_json::to_value(parameters)?,
            distributions,
        })
    }
    ///
    /// Deserialize `Parameters` into a concrete type.
    ///
    pub fn parameters_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.parameters.clone()).map_err(|e| {
            HmmError::Config(format!("parameters of `{}` are malformed: {}", self.name, e))
        })
    }
    ///
    /// Fail unless the node has the expected name.
    ///
    pub fn expect_name(&self, name: &str) -> Result<()> {
        if self.name == name {
            Ok(())
        } else {
            Err(HmmError::Config(format!(
                "expected `{}` but found `{}`",
                name, self.name
            )))
        }
    }
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
    pub fn to_json_writer<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_json_writer(BufWriter::new(file))
    }
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Config::from_json_reader(BufReader::new(file))
    }
}

///
/// Conversion of a model from/to a `Config` tree.
///
pub trait ConfigExport: Sized {
    fn export_config(&self) -> Result<Config>;
    fn import_config(config: &Config) -> Result<Self>;
}

impl ConfigExport for Box<dyn ScalarPdf> {
    fn export_config(&self) -> Result<Config> {
        (**self).to_config()
    }
    ///
    /// Mixtures are rebuilt with their children; every other family from its
    /// flat parameter vector through the registry.
    ///
    fn import_config(config: &Config) -> Result<Self> {
        if config.name == mixture::NAME {
            return Ok(Box::new(Mixture::import_config(config)?));
        }
        let parameters: Vec<f64> = config.parameters_as()?;
        new_distribution(&config.name, &parameters)
    }
}

///
/// Export a list of distributions as child nodes.
///
pub fn export_distributions(edist: &[Box<dyn ScalarPdf>]) -> Result<Vec<Config>> {
    edist.iter().map(|d| d.export_config()).collect()
}

///
/// Import every child node as a distribution.
///
pub fn import_distributions(configs: &[Config]) -> Result<Vec<Box<dyn ScalarPdf>>> {
    configs.iter().map(<Box<dyn ScalarPdf>>::import_config).collect()
}

///
/// Log probabilities as JSON numbers, with `null` for log zero (`-inf`).
///
pub mod neg_inf_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let v: Vec<Option<f64>> = values
            .iter()
            .map(|&x| Some(x).filter(|x| *x != f64::NEG_INFINITY))
            .collect();
        v.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let v: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(v.into_iter().map(|x| x.unwrap_or(f64::NEG_INFINITY)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Categorical, Normal};

    #[test]
    fn distribution_config_roundtrip() {
        let d: Box<dyn ScalarPdf> = Box::new(Normal::new(-1.5, 0.25).unwrap());
        let c = d.export_config().unwrap();
        assert_eq!(c.name, "scalar:normal distribution");
        let json = c.to_json_string().unwrap();
        assert!(json.contains("\"Name\""));
        assert!(json.contains("\"Parameters\""));
        assert!(json.contains("\"Distributions\""));
        let c2 = Config::from_json_str(&json).unwrap();
        let d2 = <Box<dyn ScalarPdf>>::import_config(&c2).unwrap();
        assert_eq!(d.parameters(), d2.parameters());
    }

    #[test]
    fn distributions_file_roundtrip() {
        let edist: Vec<Box<dyn ScalarPdf>> = vec![
            Box::new(Categorical::new(&[0.1, 0.9]).unwrap()),
            Box::new(Categorical::new(&[0.7, 0.3]).unwrap()),
        ];
        let children = export_distributions(&edist).unwrap();
        let root = Config::new("test", &Vec::<f64>::new(), children).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dists.json");
        root.to_json_file(&path).unwrap();
        let loaded = Config::from_json_file(&path).unwrap();
        assert_eq!(loaded, root);
        let edist2 = import_distributions(&loaded.distributions).unwrap();
        for (a, b) in edist.iter().zip(edist2.iter()) {
            for (x, y) in a.parameters().iter().zip(b.parameters().iter()) {
                assert_abs_diff_eq!(x, y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn malformed_config() {
        let c = Config::from_json_str(r#"{"Name": "scalar:normal distribution", "Parameters": "x"}"#)
            .unwrap();
        assert!(matches!(
            <Box<dyn ScalarPdf>>::import_config(&c),
            Err(HmmError::Config(_))
        ));
        assert!(Config::from_json_str("{").is_err());
        assert!(c.expect_name("scalar:poisson distribution").is_err());
    }
}
