//!
//! Genomic tracks: named sequences (chromosomes) of fixed-size bins
//!
//! Missing bins are `NaN` in memory and `null` in JSON.
//!
use crate::error::{HmmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

///
/// Read access to a binned track.
///
pub trait Track {
    fn seq_names(&self) -> Vec<String>;
    fn sequence(&self, name: &str) -> Result<&[f64]>;
    ///
    /// bin width in base pairs
    fn bin_size(&self) -> usize;
    fn n_bins(&self, name: &str) -> Result<usize> {
        Ok(self.sequence(name)?.len())
    }
    fn at_bin(&self, name: &str, bin: usize) -> Result<f64> {
        let seq = self.sequence(name)?;
        seq.get(bin).copied().ok_or_else(|| {
            HmmError::DimensionMismatch(format!(
                "bin {} of `{}` which has {} bins",
                bin,
                name,
                seq.len()
            ))
        })
    }
}

///
/// In-memory track with JSON (de)serialization.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTrack {
    pub name: String,
    pub bin_size: usize,
    #[serde(with = "nan_as_null")]
    sequences: BTreeMap<String, Vec<f64>>,
}

impl SimpleTrack {
    pub fn new(name: &str, bin_size: usize) -> Self {
        SimpleTrack {
            name: name.to_owned(),
            bin_size,
            sequences: BTreeMap::new(),
        }
    }
    ///
    /// Track with the sequences and lengths of `other`, all bins missing.
    ///
    pub fn with_shape_of<T: Track + ?Sized>(name: &str, other: &T) -> Result<Self> {
        let mut track = SimpleTrack::new(name, other.bin_size());
        for seq_name in other.seq_names() {
            let n = other.n_bins(&seq_name)?;
            track.insert(&seq_name, vec![f64::NAN; n]);
        }
        Ok(track)
    }
    pub fn insert(&mut self, name: &str, bins: Vec<f64>) {
        self.sequences.insert(name.to_owned(), bins);
    }
    pub fn sequence_mut(&mut self, name: &str) -> Result<&mut Vec<f64>> {
        self.sequences
            .get_mut(name)
            .ok_or_else(|| HmmError::UnknownSequence(name.to_owned()))
    }
    pub fn set_bin(&mut self, name: &str, bin: usize, value: f64) -> Result<()> {
        let seq = self.sequence_mut(name)?;
        let n = seq.len();
        match seq.get_mut(bin) {
            Some(x) => {
                *x = value;
                Ok(())
            }
            None => Err(HmmError::DimensionMismatch(format!(
                "bin {} of `{}` which has {} bins",
                bin, name, n
            ))),
        }
    }
    pub fn to_json_writer<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
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
        SimpleTrack::from_json_reader(BufReader::new(file))
    }
}

impl Track for SimpleTrack {
    fn seq_names(&self) -> Vec<String> {
        self.sequences.keys().cloned().collect()
    }
    fn sequence(&self, name: &str) -> Result<&[f64]> {
        self.sequences
            .get(name)
            .map(|s| s.as_slice())
            .ok_or_else(|| HmmError::UnknownSequence(name.to_owned()))
    }
    fn bin_size(&self) -> usize {
        self.bin_size
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        sequences: &BTreeMap<String, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let m: BTreeMap<&String, Vec<Option<f64>>> = sequences
            .iter()
            .map(|(k, v)| (k, v.iter().map(|&x| Some(x).filter(|x| !x.is_nan())).collect()))
            .collect();
        m.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<f64>>, D::Error> {
        let m: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::deserialize(deserializer)?;
        Ok(m.into_iter()
            .map(|(k, v)| (k, v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
            .collect())
    }
}
