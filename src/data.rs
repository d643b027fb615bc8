//!
//! Observation data seen by the models
//!
//! The dynamic programming code never touches raw observations. It asks a
//! `DataRecord` for `log p(x[k] | class c)`, so the same forward/backward code
//! runs on
//!
//! * raw sequences (`RawRecord`),
//! * deduplicated observations with emissions evaluated once per unique value
//!   (`ObservationSet` + `EmissionTable` + `TableRecord`),
//! * precomputed emission matrices (`PrecomputedRecord`).
//!
use crate::distribution::ScalarPdf;
use crate::error::{HmmError, Result};
use crate::pool::ThreadPool;
use crate::prob::Prob;
use fnv::FnvHashMap;
use ndarray::Array2;

///
/// One observation sequence of length `len()`.
///
pub trait DataRecord {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    ///
    /// index of the (deduplicated) observation at `position`
    fn map_index(&self, position: usize) -> usize;
    ///
    /// log emission probability of the observation at `position` by
    /// emission class `class`
    fn log_pdf(&self, class: usize, position: usize) -> Prob;
}

//
// ObservationSet
//

///
/// Set of observation sequences whose values are merged into a list of unique
/// values, so that emissions are evaluated once per distinct value.
///
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    /// distinct values in first-seen order
    values: Vec<f64>,
    /// number of occurrences of each value
    counts: Vec<f64>,
    /// sequences as indices into `values`
    sequences: Vec<Vec<usize>>,
}

impl ObservationSet {
    pub fn new<S: AsRef<[f64]>>(sequences: &[S]) -> Self {
        let mut index: FnvHashMap<u64, usize> = FnvHashMap::default();
        let mut values = Vec::new();
        let mut counts = Vec::new();
        let sequences: Vec<Vec<usize>> = sequences
            .iter()
            .map(|seq| {
                seq.as_ref()
                    .iter()
                    .map(|&x| {
                        // merge -0.0 and 0.0
                        let x = if x == 0.0 { 0.0 } else { x };
                        let i = *index.entry(x.to_bits()).or_insert_with(|| {
                            values.push(x);
                            counts.push(0.0);
                            values.len() - 1
                        });
                        counts[i] += 1.0;
                        i
                    })
                    .collect::<Vec<usize>>()
            })
            .collect();
        ObservationSet {
            values,
            counts,
            sequences,
        }
    }
    pub fn n_sequences(&self) -> usize {
        self.sequences.len()
    }
    pub fn n_unique(&self) -> usize {
        self.values.len()
    }
    ///
    /// total number of observations in all sequences
    pub fn n_observations(&self) -> usize {
        self.sequences.iter().map(|s| s.len()).sum()
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }
    pub fn sequence(&self, i: usize) -> &[usize] {
        &self.sequences[i]
    }
    ///
    /// Record of the `i`-th sequence reading emissions from `table`.
    ///
    pub fn record<'a>(&'a self, table: &'a EmissionTable, i: usize) -> TableRecord<'a> {
        TableRecord {
            table,
            index: &self.sequences[i],
        }
    }
}

//
// EmissionTable
//

///
/// `log p(value_u | class c)` for every unique value `u` and class `c`.
///
#[derive(Debug, Clone)]
pub struct EmissionTable {
    /// shape `(n_unique, n_classes)`
    log_probs: Array2<Prob>,
}

impl EmissionTable {
    ///
    /// Evaluate all distributions on all values.
    ///
    /// Every worker evaluates its chunk of values with its own clone of the
    /// distributions. Fails with `ZeroObservation` if some value has zero
    /// probability under every class.
    ///
    pub fn evaluate(edist: &[Box<dyn ScalarPdf>], values: &[f64], pool: &ThreadPool) -> Result<Self> {
        let n_classes = edist.len();
        let n_unique = values.len();
        let mut slots: Vec<(Vec<Box<dyn ScalarPdf>>, Vec<Prob>)> = (0..pool.n_threads())
            .map(|_| (edist.to_vec(), Vec::new()))
            .collect();
        pool.run_chunked(n_unique, &mut slots, |_, (edist, buffer), range| {
            buffer.clear();
            for u in range {
                let x = values[u];
                let row_start = buffer.len();
                buffer.extend(edist.iter().map(|d| d.log_pdf(x)));
                if buffer[row_start..].iter().all(|p| p.is_zero()) {
                    return Err(HmmError::ZeroObservation(x));
                }
            }
            Ok(())
        })?;
        let buffer: Vec<Prob> = slots.into_iter().flat_map(|(_, buffer)| buffer).collect();
        let log_probs = Array2::from_shape_vec((n_unique, n_classes), buffer)
            .map_err(|e| HmmError::DimensionMismatch(e.to_string()))?;
        Ok(EmissionTable { log_probs })
    }
    pub fn n_classes(&self) -> usize {
        self.log_probs.ncols()
    }
    pub fn n_unique(&self) -> usize {
        self.log_probs.nrows()
    }
    #[inline]
    pub fn get(&self, class: usize, unique: usize) -> Prob {
        self.log_probs[[unique, class]]
    }
}

///
/// Sequence of an `ObservationSet` backed by an `EmissionTable`.
///
#[derive(Debug, Clone, Copy)]
pub struct TableRecord<'a> {
    table: &'a EmissionTable,
    index: &'a [usize],
}

impl<'a> DataRecord for TableRecord<'a> {
    fn len(&self) -> usize {
        self.index.len()
    }
    fn map_index(&self, position: usize) -> usize {
        self.index[position]
    }
    #[inline]
    fn log_pdf(&self, class: usize, position: usize) -> Prob {
        self.table.get(class, self.index[position])
    }
}

///
/// Raw sequence evaluated directly with the distributions.
///
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    edist: &'a [Box<dyn ScalarPdf>],
    data: &'a [f64],
}

impl<'a> RawRecord<'a> {
    pub fn new(edist: &'a [Box<dyn ScalarPdf>], data: &'a [f64]) -> Self {
        RawRecord { edist, data }
    }
}

impl<'a> DataRecord for RawRecord<'a> {
    fn len(&self) -> usize {
        self.data.len()
    }
    fn map_index(&self, position: usize) -> usize {
        position
    }
    fn log_pdf(&self, class: usize, position: usize) -> Prob {
        self.edist[class].log_pdf(self.data[position])
    }
}

///
/// Precomputed emission log probabilities of shape `(len, n_classes)`.
///
#[derive(Debug, Clone)]
pub struct PrecomputedRecord {
    log_probs: Array2<Prob>,
}

impl PrecomputedRecord {
    pub fn new(log_probs: Array2<Prob>) -> Self {
        PrecomputedRecord { log_probs }
    }
    pub fn n_classes(&self) -> usize {
        self.log_probs.ncols()
    }
}

impl DataRecord for PrecomputedRecord {
    fn len(&self) -> usize {
        self.log_probs.nrows()
    }
    fn map_index(&self, position: usize) -> usize {
        position
    }
    fn log_pdf(&self, class: usize, position: usize) -> Prob {
        self.log_probs[[position, class]]
    }
}
