//!
//! Whole-track drivers
//!
//! * `classify_track`: sliding-window classification, parallel over windows
//! * `segment_track`/`posterior_track`: Viterbi states or posterior marginals
//!   per bin, parallel over sequences
//! * `estimate_on_track`/`track_summary`: fitting and statistics on all bins
//! * `train_on_tracks`: EM training of an HMM or mixture on tracks
//!
//! Missing (non-finite) bins split a sequence into independent runs and are
//! missing in every output track.
//!
use crate::data::ObservationSet;
use crate::distribution::ScalarPdf;
use crate::em::{self, EmConfig, EmHook, EmModel, EmResult};
use crate::error::{HmmError, Result};
use crate::estimator::{Accumulators, Estimator, Moments, Statistics};
use crate::hmm::Hmm;
use crate::mixture::Mixture;
use crate::pool::ThreadPool;
use crate::track::{SimpleTrack, Track};
use derive_new::new;
use log::{debug, info};
use serde::Serialize;
use std::ops::Range;

///
/// Maximal runs of finite values.
///
pub fn finite_runs(xs: &[f64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, x) in xs.iter().enumerate() {
        match (x.is_finite(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..xs.len());
    }
    runs
}

//
// window classification
//

///
/// Maps a window of bins to a value. Every worker owns a clone.
///
pub trait WindowClassifier: Clone + Send {
    fn window_size(&self) -> usize;
    fn classify(&mut self, window: &[f64]) -> Result<f64>;
}

///
/// Log posterior probability that a single bin comes from one of `components`.
///
#[derive(Debug, Clone)]
pub struct PosteriorClassifier {
    mixture: Mixture,
    components: Vec<usize>,
}

impl PosteriorClassifier {
    pub fn new(mixture: Mixture, components: Vec<usize>) -> Result<Self> {
        let n_states = mixture.n_components();
        if let Some(&state) = components.iter().find(|&&c| c >= n_states) {
            return Err(HmmError::InvalidState { state, n_states });
        }
        Ok(PosteriorClassifier {
            mixture,
            components,
        })
    }
}

impl WindowClassifier for PosteriorClassifier {
    fn window_size(&self) -> usize {
        1
    }
    fn classify(&mut self, window: &[f64]) -> Result<f64> {
        Ok(self
            .mixture
            .posterior_of(window[0], &self.components)?
            .to_log_value())
    }
}

///
/// Log likelihood of a window under an HMM.
///
#[derive(Debug, Clone, new)]
pub struct LikelihoodClassifier {
    hmm: Hmm,
    window_size: usize,
}

impl WindowClassifier for LikelihoodClassifier {
    fn window_size(&self) -> usize {
        self.window_size
    }
    fn classify(&mut self, window: &[f64]) -> Result<f64> {
        Ok(self.hmm.log_pdf(window).to_log_value())
    }
}

///
/// Classify every window `[i, i + w)` of every sequence and store the result
/// at bin `i + w / 2`. Windows with missing bins are skipped.
///
pub fn classify_track<C, T>(classifier: &C, track: &T, pool: &ThreadPool) -> Result<SimpleTrack>
where
    C: WindowClassifier,
    T: Track + ?Sized,
{
    let w = classifier.window_size();
    if w == 0 {
        return Err(HmmError::InvalidParameter("window size must be positive".to_owned()));
    }
    let mut out = SimpleTrack::with_shape_of("classification", track)?;
    for name in track.seq_names() {
        let seq = track.sequence(&name)?;
        if seq.len() < w {
            continue;
        }
        let n_windows = seq.len() - w + 1;
        let mut slots: Vec<(C, Vec<(usize, f64)>)> = (0..pool.n_threads())
            .map(|_| (classifier.clone(), Vec::new()))
            .collect();
        pool.run_chunked(n_windows, &mut slots, |_, (c, results), range| {
            results.clear();
            for i in range {
                let window = &seq[i..i + w];
                if window.iter().all(|x| x.is_finite()) {
                    results.push((i + w / 2, c.classify(window)?));
                }
            }
            Ok(())
        })?;
        let bins = out.sequence_mut(&name)?;
        for (_, results) in slots {
            for (i, v) in results {
                bins[i] = v;
            }
        }
        debug!("classified {} windows of {}", n_windows, name);
    }
    Ok(out)
}

//
// decoding
//

///
/// Apply `f` to every finite run of every sequence in parallel and assemble
/// the per-bin outputs.
///
fn map_runs<T, F>(track: &T, name: &str, pool: &ThreadPool, f: F) -> Result<SimpleTrack>
where
    T: Track + ?Sized,
    F: Fn(&[f64]) -> Result<Vec<f64>> + Sync + Send,
{
    let names = track.seq_names();
    let seqs: Vec<&[f64]> = names
        .iter()
        .map(|n| track.sequence(n))
        .collect::<Result<Vec<&[f64]>>>()?;
    let outputs = pool.run_jobs(names.len(), |i| {
        let seq = seqs[i];
        let mut bins = vec![f64::NAN; seq.len()];
        for run in finite_runs(seq) {
            let ys = f(&seq[run.clone()])?;
            bins[run].copy_from_slice(&ys);
        }
        Ok(bins)
    })?;
    let mut out = SimpleTrack::new(name, track.bin_size());
    for (seq_name, bins) in names.iter().zip(outputs) {
        out.insert(seq_name, bins);
    }
    Ok(out)
}

///
/// Viterbi state of every bin.
///
pub fn segment_track<T: Track + ?Sized>(hmm: &Hmm, track: &T, pool: &ThreadPool) -> Result<SimpleTrack> {
    info!("segmenting {} sequences", track.seq_names().len());
    map_runs(track, "segmentation", pool, |xs| {
        let (path, _) = hmm.viterbi(xs)?;
        Ok(path.into_iter().map(|s| s as f64).collect())
    })
}

///
/// Posterior probability of every bin to be in one of `states`.
///
pub fn posterior_track<T: Track + ?Sized>(
    hmm: &Hmm,
    track: &T,
    states: &[usize],
    pool: &ThreadPool,
) -> Result<SimpleTrack> {
    let n_states = hmm.n_states();
    if let Some(&state) = states.iter().find(|&&s| s >= n_states) {
        return Err(HmmError::InvalidState { state, n_states });
    }
    map_runs(track, "posterior", pool, |xs| {
        let gamma = hmm.posterior_marginals(xs)?;
        Ok((0..xs.len())
            .map(|k| states.iter().map(|&s| gamma[[s, k]].to_value()).sum::<f64>())
            .collect())
    })
}

//
// estimation
//

///
/// All finite bins of all sequences.
///
fn finite_values<T: Track + ?Sized>(track: &T) -> Result<Vec<f64>> {
    let mut xs: Vec<f64> = Vec::new();
    for name in track.seq_names() {
        xs.extend(track.sequence(&name)?.iter().filter(|x| x.is_finite()));
    }
    Ok(xs)
}

///
/// Fit a distribution to all finite bins of a track.
///
pub fn estimate_on_track<T: Track + ?Sized>(
    estimator: &mut dyn Estimator,
    track: &T,
    pool: &ThreadPool,
) -> Result<Box<dyn ScalarPdf>> {
    let xs = finite_values(track)?;
    estimator.estimate_on_data(&xs, None, pool)
}

///
/// Statistics of the finite bins of a track.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSummary {
    pub n: usize,
    pub n_missing: usize,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
struct SummaryStats {
    moments: Moments,
    min: f64,
    max: f64,
}

impl Default for SummaryStats {
    fn default() -> Self {
        SummaryStats {
            moments: Moments::default(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Statistics for SummaryStats {
    fn add(&mut self, x: f64, weight: f64) -> Result<()> {
        self.moments.add(x, weight)?;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        Ok(())
    }
    fn merge(&mut self, other: &Self) {
        self.moments.merge(&other.moments);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

pub fn track_summary<T: Track + ?Sized>(track: &T, pool: &ThreadPool) -> Result<TrackSummary> {
    let xs = finite_values(track)?;
    let mut n_total = 0;
    for name in track.seq_names() {
        n_total += track.n_bins(&name)?;
    }
    let mut acc = Accumulators::new(SummaryStats::default());
    acc.add_all(&xs, None, pool)?;
    let s = acc.merged();
    let n = xs.len();
    let (mean, variance) = if n == 0 {
        (f64::NAN, f64::NAN)
    } else {
        (s.moments.mean(), s.moments.variance())
    };
    Ok(TrackSummary {
        n,
        n_missing: n_total - n,
        mean,
        variance,
        min: s.min,
        max: s.max,
    })
}

//
// training
//

///
/// Every finite run of every sequence of every track as one observation
/// sequence.
///
pub fn observations_from_tracks<T: Track>(tracks: &[T]) -> Result<ObservationSet> {
    let mut seqs: Vec<&[f64]> = Vec::new();
    for track in tracks.iter() {
        for name in track.seq_names() {
            let seq = track.sequence(&name)?;
            seqs.extend(finite_runs(seq).into_iter().map(|r| &seq[r]));
        }
    }
    Ok(ObservationSet::new(&seqs))
}

///
/// Train `model` (an `Hmm` or a `Mixture`) on tracks with `em::run`.
///
pub fn train_on_tracks<M, T, H>(
    model: &M,
    estimators: &mut [Box<dyn Estimator>],
    tracks: &[T],
    config: &EmConfig,
    pool: &ThreadPool,
    hook: &mut H,
) -> Result<EmResult<M>>
where
    M: EmModel,
    T: Track,
    H: EmHook<M>,
{
    let data = observations_from_tracks(tracks)?;
    info!(
        "training on {} sequences ({} bins, {} distinct values)",
        data.n_sequences(),
        data.n_observations(),
        data.n_unique()
    );
    em::run(model, &data, estimators, config, pool, hook)
}
