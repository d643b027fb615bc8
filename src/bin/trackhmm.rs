use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::ops::ControlFlow;
use std::path::PathBuf;
use trackhmm::batch::{
    classify_track, posterior_track, segment_track, track_summary, train_on_tracks,
    LikelihoodClassifier, PosteriorClassifier,
};
use trackhmm::config::{Config, ConfigExport};
use trackhmm::em::{EmConfig, EmModel};
use trackhmm::error::Result;
use trackhmm::estimator::estimators_for;
use trackhmm::hmm::Hmm;
use trackhmm::mixture::Mixture;
use trackhmm::pool::ThreadPool;
use trackhmm::track::SimpleTrack;

#[derive(Parser, Debug)]
#[clap(author, about, version)]
struct Opts {
    /// Number of worker threads
    #[clap(short = 't', long, default_value_t = 1)]
    threads: usize,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train an HMM on tracks with Baum-Welch
    TrainHmm {
        /// Initial model (json)
        #[clap(short, long)]
        model: PathBuf,
        /// Output model filename
        #[clap(short, long)]
        output: PathBuf,
        /// Stop when the log likelihood changes less than this
        #[clap(short, long, default_value_t = 1e-8)]
        epsilon: f64,
        /// Maximal number of EM steps
        #[clap(short = 'n', long)]
        max_steps: Option<usize>,
        /// Input track filenames
        tracks: Vec<PathBuf>,
    },
    /// Train a mixture on tracks with EM
    TrainMixture {
        /// Initial model (json)
        #[clap(short, long)]
        model: PathBuf,
        /// Output model filename
        #[clap(short, long)]
        output: PathBuf,
        /// Stop when the log likelihood changes less than this
        #[clap(short, long, default_value_t = 1e-8)]
        epsilon: f64,
        /// Maximal number of EM steps
        #[clap(short = 'n', long)]
        max_steps: Option<usize>,
        /// Input track filenames
        tracks: Vec<PathBuf>,
    },
    /// Viterbi segmentation of a track
    Segment {
        #[clap(short, long)]
        model: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        track: PathBuf,
    },
    /// Posterior probability of a set of HMM states for every bin
    Posterior {
        #[clap(short, long)]
        model: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        /// Comma separated state indices
        #[clap(short, long, value_delimiter = ',')]
        states: Vec<usize>,
        track: PathBuf,
    },
    /// Log posterior of a set of mixture components for every bin
    Classify {
        #[clap(short, long)]
        model: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        /// Comma separated component indices
        #[clap(short, long, value_delimiter = ',')]
        components: Vec<usize>,
        track: PathBuf,
    },
    /// Log likelihood of every window of bins under an HMM
    Scan {
        #[clap(short, long)]
        model: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        /// Window size in bins
        #[clap(short, long)]
        window: usize,
        track: PathBuf,
    },
    /// Statistics of the bins of a track
    Summary { track: PathBuf },
}

fn load_tracks(paths: &[PathBuf]) -> Result<Vec<SimpleTrack>> {
    paths.iter().map(SimpleTrack::from_json_file).collect()
}

fn train<M: EmModel + ConfigExport>(
    model: &PathBuf,
    output: &PathBuf,
    epsilon: f64,
    max_steps: Option<usize>,
    tracks: &[PathBuf],
    pool: &ThreadPool,
) -> Result<()> {
    let init = M::import_config(&Config::from_json_file(model)?)?;
    println!(
        "# tracks={}",
        tracks.iter().map(|p| p.display()).join(",")
    );
    let tracks = load_tracks(tracks)?;
    let mut estimators = estimators_for(init.edist())?;
    let config = EmConfig {
        epsilon,
        max_steps,
    };
    let mut hook = |_: &M, step: usize, ll: f64, delta: f64| -> ControlFlow<()> {
        println!("{}\t{}\t{}\t{}", chrono::Local::now(), step, ll, delta);
        ControlFlow::Continue(())
    };
    let r = train_on_tracks(&init, &mut estimators, &tracks, &config, pool, &mut hook)?;
    println!(
        "# n_steps={} converged={} ll={}",
        r.n_steps, r.converged, r.log_likelihood
    );
    r.model.export_config()?.to_json_file(output)
}

fn run(opts: &Opts) -> Result<()> {
    let pool = ThreadPool::new(opts.threads)?;
    match &opts.command {
        Commands::TrainHmm {
            model,
            output,
            epsilon,
            max_steps,
            tracks,
        } => train::<Hmm>(model, output, *epsilon, *max_steps, tracks, &pool),
        Commands::TrainMixture {
            model,
            output,
            epsilon,
            max_steps,
            tracks,
        } => train::<Mixture>(model, output, *epsilon, *max_steps, tracks, &pool),
        Commands::Segment {
            model,
            output,
            track,
        } => {
            let hmm = Hmm::import_config(&Config::from_json_file(model)?)?;
            let track = SimpleTrack::from_json_file(track)?;
            segment_track(&hmm, &track, &pool)?.to_json_file(output)
        }
        Commands::Posterior {
            model,
            output,
            states,
            track,
        } => {
            let hmm = Hmm::import_config(&Config::from_json_file(model)?)?;
            let track = SimpleTrack::from_json_file(track)?;
            posterior_track(&hmm, &track, states, &pool)?.to_json_file(output)
        }
        Commands::Classify {
            model,
            output,
            components,
            track,
        } => {
            let mixture = Mixture::import_config(&Config::from_json_file(model)?)?;
            let classifier = PosteriorClassifier::new(mixture, components.clone())?;
            let track = SimpleTrack::from_json_file(track)?;
            classify_track(&classifier, &track, &pool)?.to_json_file(output)
        }
        Commands::Scan {
            model,
            output,
            window,
            track,
        } => {
            let hmm = Hmm::import_config(&Config::from_json_file(model)?)?;
            let classifier = LikelihoodClassifier::new(hmm, *window);
            let track = SimpleTrack::from_json_file(track)?;
            classify_track(&classifier, &track, &pool)?.to_json_file(output)
        }
        Commands::Summary { track } => {
            let track = SimpleTrack::from_json_file(track)?;
            let summary = track_summary(&track, &pool)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();
    let opts: Opts = Opts::parse();
    println!("# started_at={}", chrono::Local::now());
    println!("# opts={:?}", opts);
    if let Err(e) = run(&opts) {
        log::error!("{}", e);
        std::process::exit(1);
    }
    println!("# finished_at={}", chrono::Local::now());
}
