//!
//! Hidden Markov model with pluggable emission distributions
//!
//! ## Structure
//!
//! * `CoreHmm` (`base`): initial probabilities `Pi`, transition matrix `Tr`,
//!   final transition matrix `Tf` and the state to emission class map.
//! * `Hmm` (`model`): a `CoreHmm` plus one `ScalarPdf` per emission class.
//!
//! ## Algorithms
//!
//! * forward/backward and posterior marginals (`forward`)
//! * Viterbi decoding (`viterbi`)
//! * one Baum-Welch iteration as an `EmModel` (`baum_welch`)
//! * import/export as a `Config` tree (`config`)
//!
//! The last transition of a sequence (into position `N-1`) uses `Tf`, which is
//! `Tr` restricted to the final states. Every other transition uses `Tr`.
//!
pub mod base;
pub mod baum_welch;
pub mod config;
pub mod forward;
pub mod model;
pub mod viterbi;

pub use base::CoreHmm;
pub use baum_welch::BaumWelchTmp;
pub use model::Hmm;
