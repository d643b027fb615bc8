pub mod batch;
pub mod config;
pub mod data;
pub mod distribution;
pub mod em;
pub mod error;
pub mod estimator;
pub mod hmm;
pub mod mixture;
pub mod pool;
pub mod prelude;
pub mod prob;
pub mod track;

#[macro_use]
extern crate approx;
