//!
//! globally-available parts
//!
pub use crate::config::{Config, ConfigExport};
pub use crate::data::{DataRecord, ObservationSet};
pub use crate::distribution::{new_distribution, ScalarPdf};
pub use crate::em::{EmConfig, EmModel, EmResult};
pub use crate::error::{HmmError, Result};
pub use crate::estimator::{estimator_for, estimators_for, Estimator};
pub use crate::hmm::{CoreHmm, Hmm};
pub use crate::mixture::Mixture;
pub use crate::pool::ThreadPool;
pub use crate::prob::{lp, p, Prob};
pub use crate::track::{SimpleTrack, Track};
