pub mod config;
pub mod dataset;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod optimization;
pub mod raw;
mod test;
pub mod training;

pub use config::EpochConfig;
pub use dataset::Dataset;
pub use error::{EpochErr, Result};
pub use raw::softmax_regression_epoch;
pub use training::EpochTrainer;
