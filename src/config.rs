use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{EpochErr, Result};

/// The hyperparameters of a single softmax regression epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EpochConfig {
    /// The SGD step size.
    pub learning_rate: f32,
    /// The mini-batch size, also the divisor of every step, ragged tail included.
    pub batch_size: NonZeroUsize,
    /// Subtract the row maximum before exponentiating the logits.
    #[serde(default)]
    pub stabilize: bool,
}

impl EpochConfig {
    /// Creates a new unstabilized `EpochConfig`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on each batch.
    /// * `batch_size` - The amount of examples per batch.
    ///
    /// # Returns
    /// A new validated `EpochConfig` or an error if a hyperparameter is invalid.
    pub fn new(learning_rate: f32, batch_size: usize) -> Result<Self> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or(EpochErr::InvalidShape {
            what: "batch size",
            got: 0,
            expected: 1,
        })?;

        let config = Self {
            learning_rate,
            batch_size,
            stabilize: false,
        };

        config.validate()?;
        Ok(config)
    }

    /// Returns the same config with the softmax stabilization flag set to `stabilize`.
    pub fn with_stabilize(mut self, stabilize: bool) -> Self {
        self.stabilize = stabilize;
        self
    }

    /// Parses and validates a config from its JSON representation.
    ///
    /// # Arguments
    /// * `json` - e.g. `{"learning_rate": 0.1, "batch_size": 4, "stabilize": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EpochErr::InvalidConfig(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the hyperparameters that the type system does not.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(EpochErr::InvalidInput(
                "the learning rate must be finite and positive",
            ));
        }

        Ok(())
    }
}
