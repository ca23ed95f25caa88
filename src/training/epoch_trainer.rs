use log::{debug, trace};
use ndarray::{ArrayViewMut2, linalg};

use super::scratch::Scratch;
use crate::{
    EpochErr, Result, config::EpochConfig, dataset::Dataset, loss::SoftmaxCrossEntropy,
    optimization::GradientDescent,
};

/// Runs epochs of mini-batch SGD for multinomial logistic regression.
///
/// The trainer holds no state besides its configuration: the parameters are borrowed for the
/// duration of `run_epoch` and the scratch buffers live only inside it.
#[derive(Debug, Clone)]
pub struct EpochTrainer {
    config: EpochConfig,
    loss_fn: SoftmaxCrossEntropy,
    optimizer: GradientDescent,
}

impl EpochTrainer {
    /// Creates a new `EpochTrainer`.
    ///
    /// # Arguments
    /// * `config` - The epoch hyperparameters.
    ///
    /// # Returns
    /// A new `EpochTrainer` or an error if the config is invalid.
    pub fn new(config: EpochConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            loss_fn: SoftmaxCrossEntropy::new(config.stabilize),
            optimizer: GradientDescent::new(config.learning_rate, config.batch_size),
        })
    }

    pub fn config(&self) -> &EpochConfig {
        &self.config
    }

    /// Makes a single pass over `data` in index order, updating `theta` in place after every
    /// batch so that each batch sees the parameters left by the previous one.
    ///
    /// # Arguments
    /// * `data` - The examples and their labels.
    /// * `theta` - The `n x k` parameters.
    ///
    /// # Returns
    /// An error if `theta` is not `n x k` or the batch size exceeds the amount of examples.
    /// Both are checked before the first update, so on error `theta` is left untouched.
    pub fn run_epoch(&self, data: &Dataset<'_>, mut theta: ArrayViewMut2<f32>) -> Result<()> {
        data.check_params(theta.dim())?;

        let batch_size = self.config.batch_size;
        if batch_size.get() > data.len() {
            return Err(EpochErr::InvalidShape {
                what: "batch size",
                got: batch_size.get(),
                expected: data.len(),
            });
        }

        let batches = data.batches(batch_size);
        debug!(
            examples = data.len(),
            features = data.num_features(),
            classes = data.num_classes(),
            batches = batches.len(),
            batch_size = batch_size.get(),
            stabilize = self.config.stabilize;
            "running softmax regression epoch"
        );

        let mut scratch = Scratch::new(batch_size.get(), data.num_features(), data.num_classes());

        for batch in batches {
            trace!(start = batch.range.start, len = batch.len(); "processing batch");

            scratch.clear();
            scratch.encode_targets(batch.y);

            let (mut z, one_hot) = scratch.batch_views(batch.len());
            linalg::general_mat_mul(1.0, &batch.x, &theta, 0.0, &mut z);
            self.loss_fn.residual_in_place(z, one_hot);

            let (z, mut grad) = scratch.grad_views(batch.len());
            linalg::general_mat_mul(1.0, &batch.x.t(), &z, 0.0, &mut grad);

            self.optimizer.update_params(theta.view_mut(), scratch.grad());
        }

        Ok(())
    }
}
