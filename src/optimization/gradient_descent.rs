use std::num::NonZeroUsize;

use ndarray::{ArrayView2, ArrayViewMut2};

/// Mini-batch gradient descent with a fixed step divisor.
///
/// The accumulated gradient of a batch is always divided by the configured batch size, even
/// when the last batch of an epoch holds fewer examples.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
    batch_size: NonZeroUsize,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    /// * `batch_size` - The divisor applied to every accumulated gradient.
    pub fn new(learning_rate: f32, batch_size: NonZeroUsize) -> Self {
        Self {
            learning_rate,
            batch_size,
        }
    }

    /// Makes a step in the opposite direction of the gradient, that is,
    /// `params -= learning_rate * grad / batch_size`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient summed over a batch, with the same shape as `params`.
    pub fn update_params(&self, mut params: ArrayViewMut2<f32>, grad: ArrayView2<f32>) {
        let batch_size = self.batch_size.get() as f32;
        let lr = self.learning_rate;

        params.zip_mut_with(&grad, |w, &g| *w -= lr * g / batch_size);
    }
}
