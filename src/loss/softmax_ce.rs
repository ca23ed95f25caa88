use ndarray::{ArrayView2, ArrayViewMut1, ArrayViewMut2, Zip};

use crate::{EpochErr, Result};

/// Softmax followed by cross-entropy, fused so that its derivative with respect to the logits
/// is just the predicted probabilities minus the one-hot targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxCrossEntropy {
    stabilize: bool,
}

impl SoftmaxCrossEntropy {
    /// Returns a new `SoftmaxCrossEntropy`.
    ///
    /// # Arguments
    /// * `stabilize` - Whether to subtract each row's maximum logit before exponentiating.
    ///   Without it large logits overflow `exp` and the residuals become non-finite.
    pub fn new(stabilize: bool) -> Self {
        Self { stabilize }
    }

    /// Overwrites the logits `z` with the softmax residuals `softmax(z) - one_hot`, row by row.
    ///
    /// # Arguments
    /// * `z` - The `rows x k` logits.
    /// * `one_hot` - The `rows x k` targets.
    pub fn residual_in_place(&self, mut z: ArrayViewMut2<f32>, one_hot: ArrayView2<f32>) {
        Zip::from(z.rows_mut())
            .and(one_hot.rows())
            .for_each(|mut row, target| {
                let sum = self.exp_in_place(row.view_mut());
                row.zip_mut_with(&target, |p, &t| *p = *p / sum - t);
            });
    }

    /// Exponentiates a row of logits in place and returns its sum, accumulated in class order.
    fn exp_in_place(&self, mut row: ArrayViewMut1<f32>) -> f32 {
        let max = if self.stabilize {
            row.fold(f32::NEG_INFINITY, |max, &z| max.max(z))
        } else {
            0.0
        };

        let mut sum = 0.0;
        for z in row.iter_mut() {
            *z = if self.stabilize { (*z - max).exp() } else { z.exp() };
            sum += *z;
        }

        sum
    }

    /// Computes the mean cross-entropy of `logits` against the labels `y`.
    ///
    /// The log-sum-exp is always evaluated with the row maximum subtracted, the loss is only
    /// reported, never differentiated.
    ///
    /// # Returns
    /// The loss or an error if `y` does not hold one label per row of `logits` or some label
    /// is not a column of `logits`.
    pub fn loss(&self, logits: ArrayView2<f32>, y: &[u8]) -> Result<f32> {
        let (rows, num_classes) = logits.dim();
        if y.len() != rows {
            return Err(EpochErr::InvalidShape {
                what: "labels",
                got: y.len(),
                expected: rows,
            });
        }

        if let Some((index, &label)) = y
            .iter()
            .enumerate()
            .find(|&(_, &label)| label as usize >= num_classes)
        {
            return Err(EpochErr::LabelOutOfRange {
                index,
                label,
                num_classes,
            });
        }

        let total: f32 = logits
            .rows()
            .into_iter()
            .zip(y)
            .map(|(row, &label)| {
                let max = row.fold(f32::NEG_INFINITY, |max, &z| max.max(z));
                let lse = max + row.fold(0.0, |acc, &z| acc + (z - max).exp()).ln();
                lse - row[label as usize]
            })
            .sum();

        Ok(total / rows as f32)
    }
}
