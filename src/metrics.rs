//! Evaluation of a parameter matrix on a dataset, the figures a training loop reports after
//! each epoch.

use ndarray::{Array1, Array2, ArrayView2};

use crate::{EpochErr, Result, dataset::Dataset, loss::SoftmaxCrossEntropy};

/// Computes the logits `x · theta`.
///
/// # Returns
/// The `m x k` logits or an error if `theta` does not have one row per feature.
pub fn logits(x: ArrayView2<f32>, theta: ArrayView2<f32>) -> Result<Array2<f32>> {
    if x.ncols() != theta.nrows() {
        return Err(EpochErr::InvalidShape {
            what: "parameter rows",
            got: theta.nrows(),
            expected: x.ncols(),
        });
    }

    Ok(x.dot(&theta))
}

/// Predicts the class of every row of `x` as the argmax of its logits. Ties go to the lowest
/// class index.
pub fn predict(x: ArrayView2<f32>, theta: ArrayView2<f32>) -> Result<Array1<usize>> {
    let logits = logits(x, theta)?;

    let predictions = logits
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (j, &z)| {
                    if z > best.1 { (j, z) } else { best }
                })
                .0
        })
        .collect();

    Ok(predictions)
}

/// Returns the fraction of examples in `data` that `theta` misclassifies.
pub fn error_rate(data: &Dataset<'_>, theta: ArrayView2<f32>) -> Result<f32> {
    data.check_params(theta.dim())?;

    let predictions = predict(data.x(), theta)?;
    let wrong = predictions
        .iter()
        .zip(data.y())
        .filter(|&(&pred, &label)| pred != label as usize)
        .count();

    Ok(wrong as f32 / data.len() as f32)
}

/// Returns the mean softmax cross-entropy of `theta` over `data`.
pub fn softmax_loss(data: &Dataset<'_>, theta: ArrayView2<f32>) -> Result<f32> {
    data.check_params(theta.dim())?;

    let logits = logits(data.x(), theta)?;
    SoftmaxCrossEntropy::default().loss(logits.view(), data.y())
}
