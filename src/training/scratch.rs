use ndarray::{Array2, ArrayView2, ArrayViewMut2, s};

/// The per-call working memory of an epoch.
///
/// `z` and `one_hot` are `batch_size x k` and `grad` is `n x k`. A ragged last batch only
/// occupies the first rows of `z` and `one_hot`, but `clear` always wipes them entirely.
#[derive(Debug)]
pub(super) struct Scratch {
    z: Array2<f32>,
    one_hot: Array2<f32>,
    grad: Array2<f32>,
}

impl Scratch {
    pub(super) fn new(batch_size: usize, num_features: usize, num_classes: usize) -> Self {
        Self {
            z: Array2::zeros((batch_size, num_classes)),
            one_hot: Array2::zeros((batch_size, num_classes)),
            grad: Array2::zeros((num_features, num_classes)),
        }
    }

    pub(super) fn clear(&mut self) {
        self.z.fill(0.0);
        self.one_hot.fill(0.0);
        self.grad.fill(0.0);
    }

    /// Writes the one-hot encoding of `y` in the first `y.len()` rows.
    ///
    /// Every label must be lower than the amount of columns.
    pub(super) fn encode_targets(&mut self, y: &[u8]) {
        for (mut row, &label) in self.one_hot.rows_mut().into_iter().zip(y) {
            row[label as usize] = 1.0;
        }
    }

    /// Returns the logits buffer and the targets restricted to the first `rows` rows.
    pub(super) fn batch_views(&mut self, rows: usize) -> (ArrayViewMut2<'_, f32>, ArrayView2<'_, f32>) {
        let z = self.z.slice_mut(s![..rows, ..]);
        let one_hot = self.one_hot.slice(s![..rows, ..]);
        (z, one_hot)
    }

    /// Returns the first `rows` rows of `z` together with the gradient accumulator.
    pub(super) fn grad_views(&mut self, rows: usize) -> (ArrayView2<'_, f32>, ArrayViewMut2<'_, f32>) {
        (self.z.slice(s![..rows, ..]), self.grad.view_mut())
    }

    pub(super) fn grad(&self) -> ArrayView2<'_, f32> {
        self.grad.view()
    }
}
