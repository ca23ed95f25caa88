use std::{num::NonZeroUsize, ops::Range};

use ndarray::{ArrayView2, s};

use crate::{EpochErr, Result};

/// A validated, borrowed view over a labeled classification dataset.
///
/// `x` holds one example per row and `y` the class index of each row. Building a `Dataset`
/// is the only place labels are checked against the number of classes, so every batch it
/// yields can be indexed with its labels without further checks.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    x: ArrayView2<'a, f32>,
    y: &'a [u8],
    num_classes: usize,
}

impl<'a> Dataset<'a> {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The `m x n` feature matrix.
    /// * `y` - The `m` labels, each lower than `num_classes`.
    /// * `num_classes` - The amount of classes `k`.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the shapes are empty or inconsistent or some label is
    /// out of range.
    pub fn new(x: ArrayView2<'a, f32>, y: &'a [u8], num_classes: usize) -> Result<Self> {
        let (m, n) = x.dim();

        for (what, got) in [("examples", m), ("features", n), ("classes", num_classes)] {
            if got == 0 {
                return Err(EpochErr::InvalidShape {
                    what,
                    got,
                    expected: 1,
                });
            }
        }

        if y.len() != m {
            return Err(EpochErr::InvalidShape {
                what: "labels",
                got: y.len(),
                expected: m,
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

        Ok(Self { x, y, num_classes })
    }

    /// Returns the amount of examples `m`.
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Always `false`, a `Dataset` holds at least one example.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Returns the amount of features `n`.
    #[inline]
    pub fn num_features(&self) -> usize {
        self.x.ncols()
    }

    /// Returns the amount of classes `k`.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    pub fn x(&self) -> ArrayView2<'a, f32> {
        self.x
    }

    #[inline]
    pub fn y(&self) -> &'a [u8] {
        self.y
    }

    /// Checks that a parameter matrix of shape `dim` maps this dataset's features to its
    /// classes, that is, that it is `n x k`.
    pub fn check_params(&self, dim: (usize, usize)) -> Result<()> {
        let (rows, cols) = dim;

        if rows != self.num_features() {
            return Err(EpochErr::InvalidShape {
                what: "parameter rows",
                got: rows,
                expected: self.num_features(),
            });
        }

        if cols != self.num_classes {
            return Err(EpochErr::InvalidShape {
                what: "parameter columns",
                got: cols,
                expected: self.num_classes,
            });
        }

        Ok(())
    }

    /// Splits the dataset in consecutive, non overlapping batches in index order.
    ///
    /// # Arguments
    /// * `batch_size` - The size of every batch but maybe the last one.
    pub fn batches(&self, batch_size: NonZeroUsize) -> Batches<'a> {
        Batches {
            x: self.x,
            y: self.y,
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }
}

/// A borrowed batch of consecutive examples.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub range: Range<usize>,
    pub x: ArrayView2<'a, f32>,
    pub y: &'a [u8],
}

impl Batch<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Iterator over the batches of a `Dataset`, see `Dataset::batches`.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    x: ArrayView2<'a, f32>,
    y: &'a [u8],
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.y.len();
        if self.cursor >= total {
            return None;
        }

        let range = self.cursor..(self.cursor + self.batch_size).min(total);
        self.cursor = range.end;

        let x = self.x.slice_move(s![range.clone(), ..]);
        let y = &self.y[range.clone()];

        Some(Batch { range, x, y })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.y.len() - self.cursor).div_ceil(self.batch_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches<'_> {}
