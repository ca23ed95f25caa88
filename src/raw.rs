//! Entry points over plain contiguous buffers, for driving programs that hold the data in
//! their own memory.

use std::slice;

use log::warn;
use ndarray::{ArrayView2, ArrayViewMut2};

use crate::{
    EpochErr, Result, config::EpochConfig, dataset::Dataset, training::EpochTrainer,
};

/// Runs one softmax regression epoch over row-major buffers, updating `theta` in place.
///
/// # Arguments
/// * `x` - The `m x n` features.
/// * `y` - The `m` labels, each lower than `k`.
/// * `theta` - The `n x k` parameters.
/// * `learning_rate` - The SGD step size.
/// * `batch_size` - The mini-batch size, at most `m`.
/// * `stabilize` - Whether to subtract each row's maximum logit before the softmax.
///
/// # Returns
/// An error if a buffer length disagrees with its shape, a dimension is zero, some label is
/// out of range or a hyperparameter is invalid. `theta` is only written when `Ok` is returned.
#[allow(clippy::too_many_arguments)]
pub fn softmax_regression_epoch(
    x: &[f32],
    y: &[u8],
    theta: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    learning_rate: f32,
    batch_size: usize,
    stabilize: bool,
) -> Result<()> {
    check_len("x", x.len(), m, n)?;
    check_len("theta", theta.len(), n, k)?;

    let config = EpochConfig::new(learning_rate, batch_size)?.with_stabilize(stabilize);
    let x = ArrayView2::from_shape((m, n), x).map_err(|_| EpochErr::InvalidShape {
        what: "x",
        got: x.len(),
        expected: m * n,
    })?;
    let data = Dataset::new(x, y, k)?;

    let theta_len = theta.len();
    let theta = ArrayViewMut2::from_shape((n, k), theta).map_err(|_| EpochErr::InvalidShape {
        what: "theta",
        got: theta_len,
        expected: n * k,
    })?;

    EpochTrainer::new(config)?.run_epoch(&data, theta)
}

/// Returns `rows * cols`, the length of a buffer, or an error if it overflows.
fn buffer_len(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or(EpochErr::InvalidInput("buffer length rows * cols overflows usize"))
}

fn check_len(what: &'static str, got: usize, rows: usize, cols: usize) -> Result<()> {
    let expected = buffer_len(rows, cols)?;

    if got != expected {
        return Err(EpochErr::InvalidShape {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

/// C ABI version of [`softmax_regression_epoch`].
///
/// # Returns
/// `0` on success, otherwise the [`EpochErr::code`] of the failure. Null buffers report
/// `EpochErr::NullBuffer`.
///
/// # Safety
/// Every non-null pointer must be valid for the whole call: `x` for reading `m * n` floats,
/// `y` for reading `m` bytes and `theta` for reading and writing `n * k` floats, with `theta`
/// not aliasing the other two nor being accessed by anything else during the call.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn softmax_regression_epoch_c(
    x: *const f32,
    y: *const u8,
    theta: *mut f32,
    m: usize,
    n: usize,
    k: usize,
    learning_rate: f32,
    batch_size: usize,
    stabilize: bool,
) -> i32 {
    // SAFETY: forwarded from this function's contract.
    let result =
        unsafe { epoch_from_raw(x, y, theta, m, n, k, learning_rate, batch_size, stabilize) };

    match result {
        Ok(()) => 0,
        Err(e) => {
            warn!(code = e.code(); "softmax regression epoch rejected: {e}");
            e.code()
        }
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn epoch_from_raw(
    x: *const f32,
    y: *const u8,
    theta: *mut f32,
    m: usize,
    n: usize,
    k: usize,
    learning_rate: f32,
    batch_size: usize,
    stabilize: bool,
) -> Result<()> {
    for (what, is_null) in [("x", x.is_null()), ("y", y.is_null()), ("theta", theta.is_null())] {
        if is_null {
            return Err(EpochErr::NullBuffer { what });
        }
    }

    let x_len = buffer_len(m, n)?;
    let theta_len = buffer_len(n, k)?;

    // SAFETY: the pointers are non-null and the caller guarantees they are valid for these
    //         lengths and that `theta` is not aliased.
    let (x, y, theta) = unsafe {
        (
            slice::from_raw_parts(x, x_len),
            slice::from_raw_parts(y, m),
            slice::from_raw_parts_mut(theta, theta_len),
        )
    };

    softmax_regression_epoch(x, y, theta, m, n, k, learning_rate, batch_size, stabilize)
}
