#![cfg(test)]

use ndarray::{Array2, ArrayView2, Zip};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Dataset, EpochConfig, EpochTrainer,
    metrics::{error_rate, predict, softmax_loss},
    softmax_regression_epoch,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn trainer(learning_rate: f32, batch_size: usize) -> EpochTrainer {
    EpochTrainer::new(EpochConfig::new(learning_rate, batch_size).unwrap()).unwrap()
}

fn random_problem(rng: &mut StdRng, m: usize, n: usize, k: usize) -> (Array2<f32>, Vec<u8>, Array2<f32>) {
    let x = Array2::from_shape_fn((m, n), |_| rng.random_range(-1.0..1.0));
    let y = (0..m).map(|_| rng.random_range(0..k as u8)).collect();
    let theta = Array2::from_shape_fn((n, k), |_| rng.random_range(-0.5..0.5));
    (x, y, theta)
}

/// Straightforward loop-by-loop epoch over flat buffers, used as the reference.
#[allow(clippy::too_many_arguments)]
fn naive_epoch(
    x: &[f32],
    y: &[u8],
    theta: &mut [f32],
    m: usize,
    n: usize,
    k: usize,
    lr: f32,
    batch: usize,
) {
    for start in (0..m).step_by(batch) {
        let end = (start + batch).min(m);
        let rows = end - start;
        let mut z = vec![0.0f32; rows * k];

        for i in 0..rows {
            for j in 0..k {
                for u in 0..n {
                    z[i * k + j] += x[(start + i) * n + u] * theta[u * k + j];
                }
            }

            let mut sum = 0.0;
            for j in 0..k {
                z[i * k + j] = z[i * k + j].exp();
                sum += z[i * k + j];
            }
            for j in 0..k {
                let target = if y[start + i] as usize == j { 1.0 } else { 0.0 };
                z[i * k + j] = z[i * k + j] / sum - target;
            }
        }

        for p in 0..n {
            for j in 0..k {
                let mut grad = 0.0;
                for i in 0..rows {
                    grad += x[(start + i) * n + p] * z[i * k + j];
                }
                theta[p * k + j] -= lr * grad / batch as f32;
            }
        }
    }
}

fn assert_all_close(a: ArrayView2<f32>, b: ArrayView2<f32>, tol: f32) {
    assert_eq!(a.dim(), b.dim());
    Zip::from(a).and(b).for_each(|&a, &b| {
        assert!((a - b).abs() <= tol * b.abs().max(1.0), "{a} != {b}");
    });
}

/// Cross-entropy of a single example, in `f64` for finite differences.
fn example_loss(x: &[f64], label: usize, theta: &Array2<f64>) -> f64 {
    let k = theta.ncols();
    let logits: Vec<f64> = (0..k)
        .map(|j| x.iter().enumerate().map(|(u, xu)| xu * theta[[u, j]]).sum())
        .collect();

    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let lse = max + logits.iter().map(|z| (z - max).exp()).sum::<f64>().ln();
    lse - logits[label]
}

#[test]
fn single_example_step_follows_the_finite_difference_gradient() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(11);
    let (x, y, theta) = random_problem(&mut rng, 1, 3, 4);
    let label = y[0] as usize;

    let x64: Vec<f64> = x.iter().map(|&v| v as f64).collect();
    let theta64 = theta.mapv(|v| v as f64);
    let h = 1e-4;
    let numeric = Array2::from_shape_fn(theta.dim(), |(p, j)| {
        let mut plus = theta64.clone();
        let mut minus = theta64.clone();
        plus[[p, j]] += h;
        minus[[p, j]] -= h;
        ((example_loss(&x64, label, &plus) - example_loss(&x64, label, &minus)) / (2.0 * h)) as f32
    });

    let ds = Dataset::new(x.view(), &y, 4).unwrap();
    let mut updated = theta.clone();
    trainer(1.0, 1).run_epoch(&ds, updated.view_mut()).unwrap();

    let step = &theta - &updated;
    assert_all_close(step.view(), numeric.view(), 1e-3);
}

#[test]
fn a_small_step_decreases_the_example_loss() {
    let mut rng = StdRng::seed_from_u64(5);
    let (x, y, mut theta) = random_problem(&mut rng, 1, 4, 3);
    let ds = Dataset::new(x.view(), &y, 3).unwrap();

    let before = softmax_loss(&ds, theta.view()).unwrap();
    trainer(0.05, 1).run_epoch(&ds, theta.view_mut()).unwrap();
    let after = softmax_loss(&ds, theta.view()).unwrap();

    assert!(after < before, "{after} >= {before}");
}

#[test]
fn separable_dataset_converges_to_full_accuracy() {
    init_logger();

    #[rustfmt::skip]
    let x = Array2::from_shape_vec((8, 2), vec![
         1.0, -1.0,
        -1.0,  1.0,
         2.0, -1.0,
        -2.0,  1.0,
         1.0, -2.0,
        -1.0,  2.0,
         1.5, -0.5,
        -1.5,  0.5,
    ])
    .unwrap();
    let y = [0, 1, 0, 1, 0, 1, 0, 1];
    let ds = Dataset::new(x.view(), &y, 2).unwrap();

    let trainer = trainer(0.1, 4);
    let mut theta = Array2::<f32>::zeros((2, 2));
    let initial_loss = softmax_loss(&ds, theta.view()).unwrap();

    for _ in 0..50 {
        trainer.run_epoch(&ds, theta.view_mut()).unwrap();
    }

    let predictions = predict(x.view(), theta.view()).unwrap();
    let labels: Vec<usize> = y.iter().map(|&l| l as usize).collect();
    assert_eq!(predictions.to_vec(), labels);
    assert_eq!(error_rate(&ds, theta.view()).unwrap(), 0.0);
    assert!(softmax_loss(&ds, theta.view()).unwrap() < initial_loss);
}

#[test]
fn epochs_match_the_loop_reference_with_a_ragged_tail() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(42);

    for (m, n, k, batch) in [(5, 1, 2, 2), (13, 5, 4, 4), (10, 3, 3, 10), (7, 6, 5, 3)] {
        let (x, y, theta) = random_problem(&mut rng, m, n, k);
        let ds = Dataset::new(x.view(), &y, k).unwrap();

        let mut fast = theta.clone();
        trainer(0.3, batch).run_epoch(&ds, fast.view_mut()).unwrap();

        let mut slow = theta.clone();
        let flat_x: Vec<f32> = x.iter().cloned().collect();
        let flat_theta = slow.as_slice_mut().unwrap();
        naive_epoch(&flat_x, &y, flat_theta, m, n, k, 0.3, batch);

        assert_all_close(fast.view(), slow.view(), 1e-5);
    }
}

#[test]
fn identical_inputs_give_bit_identical_parameters() {
    let mut rng = StdRng::seed_from_u64(3);
    let (x, y, theta) = random_problem(&mut rng, 23, 7, 5);
    let ds = Dataset::new(x.view(), &y, 5).unwrap();
    let trainer = trainer(0.2, 6);

    let mut first = theta.clone();
    let mut second = theta.clone();
    trainer.run_epoch(&ds, first.view_mut()).unwrap();
    trainer.run_epoch(&ds, second.view_mut()).unwrap();

    assert_eq!(first.dim(), (7, 5));
    assert_ne!(first, theta);
    let bits = |a: &Array2<f32>| a.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn raw_buffers_keep_their_length_and_match_the_views() {
    let mut rng = StdRng::seed_from_u64(8);
    let (x, y, theta) = random_problem(&mut rng, 9, 4, 3);
    let ds = Dataset::new(x.view(), &y, 3).unwrap();

    let mut viewed = theta.clone();
    trainer(0.5, 2).run_epoch(&ds, viewed.view_mut()).unwrap();

    let flat_x: Vec<f32> = x.iter().cloned().collect();
    let mut flat_theta: Vec<f32> = theta.iter().cloned().collect();
    softmax_regression_epoch(&flat_x, &y, &mut flat_theta, 9, 4, 3, 0.5, 2, false).unwrap();

    assert_eq!(flat_theta.len(), 4 * 3);
    let raw = Array2::from_shape_vec((4, 3), flat_theta).unwrap();
    assert_all_close(raw.view(), viewed.view(), 1e-6);
}

#[test]
fn large_logits_only_survive_with_stabilization() {
    let x = Array2::from_shape_vec((1, 1), vec![100.0f32]).unwrap();
    let y = [1];
    let ds = Dataset::new(x.view(), &y, 2).unwrap();
    let theta = Array2::from_shape_vec((1, 2), vec![1.0f32, 0.0]).unwrap();

    let mut plain = theta.clone();
    trainer(0.1, 1).run_epoch(&ds, plain.view_mut()).unwrap();
    assert!(plain.iter().any(|v| !v.is_finite()));

    let config = EpochConfig::new(0.1, 1).unwrap().with_stabilize(true);
    let mut stable = theta.clone();
    EpochTrainer::new(config)
        .unwrap()
        .run_epoch(&ds, stable.view_mut())
        .unwrap();

    // p = (1, 0) and the label is 1, so theta moves by -lr * x * (1, -1).
    let expected = Array2::from_shape_vec((1, 2), vec![-9.0f32, 10.0]).unwrap();
    assert_all_close(stable.view(), expected.view(), 1e-6);
}

#[test]
fn stabilization_does_not_change_moderate_epochs() {
    let mut rng = StdRng::seed_from_u64(21);
    let (x, y, theta) = random_problem(&mut rng, 12, 3, 4);
    let ds = Dataset::new(x.view(), &y, 4).unwrap();

    let mut plain = theta.clone();
    trainer(0.4, 5).run_epoch(&ds, plain.view_mut()).unwrap();

    let config = EpochConfig::new(0.4, 5).unwrap().with_stabilize(true);
    let mut stable = theta;
    EpochTrainer::new(config)
        .unwrap()
        .run_epoch(&ds, stable.view_mut())
        .unwrap();

    assert_all_close(plain.view(), stable.view(), 1e-5);
}
