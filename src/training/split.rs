//! Seeded holdout splitting

use crate::error::{Result, SmartPriceError};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of a single train/test partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldoutSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl HoldoutSplit {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// Shuffle `0..n_samples` with `seed` and hold out `ceil(n * test_fraction)`
/// rows for testing.
///
/// Fails when the fraction is outside `(0, 1)` or when either side would be
/// empty.
pub fn split_indices(n_samples: usize, test_fraction: f64, seed: u64) -> Result<HoldoutSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SmartPriceError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (n_samples as f64 * test_fraction).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(SmartPriceError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: format!(
                "{} rows leave {} for training and {} for testing",
                n_samples, n_train, n_test
            ),
        });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_indices = indices.split_off(n_test);
    Ok(HoldoutSplit {
        train_indices,
        test_indices: indices,
    })
}

/// Split a feature matrix and its target into `(x_train, x_test, y_train, y_test)`
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
    if x.nrows() != y.len() {
        return Err(SmartPriceError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let split = split_indices(x.nrows(), test_fraction, seed)?;
    Ok((
        x.select(Axis(0), &split.train_indices),
        x.select(Axis(0), &split.test_indices),
        y.select(Axis(0), &split.train_indices),
        y.select(Axis(0), &split.test_indices),
    ))
}

/// Split a table row-wise into `(train, test)` frames
pub fn split_frame(df: &DataFrame, test_fraction: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let split = split_indices(df.height(), test_fraction, seed)?;
    let take = |rows: &[usize]| -> Result<DataFrame> {
        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.iter().map(|&i| i as IdxSize).collect(),
        );
        Ok(df.take(&idx)?)
    };
    Ok((take(&split.train_indices)?, take(&split.test_indices)?))
}
