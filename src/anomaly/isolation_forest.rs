//! Isolation Forest anomaly detection

use crate::anomaly::{AnomalyDetector, ANOMALOUS, NORMAL};
use crate::error::{Result, SmartPriceError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score above which `Contamination::Auto` flags a row
const AUTO_THRESHOLD: f64 = 0.5;

/// How the decision threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Contamination {
    /// Fixed threshold at score 0.5, independent of the training data
    Auto,
    /// Flag this proportion of the training rows
    Ratio(f64),
}

impl Default for Contamination {
    fn default() -> Self {
        Contamination::Auto
    }
}

/// Isolation Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Visit features in random order and split on the first one that
        // varies on this node; one-hot columns are often constant here.
        let order = sample(rng, x.ncols(), x.ncols());
        let mut chosen = None;
        for feature in order.iter() {
            let (lo, hi) = indices
                .iter()
                .map(|&i| x[[i, feature]])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if hi - lo > 1e-10 {
                chosen = Some((feature, lo, hi));
                break;
            }
        }

        // Every feature is constant on this node
        let Some((feature, min_val, max_val)) = chosen else {
            return IsolationTree::External { size: n_samples };
        };

        let threshold = rng.gen_range(min_val..max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Path length of `sample`, with the unbuilt remainder of each leaf
    /// estimated by `c(size)`
    pub fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = self;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationTree::External { size } => return depth as f64 + Self::c(*size),
                IsolationTree::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search over `n` keys:
    /// c(n) = 2 H(n-1) - 2(n-1)/n
    pub fn c(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n_f = n as f64;
                2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
            }
        }
    }
}

/// Isolation Forest anomaly detector.
///
/// Scores lie in `(0, 1]`; rows scoring strictly above the threshold are
/// labelled [`ANOMALOUS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: Contamination,
    seed: Option<u64>,
    trees: Option<Vec<IsolationTree>>,
    threshold: Option<f64>,
    /// Rows drawn per tree at fit time
    n_samples: Option<usize>,
    n_features: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
            seed: None,
            trees: None,
            threshold: None,
            n_samples: None,
            n_features: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set contamination strategy; ratios are clamped to `[0, 0.5]`
    pub fn with_contamination(mut self, contamination: Contamination) -> Self {
        self.contamination = match contamination {
            Contamination::Ratio(r) => Contamination::Ratio(r.clamp(0.0, 0.5)),
            auto => auto,
        };
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn contamination(&self) -> Contamination {
        self.contamination
    }

    /// Width of the rows seen at fit time
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.trees.is_some()
    }

    /// Score is `2^(-E[h(x)] / c(n))`, higher means more anomalous
    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (trees, n_features) = match (&self.trees, self.n_features) {
            (Some(trees), Some(n_features)) => (trees, n_features),
            _ => {
                return Err(SmartPriceError::PredictionFault(
                    "isolation forest is not fitted".to_string(),
                ))
            }
        };
        if x.ncols() != n_features {
            return Err(SmartPriceError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let c_n = IsolationTree::c(self.n_samples.unwrap_or(self.max_samples));
        let c_n = if c_n > 0.0 { c_n } else { 1.0 };

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let avg_path_length = trees
                    .iter()
                    .map(|tree| tree.path_length(row))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path_length / c_n)
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector for IsolationForest {
    /// Each tree draws `min(max_samples, n)` distinct rows from a generator
    /// seeded with `seed + tree index`.
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 || x.ncols() == 0 {
            return Err(SmartPriceError::EmptyInput(format!(
                "cannot fit isolation forest on a {}x{} matrix",
                n_samples,
                x.ncols()
            )));
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;
        let base_seed = match self.seed {
            Some(seed) => seed,
            None => thread_rng().gen(),
        };

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let indices = sample(&mut rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_height, &mut rng)
            })
            .collect();

        self.trees = Some(trees);
        self.n_samples = Some(samples_per_tree);
        self.n_features = Some(x.ncols());

        self.threshold = Some(match self.contamination {
            Contamination::Auto => AUTO_THRESHOLD,
            Contamination::Ratio(ratio) => {
                let scores = self.compute_scores(x)?;
                let mut sorted: Vec<f64> = scores.to_vec();
                sorted.sort_by(|a, b| b.total_cmp(a));
                let k = ((ratio * n_samples as f64).ceil() as usize).clamp(1, n_samples);
                // Midway below the k-th highest score so k rows lie above it
                match sorted.get(k) {
                    Some(&next) => (sorted[k - 1] + next) / 2.0,
                    None => 0.0,
                }
            }
        });

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let threshold = self.threshold();
        Ok(self
            .score_samples(x)?
            .mapv(|s| if s > threshold { ANOMALOUS } else { NORMAL }))
    }

    fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(AUTO_THRESHOLD)
    }
}
