use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Per-split feature subset; None means sqrt(n_features).
    pub max_features: Option<usize>,
    pub seed: u64,
    pub n_classes: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 20,
            min_samples_split: 3,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
            n_classes: 2,
        }
    }
}

/// Bagged ensemble of classification trees. Probabilities are averaged
/// across trees; the predicted class is the argmax. Read-only after fit and
/// safe for concurrent prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    pub fn new(config: ForestConfig) -> Self {
        Self { config, trees: Vec::new() }
    }

    pub fn n_classes(&self) -> usize {
        self.config.n_classes
    }

    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) {
        let n_features = features.first().map(|r| r.len()).unwrap_or(0);
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .max(1);

        self.trees = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = self.config.seed.wrapping_add(i as u64);
                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed,
                    n_classes: self.config.n_classes,
                };

                let (boot_features, boot_labels) = bootstrap(features, labels, seed);
                let mut tree = DecisionTree::new(tree_config);
                tree.fit(&boot_features, &boot_labels);
                tree
            })
            .collect();
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![1.0 / self.config.n_classes as f64; self.config.n_classes];
        }
        let mut acc = vec![0.0; self.config.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_proba(row)) {
                *a += p;
            }
        }
        for a in &mut acc {
            *a /= self.trees.len() as f64;
        }
        acc
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        self.predict_proba(row)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

fn bootstrap(
    features: &[Vec<f64>],
    labels: &[usize],
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>) {
    let n = features.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut boot_features = Vec::with_capacity(n);
    let mut boot_labels = Vec::with_capacity(n);
    for _ in 0..n {
        let i = rng.gen_range(0..n);
        boot_features.push(features[i].clone());
        boot_labels.push(labels[i]);
    }
    (boot_features, boot_labels)
}
