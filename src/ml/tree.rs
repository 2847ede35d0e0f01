use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; None means all.
    pub max_features: Option<usize>,
    pub seed: u64,
    pub n_classes: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
            n_classes: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        probs: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART-style classification tree: gini impurity, midpoint thresholds over
/// a shuffled feature subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self { config, root: None }
    }

    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) {
        let indices: Vec<usize> = (0..features.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.root = Some(self.build(features, labels, &indices, 0, &mut rng));
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let uniform = vec![1.0 / self.config.n_classes as f64; self.config.n_classes];
        let Some(mut node) = self.root.as_ref() else {
            return uniform;
        };
        loop {
            match node {
                Node::Leaf { probs } => return probs.clone(),
                Node::Split { feature, threshold, left, right } => {
                    node = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    fn build(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let counts = self.class_counts(labels, indices);
        let impurity = gini(&counts, indices.len());

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || impurity < 1e-10
        {
            return self.leaf(&counts, indices.len());
        }

        match self.best_split(features, labels, indices, impurity, rng) {
            Some((feature, threshold, left_idx, right_idx)) => {
                if left_idx.len() < self.config.min_samples_leaf
                    || right_idx.len() < self.config.min_samples_leaf
                {
                    return self.leaf(&counts, indices.len());
                }
                let left = self.build(features, labels, &left_idx, depth + 1, rng);
                let right = self.build(features, labels, &right_idx, depth + 1, rng);
                Node::Split { feature, threshold, left: Box::new(left), right: Box::new(right) }
            }
            None => self.leaf(&counts, indices.len()),
        }
    }

    fn leaf(&self, counts: &[usize], n: usize) -> Node {
        let probs = if n == 0 {
            vec![1.0 / self.config.n_classes as f64; self.config.n_classes]
        } else {
            counts.iter().map(|&c| c as f64 / n as f64).collect()
        };
        Node::Leaf { probs }
    }

    fn class_counts(&self, labels: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.config.n_classes];
        for &i in indices {
            counts[labels[i].min(self.config.n_classes - 1)] += 1;
        }
        counts
    }

    fn best_split(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
        let n_features = features.first()?.len();
        let max_features = self.config.max_features.unwrap_or(n_features).min(n_features);

        let mut feature_order: Vec<usize> = (0..n_features).collect();
        feature_order.shuffle(rng);
        feature_order.truncate(max_features);

        let mut best_gain = 0.0;
        let mut best: Option<(usize, f64, Vec<usize>, Vec<usize>)> = None;

        for &feature in &feature_order {
            let mut values: Vec<f64> = indices.iter().map(|&i| features[i][feature]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| features[i][feature] <= threshold);
                if left.is_empty() || right.is_empty() {
                    continue;
                }

                let left_counts = self.class_counts(labels, &left);
                let right_counts = self.class_counts(labels, &right);
                let n_left = left.len() as f64;
                let n_right = right.len() as f64;
                let weighted = (n_left * gini(&left_counts, left.len())
                    + n_right * gini(&right_counts, right.len()))
                    / (n_left + n_right);

                let gain = parent_impurity - weighted;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, threshold, left, right));
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}
