use serde::{Deserialize, Serialize};

use super::forest::ForestClassifier;
use super::scaler::StandardScaler;
use crate::error::{AppError, Result};

/// Class-index meaning of a trained model. The realtime and buy-only
/// pipelines are distinct label spaces and must never be mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelScheme {
    /// 0: BUY, 1: SELL, 2: HOLD.
    Realtime,
    /// 0: NO-BUY, 1: BUY.
    BuyOnly,
}

impl LabelScheme {
    pub fn n_classes(self) -> usize {
        match self {
            LabelScheme::Realtime => 3,
            LabelScheme::BuyOnly => 2,
        }
    }

    pub fn action_label(self, class: usize) -> &'static str {
        match (self, class) {
            (LabelScheme::Realtime, 0) => "BUY",
            (LabelScheme::Realtime, 1) => "SELL",
            (LabelScheme::Realtime, _) => "HOLD",
            (LabelScheme::BuyOnly, 1) => "BUY",
            (LabelScheme::BuyOnly, _) => "NO-BUY",
        }
    }
}

/// The single persisted unit of a training run. Scaler and classifier are
/// fitted together; feature_count pins the vector layout the pair expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub scaler: StandardScaler,
    pub forest: ForestClassifier,
    pub feature_count: usize,
    pub label_scheme: LabelScheme,
    /// Unix seconds.
    pub trained_at: i64,
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub class: usize,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    pub fn top_probability(&self) -> f64 {
        self.probabilities.iter().cloned().fold(0.0, f64::max)
    }
}

/// Read-only wrapper around a loaded model artifact. Safe to share across
/// concurrent scoring calls; the artifact is loaded by the caller and
/// injected, never read from disk here.
#[derive(Debug, Clone)]
pub struct ClassifierAdapter {
    artifact: ModelArtifact,
}

impl ClassifierAdapter {
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        if artifact.scaler.feature_count() != artifact.feature_count {
            return Err(AppError::Model(format!(
                "scaler expects {} features but artifact declares {}",
                artifact.scaler.feature_count(),
                artifact.feature_count
            )));
        }
        if artifact.forest.n_classes() != artifact.label_scheme.n_classes() {
            return Err(AppError::Model(format!(
                "forest has {} classes but scheme {:?} expects {}",
                artifact.forest.n_classes(),
                artifact.label_scheme,
                artifact.label_scheme.n_classes()
            )));
        }
        Ok(Self { artifact })
    }

    pub fn label_scheme(&self) -> LabelScheme {
        self.artifact.label_scheme
    }

    pub fn feature_count(&self) -> usize {
        self.artifact.feature_count
    }

    /// Scale then classify one feature vector. A length mismatch is a fatal
    /// configuration error for this prediction.
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        if features.len() != self.artifact.feature_count {
            return Err(AppError::Model(format!(
                "feature vector length {} does not match model feature_count {}",
                features.len(),
                self.artifact.feature_count
            )));
        }
        let scaled = self.artifact.scaler.transform(features)?;
        let probabilities = self.artifact.forest.predict_proba(&scaled);
        let class = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Ok(Prediction { class, probabilities })
    }

    pub fn action_label(&self, class: usize) -> &'static str {
        self.artifact.label_scheme.action_label(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestConfig;

    fn fitted_artifact(feature_count: usize) -> ModelArtifact {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let mut row = vec![0.0; feature_count];
                row[0] = if i < 30 { 0.2 } else { 0.8 };
                row[1] = (i % 5) as f64;
                row
            })
            .collect();
        let labels: Vec<usize> = (0..60).map(|i| usize::from(i >= 30)).collect();

        let scaler = StandardScaler::fit(&features).unwrap();
        let scaled = scaler.transform_all(&features).unwrap();
        let mut forest = ForestClassifier::new(ForestConfig {
            n_trees: 15,
            max_depth: 5,
            n_classes: 2,
            ..Default::default()
        });
        forest.fit(&scaled, &labels);

        ModelArtifact {
            scaler,
            forest,
            feature_count,
            label_scheme: LabelScheme::BuyOnly,
            trained_at: 0,
        }
    }

    #[test]
    fn predicts_class_with_probabilities() {
        let adapter = ClassifierAdapter::new(fitted_artifact(4)).unwrap();
        let mut row = vec![0.0; 4];
        row[0] = 0.8;
        row[1] = 2.0;
        let pred = adapter.predict(&row).unwrap();
        assert_eq!(pred.class, 1);
        assert_eq!(pred.probabilities.len(), 2);
        assert!(pred.top_probability() > 0.5);
        assert_eq!(adapter.action_label(pred.class), "BUY");
    }

    #[test]
    fn length_mismatch_is_reported_not_coerced() {
        let adapter = ClassifierAdapter::new(fitted_artifact(4)).unwrap();
        assert!(adapter.predict(&[0.1, 0.2]).is_err());
    }

    #[test]
    fn inconsistent_artifact_is_rejected_at_construction() {
        let mut artifact = fitted_artifact(4);
        artifact.feature_count = 30;
        assert!(ClassifierAdapter::new(artifact).is_err());
    }

    #[test]
    fn label_schemes_do_not_mix() {
        assert_eq!(LabelScheme::Realtime.action_label(0), "BUY");
        assert_eq!(LabelScheme::Realtime.action_label(1), "SELL");
        assert_eq!(LabelScheme::Realtime.action_label(2), "HOLD");
        assert_eq!(LabelScheme::BuyOnly.action_label(1), "BUY");
        assert_eq!(LabelScheme::BuyOnly.action_label(0), "NO-BUY");
    }
}
