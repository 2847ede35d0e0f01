use serde::Serialize;

/// Metrics for a buy-target classifier evaluated with per-sample weights.
/// Every ratio with an empty denominator is defined as 0.
#[derive(Debug, Clone, Serialize)]
pub struct WeightedAccuracyReport {
    pub basic_accuracy: f64,
    pub weighted_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub avg_confidence_correct: f64,
    pub avg_confidence_incorrect: f64,
    pub total_buy_opportunities: usize,
    pub total_predictions: usize,
}

/// Weighted evaluation over the positive (buy) class. `weights` are the
/// labeler's confidence values; predictions on high-conviction samples count
/// for more than coin-flip ones.
pub fn evaluate(y_true: &[u8], y_pred: &[u8], weights: &[f64]) -> WeightedAccuracyReport {
    let n = y_true.len().min(y_pred.len()).min(weights.len());

    let mut correct = 0usize;
    let mut weighted_correct = 0.0;
    let mut weight_sum = 0.0;
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut correct_weight = 0.0;
    let mut incorrect_weight = 0.0;
    let mut incorrect = 0usize;
    let mut positives = 0usize;

    for i in 0..n {
        let (t, p, w) = (y_true[i], y_pred[i], weights[i]);
        weight_sum += w;
        if t == 1 {
            positives += 1;
        }
        if t == p {
            correct += 1;
            weighted_correct += w;
            correct_weight += w;
        } else {
            incorrect += 1;
            incorrect_weight += w;
        }
        match (t, p) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
    }

    let precision = ratio(tp as f64, (tp + fp) as f64);
    let recall = ratio(tp as f64, (tp + fn_) as f64);

    WeightedAccuracyReport {
        basic_accuracy: ratio(correct as f64, n as f64),
        weighted_accuracy: ratio(weighted_correct, weight_sum),
        precision,
        recall,
        f1_score: ratio(2.0 * precision * recall, precision + recall),
        avg_confidence_correct: ratio(correct_weight, correct as f64),
        avg_confidence_incorrect: ratio(incorrect_weight, incorrect as f64),
        total_buy_opportunities: positives,
        total_predictions: n,
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_accuracy_favours_confident_samples() {
        let report = evaluate(&[1, 0, 1, 0], &[1, 0, 0, 0], &[0.8, 0.5, 0.9, 0.2]);
        assert!((report.basic_accuracy - 0.75).abs() < 1e-12);
        assert!((report.weighted_accuracy - 0.625).abs() < 1e-12);
        assert!((report.precision - 1.0).abs() < 1e-12);
        assert!((report.recall - 0.5).abs() < 1e-12);
        let f1 = 2.0 * 1.0 * 0.5 / 1.5;
        assert!((report.f1_score - f1).abs() < 1e-12);
        assert_eq!(report.total_buy_opportunities, 2);
        assert_eq!(report.total_predictions, 4);
    }

    #[test]
    fn confidence_split_between_correct_and_incorrect() {
        let report = evaluate(&[1, 0, 1, 0], &[1, 0, 0, 0], &[0.8, 0.5, 0.9, 0.2]);
        assert!((report.avg_confidence_correct - (0.8 + 0.5 + 0.2) / 3.0).abs() < 1e-12);
        assert!((report.avg_confidence_incorrect - 0.9).abs() < 1e-12);
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let report = evaluate(&[], &[], &[]);
        assert_eq!(report.basic_accuracy, 0.0);
        assert_eq!(report.weighted_accuracy, 0.0);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1_score, 0.0);
        assert_eq!(report.total_predictions, 0);
    }

    #[test]
    fn no_positive_predictions_is_not_an_error() {
        let report = evaluate(&[1, 1], &[0, 0], &[0.5, 0.5]);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1_score, 0.0);
        assert_eq!(report.total_buy_opportunities, 2);
    }
}
