use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Per-feature standardization: (x - mean) / std. Fitted together with the
/// classifier and versioned as one artifact; the two must never be mixed
/// across training runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(AppError::Model("cannot fit scaler on zero samples".to_string()));
        };
        let n_features = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for ((s, &m), &x) in stds.iter_mut().zip(&means).zip(row) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
        }

        Ok(Self { means, stds })
    }

    pub fn feature_count(&self) -> usize {
        self.means.len()
    }

    /// Length mismatch is a configuration error for this prediction:
    /// reported, never coerced.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(AppError::Model(format!(
                "feature length {} does not match scaler input {}",
                row.len(),
                self.means.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&m, &s))| {
                // Constant features scale to zero rather than dividing by zero.
                let divisor = if s > 0.0 { s } else { 1.0 };
                (x - m) / divisor
            })
            .collect())
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}
