pub mod adapter;
pub mod forest;
pub mod scaler;
pub mod tree;

pub use adapter::{ClassifierAdapter, LabelScheme, ModelArtifact, Prediction};
pub use forest::{ForestClassifier, ForestConfig};
pub use scaler::StandardScaler;
