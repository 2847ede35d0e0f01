pub mod heuristic;
pub mod rules;

pub use heuristic::HeuristicScorer;
