pub mod agent;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod eval;
pub mod features;
pub mod fetcher;
pub mod flow;
pub mod history;
pub mod labeler;
pub mod ml;
pub mod ranker;
pub mod scorer;
pub mod state;
pub mod trainer;
pub mod types;
