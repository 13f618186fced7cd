pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{cli::LocalStorage, toml_config::ModelConfig};
pub use crate::core::{
    cea::{compare, evaluate_strategy, CohortAnalysis, EvaluationSettings},
    discount::{cycle_times, discount_factors, pv, pv_sum, Timing},
    engine::AnalysisEngine,
    markov::{sim_markov_chain, sim_markov_chain_time_varying},
    pipeline::CohortPipeline,
};
pub use crate::domain::model::{
    AnalysisResult, Dominance, IncrementalResult, MarkovTrace, SimulatedStrategy, Strategy,
    StrategyOutcome, TransitionMatrix,
};
pub use crate::utils::error::{CeaError, Result};
