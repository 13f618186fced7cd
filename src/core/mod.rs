pub mod cea;
pub mod discount;
pub mod engine;
pub mod markov;
pub mod pipeline;

pub use crate::domain::model::{
    AnalysisResult, MarkovTrace, SimulatedStrategy, Strategy, StrategyOutcome, TransitionMatrix,
};
pub use crate::domain::ports::{ModelProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
