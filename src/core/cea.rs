//! Cost-effectiveness summaries built on top of the Markov trace and discounting.

use crate::core::discount::{cycle_times, pv, Timing};
use crate::core::markov::sim_markov_chain;
use crate::domain::model::{
    AnalysisResult, Dominance, IncrementalResult, MarkovTrace, SimulatedStrategy, Strategy,
    StrategyOutcome,
};
use crate::utils::error::{CeaError, Result};
use crate::utils::validation::validate_unique_names;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSettings {
    pub cost_rate: f64,
    pub qaly_rate: f64,
    pub timing: Timing,
    /// Cycle length in years; QALYs per cycle are scaled by it.
    pub cycle_length: f64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            cost_rate: 0.0,
            qaly_rate: 0.0,
            timing: Timing::End,
            cycle_length: 1.0,
        }
    }
}

/// Weight the trace by the strategy's state costs and utilities and discount them.
///
/// Cycles `1..=n` are counted; row 0 is the cohort at entry and accrues nothing.
pub fn evaluate_strategy(
    strategy: &Strategy,
    trace: &MarkovTrace,
    settings: &EvaluationSettings,
) -> Result<StrategyOutcome> {
    let cycle_costs: Vec<f64> = trace
        .weighted(&strategy.state_costs)?
        .into_iter()
        .skip(1)
        .collect();
    let cycle_qalys: Vec<f64> = trace
        .weighted(&strategy.state_utilities)?
        .into_iter()
        .skip(1)
        .map(|q| q * settings.cycle_length)
        .collect();

    let times = cycle_times(trace.n_cycles(), settings.timing);
    let discounted_costs = pv(&cycle_costs, settings.cost_rate, &times)?;
    let discounted_qalys = pv(&cycle_qalys, settings.qaly_rate, &times)?;

    Ok(StrategyOutcome {
        strategy: strategy.name.clone(),
        total_costs: discounted_costs.iter().sum(),
        total_qalys: discounted_qalys.iter().sum(),
        undiscounted_costs: cycle_costs.iter().sum(),
        undiscounted_qalys: cycle_qalys.iter().sum(),
        times,
        cycle_costs,
        cycle_qalys,
        discounted_costs,
        discounted_qalys,
    })
}

/// Incremental comparison of `comparator` against `reference`.
pub fn compare(
    reference: &StrategyOutcome,
    comparator: &StrategyOutcome,
    willingness_to_pay: f64,
) -> IncrementalResult {
    let delta_costs = comparator.total_costs - reference.total_costs;
    let delta_qalys = comparator.total_qalys - reference.total_qalys;

    let status = if delta_costs == 0.0 && delta_qalys == 0.0 {
        Dominance::Equivalent
    } else if delta_costs <= 0.0 && delta_qalys >= 0.0 {
        Dominance::Dominant
    } else if delta_costs >= 0.0 && delta_qalys <= 0.0 {
        Dominance::Dominated
    } else {
        Dominance::Tradeoff
    };

    let icer = if delta_qalys == 0.0 {
        None
    } else {
        Some(delta_costs / delta_qalys)
    };

    IncrementalResult {
        reference: reference.strategy.clone(),
        comparator: comparator.strategy.clone(),
        incremental_costs: delta_costs,
        incremental_qalys: delta_qalys,
        icer,
        status,
        willingness_to_pay,
        incremental_net_benefit: willingness_to_pay * delta_qalys - delta_costs,
    }
}

/// 一組策略共用的 cohort 模型設定
///
/// Strategy names must be unique; outcomes and incremental results are matched by name.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortAnalysis {
    pub initial: Vec<f64>,
    pub n_cycles: usize,
    pub settings: EvaluationSettings,
    pub strategies: Vec<Strategy>,
    /// Reference strategy for incremental results; the first strategy when unset.
    pub reference: Option<String>,
    pub willingness_to_pay: f64,
}

impl CohortAnalysis {
    pub fn simulate(&self) -> Result<Vec<SimulatedStrategy>> {
        if self.strategies.is_empty() {
            return Err(CeaError::EmptyInput {
                context: "analysis has no strategies".to_string(),
            });
        }
        validate_unique_names(
            "strategies.name",
            self.strategies.iter().map(|s| s.name.as_str()),
        )?;

        self.strategies
            .iter()
            .map(|strategy| {
                tracing::debug!("Simulating strategy '{}'", strategy.name);
                let trace = sim_markov_chain(&self.initial, &strategy.transitions, self.n_cycles)?;
                Ok(SimulatedStrategy {
                    strategy: strategy.name.clone(),
                    trace,
                })
            })
            .collect()
    }

    pub fn evaluate(&self, simulations: Vec<SimulatedStrategy>) -> Result<AnalysisResult> {
        let mut outcomes = Vec::with_capacity(simulations.len());
        for simulated in &simulations {
            let strategy = self.strategy(&simulated.strategy)?;
            outcomes.push(evaluate_strategy(strategy, &simulated.trace, &self.settings)?);
        }

        let reference_name = match &self.reference {
            Some(name) => name.as_str(),
            None => outcomes
                .first()
                .map(|o| o.strategy.as_str())
                .ok_or_else(|| CeaError::EmptyInput {
                    context: "no simulated strategies to evaluate".to_string(),
                })?,
        };
        let reference = outcomes
            .iter()
            .find(|o| o.strategy == reference_name)
            .ok_or_else(|| CeaError::ProcessingError {
                message: format!("reference strategy '{}' was not simulated", reference_name),
            })?;

        let incremental = outcomes
            .iter()
            .filter(|o| o.strategy != reference.strategy)
            .map(|o| compare(reference, o, self.willingness_to_pay))
            .collect();

        Ok(AnalysisResult {
            simulations,
            outcomes,
            incremental,
        })
    }

    pub fn run(&self) -> Result<AnalysisResult> {
        let simulations = self.simulate()?;
        self.evaluate(simulations)
    }

    fn strategy(&self, name: &str) -> Result<&Strategy> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CeaError::ProcessingError {
                message: format!("unknown strategy '{}'", name),
            })
    }
}
