use crate::utils::error::{CeaError, Result};
use serde::{Deserialize, Serialize};

/// Row-stochastic transition matrix over `n_states` health states, stored row-major.
///
/// Row `i` holds the probabilities of moving from state `i` to every state in one
/// cycle. Stochasticity is not enforced; use [`TransitionMatrix::is_row_stochastic`]
/// to check it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    n_states: usize,
    data: Vec<f64>,
    state_names: Option<Vec<String>>,
}

impl TransitionMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_states = rows.len();
        if n_states == 0 {
            return Err(CeaError::EmptyInput {
                context: "transition matrix has no rows".to_string(),
            });
        }

        let mut data = Vec::with_capacity(n_states * n_states);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_states {
                return Err(CeaError::DimensionMismatch {
                    context: format!("transition matrix row {}", i),
                    expected: n_states,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }

        Ok(Self {
            n_states,
            data,
            state_names: None,
        })
    }

    pub fn from_row_major(n_states: usize, data: Vec<f64>) -> Result<Self> {
        if n_states == 0 {
            return Err(CeaError::EmptyInput {
                context: "transition matrix has no states".to_string(),
            });
        }
        if data.len() != n_states * n_states {
            return Err(CeaError::DimensionMismatch {
                context: "row-major transition matrix data".to_string(),
                expected: n_states * n_states,
                actual: data.len(),
            });
        }
        Ok(Self {
            n_states,
            data,
            state_names: None,
        })
    }

    pub fn identity(n_states: usize) -> Result<Self> {
        let mut data = vec![0.0; n_states * n_states];
        for i in 0..n_states {
            data[i * n_states + i] = 1.0;
        }
        Self::from_row_major(n_states, data)
    }

    pub fn with_state_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.n_states {
            return Err(CeaError::DimensionMismatch {
                context: "transition matrix state names".to_string(),
                expected: self.n_states,
                actual: names.len(),
            });
        }
        self.state_names = Some(names);
        Ok(self)
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn state_names(&self) -> Option<&[String]> {
        self.state_names.as_deref()
    }

    pub fn row(&self, origin: usize) -> Option<&[f64]> {
        if origin >= self.n_states {
            return None;
        }
        let start = origin * self.n_states;
        Some(&self.data[start..start + self.n_states])
    }

    pub fn get(&self, origin: usize, destination: usize) -> Option<f64> {
        self.row(origin).and_then(|row| row.get(destination).copied())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_states)
    }

    /// `sum(row) - 1` for every row.
    pub fn row_sum_deviations(&self) -> Vec<f64> {
        self.rows()
            .map(|row| row.iter().sum::<f64>() - 1.0)
            .collect()
    }

    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        self.data.iter().all(|p| p.is_finite() && *p >= 0.0)
            && self
                .row_sum_deviations()
                .iter()
                .all(|d| d.abs() <= tolerance)
    }
}

/// Occupancy of every health state at cycles `0..=n_cycles`. Rows are time, columns
/// are states.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovTrace {
    n_states: usize,
    data: Vec<f64>,
    state_names: Option<Vec<String>>,
}

impl MarkovTrace {
    pub(crate) fn from_parts(
        n_states: usize,
        data: Vec<f64>,
        state_names: Option<Vec<String>>,
    ) -> Self {
        debug_assert!(n_states > 0 && data.len() % n_states == 0);
        Self {
            n_states,
            data,
            state_names,
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of simulated cycles; the trace holds `n_cycles() + 1` rows.
    pub fn n_cycles(&self) -> usize {
        self.data.len() / self.n_states - 1
    }

    pub fn state_names(&self) -> Option<&[String]> {
        self.state_names.as_deref()
    }

    /// 欄位名稱，未命名時使用 `state_<i>`
    pub fn column_labels(&self) -> Vec<String> {
        match &self.state_names {
            Some(names) => names.clone(),
            None => (0..self.n_states).map(|i| format!("state_{}", i)).collect(),
        }
    }

    pub fn row(&self, cycle: usize) -> Option<&[f64]> {
        let start = cycle.checked_mul(self.n_states)?;
        let end = start.checked_add(self.n_states)?;
        self.data.get(start..end)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_states)
    }

    pub fn first(&self) -> &[f64] {
        &self.data[..self.n_states]
    }

    pub fn last(&self) -> &[f64] {
        &self.data[self.data.len() - self.n_states..]
    }

    pub fn column(&self, state: usize) -> Option<Vec<f64>> {
        if state >= self.n_states {
            return None;
        }
        Some(self.rows().map(|row| row[state]).collect())
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.rows().map(|row| row.iter().sum()).collect()
    }

    /// Per-cycle dot product of occupancy with `weights` (one weight per state).
    pub fn weighted(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.n_states {
            return Err(CeaError::DimensionMismatch {
                context: "state weights".to_string(),
                expected: self.n_states,
                actual: weights.len(),
            });
        }
        Ok(self
            .rows()
            .map(|row| row.iter().zip(weights).map(|(x, w)| x * w).sum())
            .collect())
    }
}

/// 一個治療策略：轉移矩陣加上每個狀態的成本與效用
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub transitions: TransitionMatrix,
    pub state_costs: Vec<f64>,
    pub state_utilities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedStrategy {
    pub strategy: String,
    pub trace: MarkovTrace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: String,
    pub times: Vec<f64>,
    pub cycle_costs: Vec<f64>,
    pub cycle_qalys: Vec<f64>,
    pub discounted_costs: Vec<f64>,
    pub discounted_qalys: Vec<f64>,
    pub total_costs: f64,
    pub total_qalys: f64,
    pub undiscounted_costs: f64,
    pub undiscounted_qalys: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dominance {
    /// Cheaper or equal cost with at least as many QALYs.
    Dominant,
    Dominated,
    Tradeoff,
    Equivalent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalResult {
    pub reference: String,
    pub comparator: String,
    pub incremental_costs: f64,
    pub incremental_qalys: f64,
    pub icer: Option<f64>,
    pub status: Dominance,
    pub willingness_to_pay: f64,
    pub incremental_net_benefit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub simulations: Vec<SimulatedStrategy>,
    pub outcomes: Vec<StrategyOutcome>,
    pub incremental: Vec<IncrementalResult>,
}
