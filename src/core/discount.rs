//! Present-value discounting.

use crate::utils::error::{CeaError, Result};
use serde::{Deserialize, Serialize};

/// When, within a cycle, costs and outcomes are assumed to accrue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    /// Cycle `t` is discounted at time `t - 1`.
    Start,
    /// Cycle `t` is discounted at time `t - 0.5` (half-cycle convention).
    Mid,
    /// Cycle `t` is discounted at time `t`.
    #[default]
    End,
}

/// Discount each value by `(1 + rate)^t` for its matching time index.
///
/// `values` and `times` must be the same length; nothing is summed.
pub fn pv(values: &[f64], rate: f64, times: &[f64]) -> Result<Vec<f64>> {
    check_lengths(values, times)?;
    Ok(values
        .iter()
        .zip(times)
        .map(|(v, t)| v / (1.0 + rate).powf(*t))
        .collect())
}

/// Sum of [`pv`].
pub fn pv_sum(values: &[f64], rate: f64, times: &[f64]) -> Result<f64> {
    Ok(pv(values, rate, times)?.iter().sum())
}

/// `1 / (1 + rate)^t` for every time index.
pub fn discount_factors(rate: f64, times: &[f64]) -> Vec<f64> {
    times.iter().map(|t| 1.0 / (1.0 + rate).powf(*t)).collect()
}

/// Time indices for cycles `1..=n_cycles` under the given timing convention.
pub fn cycle_times(n_cycles: usize, timing: Timing) -> Vec<f64> {
    let offset = match timing {
        Timing::Start => 1.0,
        Timing::Mid => 0.5,
        Timing::End => 0.0,
    };
    (1..=n_cycles).map(|t| t as f64 - offset).collect()
}

fn check_lengths(values: &[f64], times: &[f64]) -> Result<()> {
    if values.len() != times.len() {
        return Err(CeaError::LengthMismatch {
            values: values.len(),
            times: times.len(),
        });
    }
    Ok(())
}
