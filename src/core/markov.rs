//! Cohort Markov trace simulation.
//!
//! The trace is built by repeated left-multiplication of the occupancy row vector by
//! the transition matrix, `x_{t+1} = x_t · P`. Matrices are used exactly as given:
//! rows that do not sum to 1 are not renormalized, so a malformed matrix produces a
//! trace whose rows drift away from 1. Callers that need the guarantee should check
//! [`TransitionMatrix::is_row_stochastic`] first.

use crate::domain::model::{MarkovTrace, TransitionMatrix};
use crate::utils::error::{CeaError, Result};

/// Simulate `n_cycles` cycles of a time-homogeneous cohort model.
///
/// Returns `n_cycles + 1` rows; row 0 is `initial` unchanged.
pub fn sim_markov_chain(
    initial: &[f64],
    transitions: &TransitionMatrix,
    n_cycles: usize,
) -> Result<MarkovTrace> {
    check_dimensions(initial, transitions, "initial occupancy vector")?;

    let trace = run(initial, n_cycles, move |_| transitions);
    tracing::debug!(
        "Simulated {} cycles over {} states",
        n_cycles,
        transitions.n_states()
    );
    Ok(MarkovTrace::from_parts(
        transitions.n_states(),
        trace,
        transitions.state_names().map(|names| names.to_vec()),
    ))
}

/// Simulate a cohort whose transition probabilities change over time.
///
/// The step into cycle `t` (1-based) uses `schedule[t - 1]`; once the schedule runs
/// out the last matrix is reused. State names come from the first matrix.
pub fn sim_markov_chain_time_varying(
    initial: &[f64],
    schedule: &[TransitionMatrix],
    n_cycles: usize,
) -> Result<MarkovTrace> {
    let first = schedule.first().ok_or_else(|| CeaError::EmptyInput {
        context: "transition matrix schedule is empty".to_string(),
    })?;

    for (cycle, matrix) in schedule.iter().enumerate() {
        check_dimensions(
            initial,
            matrix,
            &format!("transition matrix for cycle {}", cycle + 1),
        )?;
    }

    let last = schedule.len() - 1;
    let trace = run(initial, n_cycles, move |step| &schedule[step.min(last)]);
    tracing::debug!(
        "Simulated {} cycles over {} states with {} transition matrices",
        n_cycles,
        first.n_states(),
        schedule.len()
    );
    Ok(MarkovTrace::from_parts(
        first.n_states(),
        trace,
        first.state_names().map(|names| names.to_vec()),
    ))
}

fn check_dimensions(initial: &[f64], transitions: &TransitionMatrix, context: &str) -> Result<()> {
    if initial.len() != transitions.n_states() {
        return Err(CeaError::DimensionMismatch {
            context: context.to_string(),
            expected: transitions.n_states(),
            actual: initial.len(),
        });
    }
    Ok(())
}

fn run<'a, F>(initial: &[f64], n_cycles: usize, matrix_for_step: F) -> Vec<f64>
where
    F: Fn(usize) -> &'a TransitionMatrix,
{
    let n_states = initial.len();
    let mut data = Vec::with_capacity(n_states * (n_cycles + 1));
    data.extend_from_slice(initial);

    for step in 0..n_cycles {
        let offset = step * n_states;
        let mut next = vec![0.0; n_states];
        advance(&data[offset..offset + n_states], matrix_for_step(step), &mut next);
        tracing::trace!("cycle {}: {:?}", step + 1, next);
        data.extend_from_slice(&next);
    }

    data
}

/// `next = current · transitions`
fn advance(current: &[f64], transitions: &TransitionMatrix, next: &mut [f64]) {
    for (occupancy, row) in current.iter().zip(transitions.rows()) {
        for (dest, p) in next.iter_mut().zip(row) {
            *dest += occupancy * p;
        }
    }
}
