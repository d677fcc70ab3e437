//! Exact selection over discrete PV and battery option sets.
//!
//! Every combination is simulated up front, then a 0/1 program with one
//! binary indicator per feasible combination picks exactly one of them to
//! maximise NPV.

use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, microlp, variable,
};
use tracing::{debug, info, warn};

use crate::error::{SizingError, SizingResult};
use crate::profile::HourlyProfile;
use crate::sim::{SimulationConfig, simulate};

use super::{CapacitySearchResult, evaluate_candidate};

/// Indicator values above this count as selected.
const SELECTED: f64 = 0.5;

/// Picks the NPV-maximising pair from `pv_options × bess_options`.
///
/// Returns a result with `best == None` when either option set is empty or
/// no combination is feasible. The chosen pair is simulated again with
/// `capture_day` for full detail.
///
/// # Errors
///
/// Returns [`SizingError::Solver`] if the selection program cannot be solved,
/// and any non-candidate simulation error.
pub fn exact_select(
    profile: &HourlyProfile,
    config: &SimulationConfig,
    pv_options: &[f64],
    bess_options: &[f64],
    capture_day: Option<u32>,
) -> SizingResult<CapacitySearchResult> {
    let mut table = Vec::with_capacity(pv_options.len() * bess_options.len());
    for &pv in pv_options {
        for &bess in bess_options {
            table.push(evaluate_candidate(pv, bess, 0, profile, config)?);
        }
    }

    let feasible: Vec<(usize, f64)> = table
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.feasible_npv().map(|npv| (i, npv)))
        .collect();
    if feasible.is_empty() {
        info!(candidates = table.len(), "no feasible option pair");
        return Ok(CapacitySearchResult {
            best: None,
            candidates: table,
        });
    }

    let chosen = select_one(&feasible.iter().map(|&(_, npv)| npv).collect::<Vec<_>>())?;
    let row = &table[feasible[chosen].0];
    debug!(pv_kwp = row.pv_kwp, bess_kwh = row.bess_kwh, "selection program solved");

    let best = simulate(row.pv_kwp, row.bess_kwh, profile, config, capture_day)?;
    info!(
        pv_kwp = best.pv_kwp,
        bess_kwh = best.bess_kwh,
        npv = best.npv,
        "exact selector chose candidate"
    );
    Ok(CapacitySearchResult {
        best: Some(best),
        candidates: table,
    })
}

/// Solves `max Σ c_i y_i  s.t.  Σ y_i = 1,  y_i ∈ {0, 1}` and returns the
/// index with `y_i = 1`.
///
/// Coefficients are `(npv_i - max) / range`, so the optimum sits at 0 and
/// the gaps keep their size relative to the NPV spread. The solver's pick is
/// then confirmed against the exact NPVs; the first exact maximum wins ties.
fn select_one(npvs: &[f64]) -> SizingResult<usize> {
    let max = npvs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = npvs.iter().copied().fold(f64::INFINITY, f64::min);
    let range = (max - min).max(1.0);

    let mut vars = ProblemVariables::new();
    let picks: Vec<Variable> = npvs.iter().map(|_| vars.add(variable().binary())).collect();

    let objective: Expression = picks
        .iter()
        .zip(npvs)
        .map(|(&y, &npv)| ((npv - max) / range) * y)
        .sum();
    let chosen: Expression = picks.iter().map(|&y| Expression::from(y)).sum();

    let solution = vars
        .maximise(objective)
        .using(microlp)
        .with(constraint!(chosen == 1.0))
        .solve()
        .map_err(|e| SizingError::Solver(e.to_string()))?;

    let picked = picks
        .iter()
        .position(|&y| solution.value(y) > SELECTED)
        .ok_or_else(|| SizingError::Solver("no option pair selected".to_string()))?;

    // solver tolerances can hide sub-unit gaps between large NPVs
    let exact = npvs
        .iter()
        .position(|&npv| npv == max)
        .ok_or_else(|| SizingError::Solver("no finite NPV to select".to_string()))?;
    if npvs[picked] < max {
        warn!(
            picked,
            exact,
            gap = max - npvs[picked],
            "selection program missed the exact maximum"
        );
    }
    Ok(exact)
}
