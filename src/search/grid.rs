//! Coarse-to-fine grid search over PV and battery sizes.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::GridSearchConfig;
use crate::error::{SizingError, SizingResult};
use crate::profile::HourlyProfile;
use crate::sim::{SimulationConfig, simulate};

use super::{CandidateRow, CapacitySearchResult, best_feasible, evaluate_candidate};

/// `n` evenly spaced values from `min` to `max` inclusive.
///
/// A single point sits at `min`.
///
/// ```
/// use offgrid_sizer::search::grid::linspace;
///
/// assert_eq!(linspace(0.0, 10.0, 3), vec![0.0, 5.0, 10.0]);
/// assert_eq!(linspace(4.0, 10.0, 1), vec![4.0]);
/// ```
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Window of refinement round `step` (0-based) around `center`.
///
/// The half-span is `(hi - lo) × factor / 2^(step + 1)` and the window is
/// clamped to `[lo, hi]`.
pub fn refine_window(center: f64, lo: f64, hi: f64, factor: f64, step: usize) -> (f64, f64) {
    let half_span = (hi - lo) * factor / 2f64.powi(step as i32 + 1);
    ((center - half_span).max(lo), (center + half_span).min(hi))
}

fn check_grid(grid: &GridSearchConfig) -> SizingResult<()> {
    let bad = |msg: &str| Err(SizingError::InvalidSearch(msg.to_string()));
    if !(grid.pv_min.is_finite() && grid.pv_max.is_finite() && grid.pv_min >= 0.0) {
        return bad("pv range must be finite and non-negative");
    }
    if !(grid.bess_min.is_finite() && grid.bess_max.is_finite() && grid.bess_min >= 0.0) {
        return bad("bess range must be finite and non-negative");
    }
    if grid.pv_min > grid.pv_max || grid.bess_min > grid.bess_max {
        return bad("range minimum exceeds maximum");
    }
    if grid.pv_points == 0 || grid.bess_points == 0 {
        return bad("grid needs at least one point per axis");
    }
    if !(grid.refine_factor.is_finite() && grid.refine_factor > 0.0) {
        return bad("refine_factor must be > 0");
    }
    Ok(())
}

fn pairs(pv: &[f64], bess: &[f64]) -> Vec<(f64, f64)> {
    pv.iter()
        .flat_map(|&p| bess.iter().map(move |&b| (p, b)))
        .collect()
}

/// Evaluates one round of candidates; rows come back in input order.
fn evaluate_round(
    candidates: &[(f64, f64)],
    round: usize,
    profile: &HourlyProfile,
    config: &SimulationConfig,
    parallel: bool,
) -> SizingResult<Vec<CandidateRow>> {
    if parallel {
        candidates
            .par_iter()
            .map(|&(pv, bess)| evaluate_candidate(pv, bess, round, profile, config))
            .collect()
    } else {
        candidates
            .iter()
            .map(|&(pv, bess)| evaluate_candidate(pv, bess, round, profile, config))
            .collect()
    }
}

/// Runs the grid refinement search.
///
/// The coarse pass spans the configured ranges; each refinement round
/// re-grids a shrinking window around the incumbent and folds its rows into
/// the table. The incumbent is the feasible row with maximum NPV, earliest
/// row first on ties, so results do not depend on thread scheduling. The
/// winner is simulated once more with `capture_day` to attach full detail.
///
/// # Errors
///
/// Returns [`SizingError::InvalidSearch`] for unusable grid parameters or a
/// thread pool that cannot be built, and any non-candidate simulation error.
pub fn grid_search(
    profile: &HourlyProfile,
    config: &SimulationConfig,
    grid: &GridSearchConfig,
    capture_day: Option<u32>,
) -> SizingResult<CapacitySearchResult> {
    check_grid(grid)?;

    if grid.parallel && grid.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(grid.threads)
            .build()
            .map_err(|e| SizingError::InvalidSearch(format!("thread pool: {e}")))?;
        pool.install(|| run_rounds(profile, config, grid, capture_day))
    } else {
        run_rounds(profile, config, grid, capture_day)
    }
}

fn run_rounds(
    profile: &HourlyProfile,
    config: &SimulationConfig,
    grid: &GridSearchConfig,
    capture_day: Option<u32>,
) -> SizingResult<CapacitySearchResult> {
    let coarse = pairs(
        &linspace(grid.pv_min, grid.pv_max, grid.pv_points),
        &linspace(grid.bess_min, grid.bess_max, grid.bess_points),
    );
    let mut table = evaluate_round(&coarse, 0, profile, config, grid.parallel)?;
    let mut incumbent = best_feasible(&table);
    info!(
        candidates = table.len(),
        best_npv = incumbent.and_then(|i| table[i].npv),
        "coarse grid evaluated"
    );

    for step in 0..grid.refine_steps {
        let Some(idx) = incumbent else {
            break;
        };
        let (pv0, bess0) = (table[idx].pv_kwp, table[idx].bess_kwh);
        let (pv_lo, pv_hi) =
            refine_window(pv0, grid.pv_min, grid.pv_max, grid.refine_factor, step);
        let (bess_lo, bess_hi) =
            refine_window(bess0, grid.bess_min, grid.bess_max, grid.refine_factor, step);
        debug!(step, pv_lo, pv_hi, bess_lo, bess_hi, "refinement window");

        let fine = pairs(
            &linspace(pv_lo, pv_hi, grid.pv_points),
            &linspace(bess_lo, bess_hi, grid.bess_points),
        );
        let rows = evaluate_round(&fine, step + 1, profile, config, grid.parallel)?;
        table.extend(rows);
        incumbent = best_feasible(&table);
        info!(
            round = step + 1,
            candidates = table.len(),
            best_npv = incumbent.and_then(|i| table[i].npv),
            "refinement round evaluated"
        );
    }

    let Some(idx) = incumbent else {
        info!(candidates = table.len(), "no feasible candidate");
        return Ok(CapacitySearchResult {
            best: None,
            candidates: table,
        });
    };

    let best = simulate(
        table[idx].pv_kwp,
        table[idx].bess_kwh,
        profile,
        config,
        capture_day,
    )?;
    info!(
        pv_kwp = best.pv_kwp,
        bess_kwh = best.bess_kwh,
        npv = best.npv,
        "grid search selected candidate"
    );
    Ok(CapacitySearchResult {
        best: Some(best),
        candidates: table,
    })
}
