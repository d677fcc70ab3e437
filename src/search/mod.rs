//! Capacity searches over (PV, battery) pairs.
//!
//! Both searches evaluate candidates with [`simulate`](crate::sim::simulate)
//! and report a [`CapacitySearchResult`]. A candidate whose sizing makes the
//! simulation fail (an undersized generator) is kept in the candidate table
//! as infeasible instead of aborting the search.

pub mod exact;
pub mod grid;

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SizingResult;
use crate::profile::HourlyProfile;
use crate::sim::{SimulationConfig, SimulationResult, simulate};

pub use exact::exact_select;
pub use grid::grid_search;

/// One evaluated candidate, flattened for tables and CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub pv_kwp: f64,
    pub bess_kwh: f64,
    /// Search round that produced the row (0 is the coarse pass).
    pub round: usize,
    pub feasible: bool,
    pub capex: Option<f64>,
    pub npv: Option<f64>,
    pub payback_year: Option<f64>,
    /// Why the candidate was rejected, if it was.
    pub rejection: Option<String>,
}

impl CandidateRow {
    fn from_result(result: &SimulationResult, round: usize) -> Self {
        Self {
            pv_kwp: result.pv_kwp,
            bess_kwh: result.bess_kwh,
            round,
            feasible: result.feasible,
            capex: Some(result.capex),
            npv: Some(result.npv),
            payback_year: result.payback_year,
            rejection: None,
        }
    }

    fn rejected(pv_kwp: f64, bess_kwh: f64, round: usize, reason: String) -> Self {
        Self {
            pv_kwp,
            bess_kwh,
            round,
            feasible: false,
            capex: None,
            npv: None,
            payback_year: None,
            rejection: Some(reason),
        }
    }

    /// NPV if the candidate is feasible.
    pub fn feasible_npv(&self) -> Option<f64> {
        if self.feasible { self.npv } else { None }
    }
}

impl fmt::Display for CandidateRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.npv, &self.rejection) {
            (Some(npv), _) => write!(
                f,
                "PV {:>8.2} kWp  BESS {:>8.2} kWh  NPV {:>16.2}  round {}",
                self.pv_kwp, self.bess_kwh, npv, self.round
            ),
            (None, reason) => write!(
                f,
                "PV {:>8.2} kWp  BESS {:>8.2} kWh  rejected: {}",
                self.pv_kwp,
                self.bess_kwh,
                reason.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// Outcome of a capacity search.
///
/// `best` is `None` when no feasible candidate exists; callers must check
/// before reading the selected pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapacitySearchResult {
    /// Full detail of the selected candidate.
    pub best: Option<SimulationResult>,
    /// Every candidate evaluated, in evaluation order.
    pub candidates: Vec<CandidateRow>,
}

impl CapacitySearchResult {
    /// Selected (PV kWp, battery kWh) pair.
    pub fn best_pair(&self) -> Option<(f64, f64)> {
        self.best.as_ref().map(|b| (b.pv_kwp, b.bess_kwh))
    }

    pub fn is_solved(&self) -> bool {
        self.best.is_some()
    }

    pub fn feasible_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.feasible).count()
    }
}

/// Simulates one candidate and flattens it into a table row.
///
/// Candidate-specific sizing errors become an infeasible row; errors in the
/// shared inputs are returned.
pub(crate) fn evaluate_candidate(
    pv_kwp: f64,
    bess_kwh: f64,
    round: usize,
    profile: &HourlyProfile,
    config: &SimulationConfig,
) -> SizingResult<CandidateRow> {
    match simulate(pv_kwp, bess_kwh, profile, config, None) {
        Ok(result) => {
            debug!(pv_kwp, bess_kwh, round, npv = result.npv, "candidate evaluated");
            Ok(CandidateRow::from_result(&result, round))
        }
        Err(e) if e.is_candidate_specific() => {
            warn!(pv_kwp, bess_kwh, error = %e, "candidate rejected");
            Ok(CandidateRow::rejected(pv_kwp, bess_kwh, round, e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Index of the feasible row with the highest NPV; the first wins ties.
pub(crate) fn best_feasible(rows: &[CandidateRow]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, row) in rows.iter().enumerate() {
        if let Some(npv) = row.feasible_npv() {
            match best {
                Some((_, incumbent)) if npv <= incumbent => {}
                _ => best = Some((idx, npv)),
            }
        }
    }
    best.map(|(idx, _)| idx)
}
