//! Core simulation types: resolved configuration, hourly dispatch records,
//! yearly aggregates and the per-candidate result.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::config::ScenarioConfig;
use crate::devices::{Battery, DieselGenerator, FuelCurve};
use crate::error::{SizingError, SizingResult};

use super::finance;

/// Number of hourly entries in a capture window.
pub const CAPTURE_HOURS: usize = 24;

/// Battery capacity-derating factors resolved per simulated year.
///
/// Built from a list indexed by year number where index 0 is ignored.
/// An empty list means no derating.
///
/// # Examples
///
/// ```
/// use offgrid_sizer::sim::types::CapacityFactors;
///
/// let f = CapacityFactors::from_indexed(&[1.0, 0.95, 0.9], 2).unwrap();
/// assert_eq!(f.for_year(1), 0.95);
/// assert_eq!(f.for_year(2), 0.9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFactors {
    by_year: Vec<f64>,
}

impl CapacityFactors {
    /// No derating over `years` years.
    pub fn uniform(years: u32) -> Self {
        Self {
            by_year: vec![1.0; years as usize],
        }
    }

    /// Resolves a year-indexed list for a horizon of `years` years.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::CapacityFactorsTooShort`] if a non-empty list
    /// has fewer than `years + 1` entries.
    pub fn from_indexed(list: &[f64], years: u32) -> SizingResult<Self> {
        if list.is_empty() {
            return Ok(Self::uniform(years));
        }
        let needed = years as usize + 1;
        if list.len() < needed {
            return Err(SizingError::CapacityFactorsTooShort {
                needed,
                got: list.len(),
            });
        }
        if list.len() > needed {
            warn!(
                entries = list.len(),
                years, "capacity factor list is longer than the horizon; extra entries ignored"
            );
        }
        Ok(Self {
            by_year: list[1..needed].to_vec(),
        })
    }

    /// Derating factor of `year` (1-based).
    ///
    /// # Panics
    ///
    /// Panics if `year` is 0 or beyond the horizon.
    pub fn for_year(&self, year: u32) -> f64 {
        assert!(year >= 1, "years are 1-based");
        self.by_year[year as usize - 1]
    }

    pub fn years(&self) -> u32 {
        self.by_year.len() as u32
    }
}

/// Immutable parameters of one simulation run.
///
/// Built once from a validated [`ScenarioConfig`] and shared by every
/// candidate a search evaluates.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Horizon length in years.
    pub years: u32,
    /// Annual discount rate.
    pub discount_rate: f64,
    /// Escalation index for O&M terms.
    pub cpi: f64,
    pub eta_charge: f64,
    pub eta_discharge: f64,
    pub depth_of_discharge: f64,
    /// Hourly charge limit as a fraction of nameplate.
    pub charge_rate: f64,
    /// Hourly discharge limit as a fraction of nameplate.
    pub discharge_rate: f64,
    /// Annual PV output degradation rate.
    pub pv_degradation_rate: f64,
    pub pv_unit_cost: f64,
    pub bess_unit_cost: f64,
    pub pv_om_per_year: f64,
    pub bess_om_per_year: f64,
    /// Diesel price per litre before inflation.
    pub diesel_price_per_l: f64,
    pub diesel_inflation: f64,
    /// Cost credited per load hour the generator stays off.
    pub idle_hour_cost: f64,
    pub generator: DieselGenerator,
    pub capacity_factors: CapacityFactors,
}

impl SimulationConfig {
    /// Validates a scenario and resolves it into simulation parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::Config`] with every failed constraint, or the
    /// fuel-curve and capacity-factor errors of the resolved parts.
    pub fn from_scenario(scenario: &ScenarioConfig) -> SizingResult<Self> {
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(SizingError::Config(errors));
        }

        let years = scenario.project.years;
        let curve = FuelCurve::new(scenario.generator.fuel_curve_lph)?;
        let capacity_factors =
            CapacityFactors::from_indexed(&scenario.battery.capacity_factors, years)?;

        Ok(Self {
            years,
            discount_rate: scenario.project.discount_rate,
            cpi: scenario.project.cpi,
            eta_charge: scenario.battery.eta_charge,
            eta_discharge: scenario.battery.eta_discharge,
            depth_of_discharge: scenario.battery.depth_of_discharge,
            charge_rate: scenario.battery.charge_rate,
            discharge_rate: scenario.battery.discharge_rate,
            pv_degradation_rate: scenario.pv.degradation_rate,
            pv_unit_cost: scenario.pv.unit_cost_per_kwp,
            bess_unit_cost: scenario.battery.unit_cost_per_kwh,
            pv_om_per_year: scenario.pv.om_per_year,
            bess_om_per_year: scenario.battery.om_per_year,
            diesel_price_per_l: scenario.generator.diesel_price_per_l,
            diesel_inflation: scenario.generator.diesel_inflation,
            idle_hour_cost: scenario.generator.idle_hour_cost,
            generator: DieselGenerator::new(scenario.generator.prime_kw, curve),
            capacity_factors,
        })
    }

    /// Lower SOC bound as a fraction of derated capacity.
    pub fn soc_min_frac(&self) -> f64 {
        (1.0 - self.depth_of_discharge) / 2.0
    }

    /// Upper SOC bound as a fraction of derated capacity.
    pub fn soc_max_frac(&self) -> f64 {
        1.0 - self.soc_min_frac()
    }

    /// PV output multiplier of `year`, `(1 - rate)^year`.
    pub fn pv_degradation(&self, year: u32) -> f64 {
        (1.0 - self.pv_degradation_rate).powi(year as i32)
    }

    pub fn capacity_factor(&self, year: u32) -> f64 {
        self.capacity_factors.for_year(year)
    }

    pub fn discount_factor(&self, year: u32) -> f64 {
        finance::discount_factor(self.discount_rate, year)
    }

    /// A battery of `bess_kwh` nameplate, resting at year 1's minimum SOC.
    pub fn battery(&self, bess_kwh: f64) -> Battery {
        Battery::new(
            bess_kwh,
            self.charge_rate,
            self.discharge_rate,
            self.eta_charge,
            self.eta_discharge,
            self.depth_of_discharge,
            self.capacity_factor(1),
        )
    }
}

/// Energy and fuel flows of one simulated hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourDispatch {
    /// Simulated year (1-based).
    pub year: u32,
    /// Hour index within the year.
    pub hour: usize,
    pub load_kwh: f64,
    /// PV energy available after degradation.
    pub pv_generation_kwh: f64,
    pub pv_to_load_kwh: f64,
    /// PV surplus taken in by the battery (input side).
    pub pv_to_battery_kwh: f64,
    /// PV surplus neither consumed nor stored.
    pub curtailed_kwh: f64,
    pub battery_to_load_kwh: f64,
    pub generator_kwh: f64,
    /// Fuel burned by the hybrid system.
    pub fuel_l: f64,
    /// Fuel a generator alone would burn for the whole load.
    pub genonly_fuel_l: f64,
    /// Stored energy at the end of the hour.
    pub soc_kwh: f64,
}

impl HourDispatch {
    /// Load left unserved by all three sources.
    pub fn unserved_kwh(&self) -> f64 {
        self.load_kwh - self.pv_to_load_kwh - self.battery_to_load_kwh - self.generator_kwh
    }
}

impl fmt::Display for HourDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "y={:>2} h={:>4} | load={:>7.2}  pv={:>7.2} (to load {:.2}, to bat {:.2}, \
             curtailed {:.2}) | bat={:.2}  gen={:.2}  fuel={:.2} L | SoC={:.2} kWh",
            self.year,
            self.hour,
            self.load_kwh,
            self.pv_generation_kwh,
            self.pv_to_load_kwh,
            self.pv_to_battery_kwh,
            self.curtailed_kwh,
            self.battery_to_load_kwh,
            self.generator_kwh,
            self.fuel_l,
            self.soc_kwh,
        )
    }
}

/// Totals and cash flows of one simulated year, rounded to cents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearlyAggregate {
    pub year: u32,
    pub load_kwh: f64,
    pub pv_generation_kwh: f64,
    pub served_by_pv_kwh: f64,
    pub served_by_battery_kwh: f64,
    pub served_by_generator_kwh: f64,
    pub fuel_hybrid_l: f64,
    pub fuel_genonly_l: f64,
    pub fuel_cost_hybrid: f64,
    pub fuel_cost_genonly: f64,
    pub fuel_savings: f64,
    /// PV surplus the battery could not absorb.
    pub charging_losses_kwh: f64,
    /// Stored energy at the end of the year.
    pub soc_end_kwh: f64,
    pub generator_hours: u32,
    /// Hours with non-zero load.
    pub load_hours: u32,
    pub opex_pv_bess: f64,
    pub opex_generator: f64,
    pub gross_savings: f64,
    pub discounted_savings: f64,
}

impl fmt::Display for YearlyAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>11.2} {:>11.2} {:>6} {:>16.2}",
            self.year,
            self.served_by_pv_kwh,
            self.served_by_battery_kwh,
            self.served_by_generator_kwh,
            self.charging_losses_kwh,
            self.fuel_hybrid_l,
            self.fuel_genonly_l,
            self.generator_hours,
            self.discounted_savings,
        )
    }
}

/// Hour-by-hour series of one captured day of year 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyCapture {
    /// Captured day of January (1-based).
    pub day: u32,
    pub load: Vec<f64>,
    pub from_pv: Vec<f64>,
    pub from_battery: Vec<f64>,
    pub from_generator: Vec<f64>,
    pub soc: Vec<f64>,
    pub pv_generation: Vec<f64>,
}

impl HourlyCapture {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            load: Vec::with_capacity(CAPTURE_HOURS),
            from_pv: Vec::with_capacity(CAPTURE_HOURS),
            from_battery: Vec::with_capacity(CAPTURE_HOURS),
            from_generator: Vec::with_capacity(CAPTURE_HOURS),
            soc: Vec::with_capacity(CAPTURE_HOURS),
            pv_generation: Vec::with_capacity(CAPTURE_HOURS),
        }
    }

    /// First and one-past-last hour index of the captured day.
    pub fn hour_range(&self) -> std::ops::Range<usize> {
        let start = (self.day as usize - 1) * CAPTURE_HOURS;
        start..start + CAPTURE_HOURS
    }

    pub fn push(&mut self, hour: &HourDispatch) {
        self.load.push(hour.load_kwh);
        self.from_pv.push(hour.pv_to_load_kwh);
        self.from_battery.push(hour.battery_to_load_kwh);
        self.from_generator.push(hour.generator_kwh);
        self.soc.push(hour.soc_kwh);
        self.pv_generation.push(hour.pv_generation_kwh);
    }

    pub fn len(&self) -> usize {
        self.load.len()
    }

    pub fn is_empty(&self) -> bool {
        self.load.is_empty()
    }
}

/// Outcome of simulating one (PV, battery) candidate over the horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub pv_kwp: f64,
    pub bess_kwh: f64,
    pub capex: f64,
    /// True whenever the simulation ran to completion.
    pub feasible: bool,
    pub npv: f64,
    /// Fractional year at which discounted savings repay capex.
    pub payback_year: Option<f64>,
    pub years: BTreeMap<u32, YearlyAggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_capture: Option<HourlyCapture>,
}

impl SimulationResult {
    pub fn year(&self, year: u32) -> Option<&YearlyAggregate> {
        self.years.get(&year)
    }

    /// Summed fuel burned by the hybrid system over the horizon.
    pub fn total_fuel_hybrid_l(&self) -> f64 {
        self.years.values().map(|y| y.fuel_hybrid_l).sum()
    }

    /// Summed fuel of the generator-only baseline over the horizon.
    pub fn total_fuel_genonly_l(&self) -> f64 {
        self.years.values().map(|y| y.fuel_genonly_l).sum()
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payback = self
            .payback_year
            .map_or_else(|| "never".to_string(), |p| format!("{p:.2} yr"));
        writeln!(f, "--- Candidate PV {:.2} kWp / BESS {:.2} kWh ---", self.pv_kwp, self.bess_kwh)?;
        writeln!(f, "CAPEX:    {:.2}", self.capex)?;
        writeln!(f, "NPV:      {:.2}", self.npv)?;
        writeln!(f, "Payback:  {payback}")?;
        writeln!(
            f,
            "{:>4} {:>12} {:>12} {:>12} {:>12} {:>11} {:>11} {:>6} {:>16}",
            "year", "pv kWh", "bess kWh", "gen kWh", "losses kWh", "fuel L", "gen-only L", "gen h",
            "disc. savings"
        )?;
        for year in self.years.values() {
            writeln!(f, "{year}")?;
        }
        Ok(())
    }
}
