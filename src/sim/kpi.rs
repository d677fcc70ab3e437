//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::SimulationResult;

/// Aggregate key performance indicators over the whole horizon.
///
/// Computed post-hoc from the yearly aggregates of a [`SimulationResult`] so
/// the reported metrics always agree with the per-year table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Total load over the horizon (kWh).
    pub total_load_kwh: f64,
    /// Load served by PV directly (kWh).
    pub served_by_pv_kwh: f64,
    /// Load served from storage (kWh).
    pub served_by_battery_kwh: f64,
    /// Load served by the generator (kWh).
    pub served_by_generator_kwh: f64,
    /// Share of load served by PV and storage (%).
    pub renewable_fraction_pct: f64,
    /// Fuel burned by the hybrid system (L).
    pub fuel_burned_l: f64,
    /// Fuel avoided relative to the generator-only baseline (L).
    pub fuel_avoided_l: f64,
    /// Share of PV generation lost to curtailment (%).
    pub curtailment_pct: f64,
    /// Energy delivered by the battery (kWh).
    pub battery_throughput_kwh: f64,
    /// Battery equivalent full cycles (throughput / nameplate).
    pub battery_equivalent_full_cycles: f64,
    /// Average generator run hours per year.
    pub mean_generator_hours: f64,
}

impl KpiReport {
    /// Computes all KPIs from a candidate's result.
    pub fn from_result(result: &SimulationResult) -> Self {
        if result.years.is_empty() {
            return Self::default();
        }

        let mut r = Self::default();
        let mut pv_generation = 0.0;
        let mut losses = 0.0;
        let mut generator_hours = 0.0;
        for y in result.years.values() {
            r.total_load_kwh += y.load_kwh;
            r.served_by_pv_kwh += y.served_by_pv_kwh;
            r.served_by_battery_kwh += y.served_by_battery_kwh;
            r.served_by_generator_kwh += y.served_by_generator_kwh;
            r.fuel_burned_l += y.fuel_hybrid_l;
            r.fuel_avoided_l += y.fuel_genonly_l - y.fuel_hybrid_l;
            pv_generation += y.pv_generation_kwh;
            losses += y.charging_losses_kwh;
            generator_hours += f64::from(y.generator_hours);
        }

        if r.total_load_kwh > 0.0 {
            r.renewable_fraction_pct =
                100.0 * (r.served_by_pv_kwh + r.served_by_battery_kwh) / r.total_load_kwh;
        }
        if pv_generation > 0.0 {
            r.curtailment_pct = 100.0 * losses / pv_generation;
        }
        r.battery_throughput_kwh = r.served_by_battery_kwh;
        if result.bess_kwh > 0.0 {
            r.battery_equivalent_full_cycles = r.battery_throughput_kwh / result.bess_kwh;
        }
        r.mean_generator_hours = generator_hours / result.years.len() as f64;
        r
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Load served:           {:.2} kWh", self.total_load_kwh)?;
        writeln!(
            f,
            "  by PV / BESS / gen:  {:.2} / {:.2} / {:.2} kWh",
            self.served_by_pv_kwh, self.served_by_battery_kwh, self.served_by_generator_kwh
        )?;
        writeln!(f, "Renewable fraction:    {:.1}%", self.renewable_fraction_pct)?;
        writeln!(
            f,
            "Fuel burned:           {:.2} L ({:.2} L avoided)",
            self.fuel_burned_l, self.fuel_avoided_l
        )?;
        writeln!(f, "PV curtailment:        {:.1}%", self.curtailment_pct)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh ({:.2} equiv. cycles)",
            self.battery_throughput_kwh, self.battery_equivalent_full_cycles
        )?;
        write!(f, "Generator hours/yr:    {:.1}", self.mean_generator_hours)
    }
}
