//! Discounting, escalation, capex, NPV and payback arithmetic.

use super::types::SimulationConfig;

/// Decimal places kept in externally reported figures.
pub const REPORT_DECIMALS: i32 = 2;

/// Rounds to [`REPORT_DECIMALS`] places.
pub fn round2(value: f64) -> f64 {
    let scale = 10f64.powi(REPORT_DECIMALS);
    (value * scale).round() / scale
}

/// Present-value factor `1 / (1 + rate)^year`.
pub fn discount_factor(rate: f64, year: u32) -> f64 {
    1.0 / (1.0 + rate).powi(year as i32)
}

/// Compound escalation `(1 + rate)^year`.
pub fn escalation(rate: f64, year: u32) -> f64 {
    (1.0 + rate).powi(year as i32)
}

/// Upfront investment for a PV/battery pair.
pub fn capex(pv_kwp: f64, bess_kwh: f64, cfg: &SimulationConfig) -> f64 {
    pv_kwp * cfg.pv_unit_cost + bess_kwh * cfg.bess_unit_cost
}

/// NPV from capex and the discounted net savings of every year.
pub fn npv(capex: f64, discounted_savings: &[f64]) -> f64 {
    -capex + discounted_savings.iter().sum::<f64>()
}

/// Fractional year at which cumulative discounted savings first reach `capex`.
///
/// Within the crossing year the fraction is interpolated linearly from the
/// previous cumulative total and clamped to `[0, 1]`. Years with
/// non-positive savings never count as the crossing year. Returns `None`
/// when the horizon ends first.
///
/// ```
/// use offgrid_sizer::sim::finance::payback_year;
///
/// assert_eq!(payback_year(250.0, &[100.0, 100.0, 100.0]), Some(2.5));
/// assert_eq!(payback_year(500.0, &[100.0, 100.0, 100.0]), None);
/// ```
pub fn payback_year(capex: f64, discounted_savings: &[f64]) -> Option<f64> {
    let mut cumulative = 0.0;
    for (idx, &annual) in discounted_savings.iter().enumerate() {
        let previous = cumulative;
        cumulative += annual;
        if cumulative >= capex && annual > 0.0 {
            let frac = ((capex - previous) / annual).clamp(0.0, 1.0);
            return Some(idx as f64 + frac);
        }
    }
    None
}

/// Money flows of one simulated year, full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearCashFlow {
    pub fuel_cost_hybrid: f64,
    pub fuel_cost_genonly: f64,
    pub fuel_savings: f64,
    pub opex_pv_bess: f64,
    pub opex_generator: f64,
    pub gross_savings: f64,
    pub discounted_savings: f64,
}

impl YearCashFlow {
    /// Prices one year's operation against the generator-only baseline.
    ///
    /// Fuel is priced at the year's inflated diesel price. The generator O&M
    /// term credits a CPI-escalated cost for every load hour the generator
    /// stood idle; the PV and battery O&M sums are CPI-escalated and charged.
    pub fn compute(
        cfg: &SimulationConfig,
        year: u32,
        fuel_hybrid_l: f64,
        fuel_genonly_l: f64,
        load_hours: u32,
        generator_hours: u32,
    ) -> Self {
        let diesel_price = cfg.diesel_price_per_l * escalation(cfg.diesel_inflation, year);
        let cpi = escalation(cfg.cpi, year);

        let fuel_cost_hybrid = fuel_hybrid_l * diesel_price;
        let fuel_cost_genonly = fuel_genonly_l * diesel_price;
        let fuel_savings = fuel_cost_genonly - fuel_cost_hybrid;

        let idle_hours = f64::from(load_hours.saturating_sub(generator_hours));
        let opex_generator = cfg.idle_hour_cost * idle_hours * cpi;
        let opex_pv_bess = (cfg.pv_om_per_year + cfg.bess_om_per_year) * cpi;

        let gross_savings = fuel_savings - opex_pv_bess + opex_generator;
        Self {
            fuel_cost_hybrid,
            fuel_cost_genonly,
            fuel_savings,
            opex_pv_bess,
            opex_generator,
            gross_savings,
            discounted_savings: gross_savings * cfg.discount_factor(year),
        }
    }
}
