//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use offgrid_sizer::config::{ProfileConfig, ScenarioConfig};
use offgrid_sizer::profile::{HOURS_PER_YEAR, HourlyProfile};
use offgrid_sizer::sim::SimulationConfig;

/// Baseline scenario shortened to `years`, keeping the reference derating curve.
pub fn scenario(years: u32) -> ScenarioConfig {
    let mut s = ScenarioConfig::baseline();
    s.project.years = years;
    s
}

/// Scenario with every cost index, O&M term and discount switched off, so
/// yearly savings are pure fuel savings at a constant price.
pub fn flat_economics(years: u32) -> ScenarioConfig {
    let mut s = scenario(years);
    s.project.discount_rate = 0.0;
    s.project.cpi = 0.0;
    s.generator.diesel_inflation = 0.0;
    s.generator.idle_hour_cost = 0.0;
    s.pv.om_per_year = 0.0;
    s.battery.om_per_year = 0.0;
    s.pv.degradation_rate = 0.0;
    s.battery.capacity_factors.clear();
    s
}

pub fn sim_config(scenario: &ScenarioConfig) -> SimulationConfig {
    SimulationConfig::from_scenario(scenario).expect("scenario should resolve")
}

/// Two synthetic weeks: noisy midday sun and an evening-peaking load.
pub fn two_week_profile() -> HourlyProfile {
    HourlyProfile::synthetic(&ProfileConfig {
        hours: 24 * 14,
        ..ProfileConfig::default()
    })
}

/// One synthetic year with the default site parameters.
pub fn full_year_profile() -> HourlyProfile {
    HourlyProfile::synthetic(&ProfileConfig::default())
}

/// 8760 hours without sun and a flat load of `load_kwh` per hour.
pub fn no_sun_profile(load_kwh: f64) -> HourlyProfile {
    HourlyProfile::new(vec![0.0; HOURS_PER_YEAR], vec![load_kwh; HOURS_PER_YEAR])
        .expect("flat profile is valid")
}

/// `days` identical days with a flat `sun` yield and `load_kwh` every hour.
pub fn constant_profile(days: usize, sun: f64, load_kwh: f64) -> HourlyProfile {
    HourlyProfile::new(vec![sun; 24 * days], vec![load_kwh; 24 * days])
        .expect("constant profile is valid")
}
