//! Integration tests for the hourly dispatch simulator and its yearly finance.

mod common;

use offgrid_sizer::config::ScenarioConfig;
use offgrid_sizer::devices::fuel_rate;
use offgrid_sizer::error::SizingError;
use offgrid_sizer::profile::HourlyProfile;
use offgrid_sizer::sim::{DispatchEngine, KpiReport, simulate};

const TOL: f64 = 1e-6;

#[test]
fn soc_stays_within_derated_window() {
    let scenario = common::scenario(3);
    let cfg = common::sim_config(&scenario);
    let profile = common::two_week_profile();
    let bess = 120.0;

    let mut violations = Vec::new();
    DispatchEngine::new(60.0, bess, &profile, &cfg)
        .run_with(None, |h| {
            let factor = cfg.capacity_factor(h.year);
            let lo = cfg.soc_min_frac() * bess * factor;
            let hi = cfg.soc_max_frac() * bess * factor;
            if h.soc_kwh < lo - 1e-9 || h.soc_kwh > hi + 1e-9 {
                violations.push((h.year, h.hour, h.soc_kwh));
            }
        })
        .expect("simulation should run");
    assert!(violations.is_empty(), "SOC out of bounds: {violations:?}");
}

#[test]
fn energy_is_conserved_every_hour() {
    let scenario = common::scenario(2);
    let cfg = common::sim_config(&scenario);
    let profile = common::full_year_profile();

    let mut hours = 0;
    DispatchEngine::new(80.0, 150.0, &profile, &cfg)
        .run_with(None, |h| {
            hours += 1;
            let served = h.pv_to_load_kwh + h.battery_to_load_kwh + h.generator_kwh;
            assert!(
                (served - h.load_kwh).abs() <= TOL,
                "hour {} of year {}: served {served} vs load {}",
                h.hour,
                h.year,
                h.load_kwh
            );
            assert!(served <= h.load_kwh + TOL);
            let pv_used = h.pv_to_load_kwh + h.pv_to_battery_kwh + h.curtailed_kwh;
            assert!((pv_used - h.pv_generation_kwh).abs() <= TOL);
        })
        .expect("simulation should run");
    assert_eq!(hours, 2 * 8760);
}

#[test]
fn diesel_only_site_runs_on_generator_alone() {
    let scenario = ScenarioConfig::diesel_only();
    let cfg = common::sim_config(&scenario);
    let profile = HourlyProfile::from_config(&scenario.profile).expect("synthetic profile");
    assert_eq!(profile.hours(), 8760);

    let result = simulate(0.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    let expected_fuel = fuel_rate(50.0, cfg.generator.curve()) * 8760.0;

    assert_eq!(result.years.len(), scenario.project.years as usize);
    for y in result.years.values() {
        assert_eq!(y.generator_hours, 8760);
        assert_eq!(y.served_by_pv_kwh, 0.0);
        assert_eq!(y.served_by_battery_kwh, 0.0);
        assert!((y.served_by_generator_kwh - 87_600.0).abs() < 0.01);
        assert!((y.fuel_hybrid_l - expected_fuel).abs() < 0.01);
        assert_eq!(y.fuel_hybrid_l, y.fuel_genonly_l);
        assert_eq!(y.fuel_savings, 0.0);
    }
    assert_eq!(result.capex, 0.0);
    assert_eq!(result.npv, 0.0);
}

#[test]
fn zero_size_candidate_has_no_pv_or_battery_energy() {
    let scenario = common::scenario(5);
    let cfg = common::sim_config(&scenario);
    let profile = common::two_week_profile();

    let result = simulate(0.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    assert_eq!(result.capex, 0.0);
    for y in result.years.values() {
        assert_eq!(y.pv_generation_kwh, 0.0);
        assert_eq!(y.served_by_pv_kwh, 0.0);
        assert_eq!(y.served_by_battery_kwh, 0.0);
        assert_eq!(y.soc_end_kwh, 0.0);
    }
    let savings: f64 = result.years.values().map(|y| y.discounted_savings).sum();
    assert!((result.npv - savings).abs() < 0.05);
}

#[test]
fn npv_equals_discounted_fuel_savings_without_generator_or_om() {
    let mut scenario = common::flat_economics(3);
    scenario.project.discount_rate = 0.08;
    let cfg = common::sim_config(&scenario);
    // PV covers the whole load every hour
    let profile = common::constant_profile(2, 1.0, 5.0);

    let result = simulate(10.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    let mut expected = -result.capex;
    for (&year, y) in &result.years {
        assert_eq!(y.generator_hours, 0);
        assert_eq!(y.served_by_generator_kwh, 0.0);
        assert!(y.fuel_savings > 0.0);
        expected += y.fuel_savings * cfg.discount_factor(year);
    }
    assert!(
        (result.npv - expected).abs() < 0.05,
        "npv {} vs {expected}",
        result.npv
    );
}

#[test]
fn payback_matches_capex_over_constant_savings() {
    let mut scenario = common::flat_economics(10);
    scenario.pv.unit_cost_per_kwp = 20_000.0;
    let cfg = common::sim_config(&scenario);
    // 16 kWh/h is half load on the 32 kW generator
    let profile = common::constant_profile(1, 1.0, 16.0);

    let result = simulate(20.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    let annual = result.year(1).expect("year 1").gross_savings;
    assert!(result.years.values().all(|y| y.gross_savings == annual));

    let payback = result.payback_year.expect("payback within horizon");
    assert!(
        (payback - result.capex / annual).abs() < 0.01,
        "payback {payback} vs {}",
        result.capex / annual
    );
}

#[test]
fn payback_absent_when_never_recovered() {
    let scenario = common::flat_economics(2);
    let cfg = common::sim_config(&scenario);
    let profile = common::constant_profile(1, 0.0, 5.0);
    let result = simulate(100.0, 100.0, &profile, &cfg, None).expect("simulation should run");
    assert!(result.npv < 0.0);
    assert_eq!(result.payback_year, None);
}

#[test]
fn undersized_generator_aborts_candidate() {
    let scenario = ScenarioConfig::diesel_only();
    let cfg = common::sim_config(&scenario);
    let profile = common::no_sun_profile(25.0);
    let err = simulate(50.0, 50.0, &profile, &cfg, None).expect_err("load exceeds rating");
    assert!(err.is_candidate_specific());
    assert!(matches!(err, SizingError::GeneratorUndersized { .. }));
}

#[test]
fn capture_has_24_entries_for_requested_day() {
    let scenario = common::scenario(1);
    let cfg = common::sim_config(&scenario);
    let profile = common::full_year_profile();

    let result = simulate(50.0, 100.0, &profile, &cfg, Some(15)).expect("simulation should run");
    let capture = result.hourly_capture.expect("capture requested");
    assert_eq!(capture.day, 15);
    for series in [
        &capture.load,
        &capture.from_pv,
        &capture.from_battery,
        &capture.from_generator,
        &capture.soc,
        &capture.pv_generation,
    ] {
        assert_eq!(series.len(), 24);
    }
    assert_eq!(capture.load[0], profile.load()[14 * 24]);

    let no_capture = simulate(50.0, 100.0, &profile, &cfg, None).expect("simulation should run");
    assert!(no_capture.hourly_capture.is_none());
}

#[test]
fn pv_output_degrades_year_on_year() {
    let scenario = common::scenario(3);
    let cfg = common::sim_config(&scenario);
    let profile = common::two_week_profile();
    let result = simulate(40.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    let output: Vec<f64> = result.years.values().map(|y| y.pv_generation_kwh).collect();
    assert!(output[0] > output[1] && output[1] > output[2], "{output:?}");
}

#[test]
fn surplus_without_storage_is_curtailed() {
    let scenario = common::flat_economics(1);
    let cfg = common::sim_config(&scenario);
    let profile = common::constant_profile(1, 1.0, 4.0);
    let result = simulate(10.0, 0.0, &profile, &cfg, None).expect("simulation should run");
    let y = result.year(1).expect("year 1");
    assert!((y.charging_losses_kwh - 6.0 * 24.0).abs() < 0.01);
    assert!((y.pv_generation_kwh - y.served_by_pv_kwh - y.charging_losses_kwh).abs() < 0.02);
}

#[test]
fn kpis_are_consistent_with_yearly_table() {
    let scenario = common::scenario(2);
    let cfg = common::sim_config(&scenario);
    let profile = common::two_week_profile();
    let result = simulate(40.0, 80.0, &profile, &cfg, None).expect("simulation should run");
    let kpi = KpiReport::from_result(&result);

    let served = kpi.served_by_pv_kwh + kpi.served_by_battery_kwh + kpi.served_by_generator_kwh;
    assert!((served - kpi.total_load_kwh).abs() < 0.1);
    assert!((0.0..=100.0).contains(&kpi.renewable_fraction_pct));
    assert!(kpi.fuel_avoided_l >= 0.0);
    assert!(kpi.battery_equivalent_full_cycles.is_finite());
}
