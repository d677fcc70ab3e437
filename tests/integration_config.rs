//! Integration tests for scenario loading, presets and profile sources.

mod common;

use std::fs;
use std::path::PathBuf;

use offgrid_sizer::config::ScenarioConfig;
use offgrid_sizer::error::SizingError;
use offgrid_sizer::profile::HourlyProfile;
use offgrid_sizer::sim::{SimulationConfig, simulate};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("offgrid_sizer_{}_{name}", std::process::id()))
}

#[test]
fn toml_file_drives_a_simulation() {
    let profile_path = temp_path("site.csv");
    let mut csv = String::from("irradiance,load\n");
    for h in 0..48 {
        let sun = if (8..16).contains(&(h % 24)) { 0.6 } else { 0.0 };
        csv.push_str(&format!("{sun},{}\n", 6.0 + (h % 3) as f64));
    }
    fs::write(&profile_path, csv).expect("write profile");

    let scenario_path = temp_path("scenario.toml");
    let toml = format!(
        r#"
[project]
years = 3
discount_rate = 0.1

[battery]
capacity_factors = [1.0, 1.0, 0.95, 0.9]

[generator]
prime_kw = 20.0

[profile]
source = "csv"
path = "{}"
"#,
        profile_path.display().to_string().replace('\\', "/")
    );
    fs::write(&scenario_path, toml).expect("write scenario");

    let scenario = ScenarioConfig::from_toml_file(&scenario_path).expect("scenario parses");
    let cfg = SimulationConfig::from_scenario(&scenario).expect("scenario resolves");
    let profile = HourlyProfile::from_config(&scenario.profile).expect("profile loads");
    assert_eq!(profile.hours(), 48);

    let result = simulate(10.0, 20.0, &profile, &cfg, Some(2)).expect("simulation runs");
    assert_eq!(result.years.len(), 3);
    assert_eq!(cfg.capacity_factor(3), 0.9);
    assert!(result.hourly_capture.is_some());

    fs::remove_file(&profile_path).ok();
    fs::remove_file(&scenario_path).ok();
}

#[test]
fn missing_scenario_file_is_reported() {
    let err = ScenarioConfig::from_toml_file(&temp_path("does_not_exist.toml"))
        .expect_err("missing file");
    assert_eq!(err.field, "scenario");
    assert!(err.message.contains("cannot read"));
}

#[test]
fn invalid_scenario_lists_every_problem() {
    let mut scenario = ScenarioConfig::baseline();
    scenario.project.years = 0;
    scenario.battery.depth_of_discharge = 1.5;
    scenario.generator.prime_kw = 0.0;

    let err = SimulationConfig::from_scenario(&scenario).expect_err("invalid scenario");
    let errors = match err {
        SizingError::Config(errors) => errors,
        other => panic!("expected a config error, got {other}"),
    };
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"project.years"));
    assert!(fields.contains(&"battery.depth_of_discharge"));
    assert!(fields.contains(&"generator.prime_kw"));
}

#[test]
fn short_capacity_factor_list_is_rejected() {
    let mut scenario = ScenarioConfig::baseline();
    scenario.project.years = 25;
    assert!(matches!(
        SimulationConfig::from_scenario(&scenario),
        Err(SizingError::Config(_))
    ));

    scenario.battery.capacity_factors.clear();
    let cfg = SimulationConfig::from_scenario(&scenario).expect("empty list means no derating");
    assert_eq!(cfg.capacity_factor(25), 1.0);
}

#[test]
fn every_preset_simulates() {
    for name in ScenarioConfig::PRESETS {
        let mut scenario = ScenarioConfig::from_preset(name).expect("preset exists");
        scenario.project.years = 2;
        scenario.profile.hours = 24 * 7;
        let cfg = SimulationConfig::from_scenario(&scenario).expect("preset resolves");
        let profile = HourlyProfile::from_config(&scenario.profile).expect("profile builds");
        let result = simulate(30.0, 60.0, &profile, &cfg, Some(1)).expect("simulation runs");
        assert!(result.feasible, "preset \"{name}\"");
        assert_eq!(result.years.len(), 2);
    }
}

#[test]
fn monthly_matrix_profile_loads() {
    let matrix_path = temp_path("matrix.csv");
    let load_path = temp_path("load.csv");

    let mut matrix = String::new();
    for hour in 0..24 {
        let v = if (7..17).contains(&hour) { 0.5 } else { 0.0 };
        let row: Vec<String> = (0..12).map(|_| format!("{v}")).collect();
        matrix.push_str(&row.join(","));
        matrix.push('\n');
    }
    fs::write(&matrix_path, matrix).expect("write matrix");
    fs::write(&load_path, "7.5\n".repeat(8760)).expect("write load");

    let mut scenario = common::scenario(1);
    scenario.profile.source = "monthly_csv".to_string();
    scenario.profile.path = matrix_path.display().to_string();
    scenario.profile.load_path = load_path.display().to_string();
    assert!(scenario.validate().is_empty());

    let profile = HourlyProfile::from_config(&scenario.profile).expect("profile loads");
    assert_eq!(profile.hours(), 8760);
    assert_eq!(profile.irradiance()[8], 0.5);
    assert_eq!(profile.irradiance()[20], 0.0);
    assert!((profile.total_load() - 7.5 * 8760.0).abs() < 1e-6);

    fs::remove_file(&matrix_path).ok();
    fs::remove_file(&load_path).ok();
}

#[test]
fn mismatched_csv_profile_lengths_fail_before_simulation() {
    let matrix_path = temp_path("short_matrix.csv");
    let load_path = temp_path("short_load.csv");
    fs::write(&matrix_path, "0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1\n".repeat(24))
        .expect("write matrix");
    fs::write(&load_path, "5.0\n".repeat(100)).expect("write load");

    let err =
        HourlyProfile::from_monthly_csv(&matrix_path, &load_path).expect_err("length mismatch");
    assert!(matches!(
        err,
        SizingError::ProfileLengthMismatch {
            irradiance: 8760,
            load: 100
        }
    ));

    fs::remove_file(&matrix_path).ok();
    fs::remove_file(&load_path).ok();
}
