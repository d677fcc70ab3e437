//! Off-grid sizing entry point: CLI wiring and config-driven runs.

use std::path::Path;
use std::process;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use offgrid_sizer::config::ScenarioConfig;
use offgrid_sizer::io::export::{export_candidates_csv, export_capture_csv, export_yearly_csv};
use offgrid_sizer::profile::HourlyProfile;
use offgrid_sizer::search::{CapacitySearchResult, exact_select, grid_search};
use offgrid_sizer::sim::{KpiReport, SimulationConfig, SimulationResult, simulate};

/// What the run computes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Simulate,
    Grid,
    Exact,
}

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    mode: Mode,
    pv_kwp: f64,
    bess_kwh: f64,
    capture_day: Option<u32>,
    yearly_out: Option<String>,
    candidates_out: Option<String>,
    capture_out: Option<String>,
    json: bool,
}

fn print_help() {
    eprintln!("offgrid-sizer: PV + battery + diesel capacity sizing simulator");
    eprintln!();
    eprintln!("Usage: offgrid-sizer [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, diesel_only)");
    eprintln!("  --mode <mode>            simulate | grid | exact (default: simulate)");
    eprintln!("  --pv <kWp>               PV size for simulate mode (default: 0)");
    eprintln!("  --bess <kWh>             Battery size for simulate mode (default: 0)");
    eprintln!("  --capture-day <1-31>     Record one January day hour by hour");
    eprintln!("  --yearly-out <path>      Export the per-year table to CSV");
    eprintln!("  --candidates-out <path>  Export the search candidate table to CSV");
    eprintln!("  --capture-out <path>     Export the hourly capture to CSV");
    eprintln!("  --json                   Print the result as JSON instead of tables");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=offgrid_sizer=debug) for progress logs.");
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Returns the value following flag `args[*i]`, advancing `i`.
fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.as_str(),
        None => fail(format!("{flag} requires {what}")),
    }
}

fn parse_f64(args: &[String], i: &mut usize) -> f64 {
    let flag = args[*i].clone();
    let raw = value(args, i, "a number");
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => fail(format!("{flag} value \"{raw}\" is not a non-negative number")),
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        mode: Mode::Simulate,
        pv_kwp: 0.0,
        bess_kwh: 0.0,
        capture_day: None,
        yearly_out: None,
        candidates_out: None,
        capture_out: None,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(value(&args, &mut i, "a path").to_string()),
            "--preset" => cli.preset = Some(value(&args, &mut i, "a name").to_string()),
            "--mode" => {
                cli.mode = match value(&args, &mut i, "a mode") {
                    "simulate" => Mode::Simulate,
                    "grid" => Mode::Grid,
                    "exact" => Mode::Exact,
                    other => fail(format!(
                        "unknown mode \"{other}\", expected simulate, grid or exact"
                    )),
                }
            }
            "--pv" => cli.pv_kwp = parse_f64(&args, &mut i),
            "--bess" => cli.bess_kwh = parse_f64(&args, &mut i),
            "--capture-day" => {
                let raw = value(&args, &mut i, "a day number");
                match raw.parse::<u32>() {
                    Ok(d) => cli.capture_day = Some(d),
                    Err(_) => fail(format!("--capture-day value \"{raw}\" is not a valid day")),
                }
            }
            "--yearly-out" => cli.yearly_out = Some(value(&args, &mut i, "a path").to_string()),
            "--candidates-out" => {
                cli.candidates_out = Some(value(&args, &mut i, "a path").to_string());
            }
            "--capture-out" => cli.capture_out = Some(value(&args, &mut i, "a path").to_string()),
            "--json" => cli.json = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(format!("failed to serialize result: {e}")),
    }
}

fn print_result(result: &SimulationResult, json: bool) {
    if json {
        print_json(result);
    } else {
        println!("{result}");
        println!("{}", KpiReport::from_result(result));
    }
}

fn print_search(search: &CapacitySearchResult, json: bool) {
    if json {
        print_json(search);
        return;
    }
    println!(
        "Evaluated {} candidates ({} feasible)",
        search.candidates.len(),
        search.feasible_count()
    );
    match &search.best {
        Some(best) => {
            println!();
            print_result(best, false);
        }
        None => println!("No feasible candidate found."),
    }
}

fn write_outputs(
    cli: &CliArgs,
    best: Option<&SimulationResult>,
    search: Option<&CapacitySearchResult>,
) {
    if let Some(ref path) = cli.yearly_out {
        match best {
            Some(result) => {
                if let Err(e) = export_yearly_csv(result, Path::new(path)) {
                    fail(format!("failed to write yearly CSV: {e}"));
                }
                eprintln!("Yearly table written to {path}");
            }
            None => eprintln!("No result to write to {path}"),
        }
    }

    if let Some(ref path) = cli.candidates_out {
        match search {
            Some(s) => {
                if let Err(e) = export_candidates_csv(&s.candidates, Path::new(path)) {
                    fail(format!("failed to write candidates CSV: {e}"));
                }
                eprintln!("Candidate table written to {path}");
            }
            None => eprintln!("--candidates-out only applies to grid and exact modes"),
        }
    }

    if let Some(ref path) = cli.capture_out {
        match best.and_then(|r| r.hourly_capture.as_ref()) {
            Some(capture) => {
                if let Err(e) = export_capture_csv(capture, Path::new(path)) {
                    fail(format!("failed to write capture CSV: {e}"));
                }
                eprintln!("Hourly capture written to {path}");
            }
            None => eprintln!("--capture-out needs --capture-day and a result"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let scenario = load_scenario(&cli);

    let config = SimulationConfig::from_scenario(&scenario).unwrap_or_else(|e| fail(e));
    let profile = HourlyProfile::from_config(&scenario.profile).unwrap_or_else(|e| fail(e));
    info!(
        hours = profile.hours(),
        years = config.years,
        mode = ?cli.mode,
        "profile loaded"
    );

    match cli.mode {
        Mode::Simulate => {
            let result = simulate(cli.pv_kwp, cli.bess_kwh, &profile, &config, cli.capture_day)
                .unwrap_or_else(|e| fail(e));
            print_result(&result, cli.json);
            write_outputs(&cli, Some(&result), None);
        }
        Mode::Grid => {
            let search = grid_search(&profile, &config, &scenario.grid_search, cli.capture_day)
                .unwrap_or_else(|e| fail(e));
            print_search(&search, cli.json);
            write_outputs(&cli, search.best.as_ref(), Some(&search));
        }
        Mode::Exact => {
            let search = exact_select(
                &profile,
                &config,
                &scenario.exact.pv_options,
                &scenario.exact.bess_options,
                cli.capture_day,
            )
            .unwrap_or_else(|e| fail(e));
            print_search(&search, cli.json);
            write_outputs(&cli, search.best.as_ref(), Some(&search));
        }
    }
}
