//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon and economic indices.
    #[serde(default)]
    pub project: ProjectConfig,
    /// PV array costs and degradation.
    #[serde(default)]
    pub pv: PvConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Diesel generator parameters.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Where the hourly irradiance/load profile comes from.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Grid refinement search parameters.
    #[serde(default)]
    pub grid_search: GridSearchConfig,
    /// Discrete option sets for the exact selector.
    #[serde(default)]
    pub exact: ExactConfig,
}

/// Horizon and economic indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Number of simulated years (must be > 0).
    pub years: u32,
    /// Annual discount rate (must be > -1).
    pub discount_rate: f64,
    /// Annual cost escalation index applied to O&M terms.
    pub cpi: f64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            years: 15,
            discount_rate: 0.07,
            cpi: 0.02,
        }
    }
}

/// PV array costs and degradation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Capital cost per installed kWp.
    pub unit_cost_per_kwp: f64,
    /// Fixed annual O&M sum (escalated by CPI).
    pub om_per_year: f64,
    /// Annual output degradation rate (0.005 = 0.5 %/yr).
    pub degradation_rate: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            unit_cost_per_kwp: 817_309.0,
            om_per_year: 0.0,
            degradation_rate: 0.0045,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Capital cost per installed kWh.
    pub unit_cost_per_kwh: f64,
    /// Fixed annual O&M sum (escalated by CPI).
    pub om_per_year: f64,
    /// Charge efficiency (0.0–1.0].
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
    /// Usable fraction of nameplate capacity, centred in the SOC range.
    pub depth_of_discharge: f64,
    /// Maximum charge per hour as a fraction of nameplate (0.5 = 0.5C).
    pub charge_rate: f64,
    /// Maximum discharge per hour as a fraction of nameplate.
    pub discharge_rate: f64,
    /// Capacity derating by year; index 0 is unused, index 1 is year 1.
    /// Empty means no derating.
    pub capacity_factors: Vec<f64>,
}

/// Capacity retention curve of the reference lithium pack.
const REFERENCE_CAPACITY_FACTORS: [f64; 21] = [
    1.0, 0.9488, 0.9168, 0.8895, 0.8651, 0.8426, 0.8217, 0.8020, 0.7834, 0.7657, 0.7488, 0.7326,
    0.7171, 0.7021, 0.6875, 0.6730, 0.6584, 0.6437, 0.6290, 0.6143, 0.6000,
];

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            unit_cost_per_kwh: 375_000.6,
            om_per_year: 0.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
            depth_of_discharge: 0.9,
            charge_rate: 0.5,
            discharge_rate: 0.5,
            capacity_factors: REFERENCE_CAPACITY_FACTORS.to_vec(),
        }
    }
}

/// Diesel generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// PRIME power rating (kW).
    pub prime_kw: f64,
    /// Fuel rate (L/h) at 25, 50, 75 and 100 % load.
    pub fuel_curve_lph: [f64; 4],
    /// Diesel price per litre in year 0.
    pub diesel_price_per_l: f64,
    /// Annual diesel price inflation.
    pub diesel_inflation: f64,
    /// Cost allocated to each load hour the generator does not run.
    pub idle_hour_cost: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            prime_kw: 32.0,
            fuel_curve_lph: [3.8, 4.9, 6.9, 8.8],
            diesel_price_per_l: 1100.0,
            diesel_inflation: 0.02,
            idle_hour_cost: 1100.0,
        }
    }
}

/// Hourly profile source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// `"synthetic"`, `"csv"` or `"monthly_csv"`.
    pub source: String,
    /// Profile CSV (`csv`) or 24x12 irradiance matrix CSV (`monthly_csv`).
    pub path: String,
    /// Single-column load CSV, used by `monthly_csv` only.
    pub load_path: String,
    /// Synthetic profile length in hours.
    pub hours: usize,
    /// Synthetic sunrise hour of day (inclusive).
    pub sunrise_hour: usize,
    /// Synthetic sunset hour of day (exclusive).
    pub sunset_hour: usize,
    /// Synthetic midday yield per kWp (kWh/kWp per hour).
    pub peak_yield_per_kwp: f64,
    /// Multiplicative noise on the synthetic yield.
    pub irradiance_noise_std: f64,
    /// Synthetic mean load (kWh per hour).
    pub base_load_kw: f64,
    /// Synthetic daily load swing (kWh per hour).
    pub load_amp_kw: f64,
    /// Phase offset of the daily load sinusoid (radians).
    pub load_phase_rad: f64,
    /// Additive noise on the synthetic load.
    pub load_noise_std: f64,
    /// Seed for the synthetic generators.
    pub seed: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            source: "synthetic".to_string(),
            path: String::new(),
            load_path: String::new(),
            hours: 8760,
            sunrise_hour: 6,
            sunset_hour: 19,
            peak_yield_per_kwp: 0.8,
            irradiance_noise_std: 0.1,
            base_load_kw: 12.0,
            load_amp_kw: 5.0,
            load_phase_rad: -3.4,
            load_noise_std: 0.5,
            seed: 42,
        }
    }
}

/// Grid refinement search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSearchConfig {
    pub pv_min: f64,
    pub pv_max: f64,
    pub bess_min: f64,
    pub bess_max: f64,
    /// Grid points along the PV axis (>= 1).
    pub pv_points: usize,
    /// Grid points along the battery axis (>= 1).
    pub bess_points: usize,
    /// Number of refinement rounds after the coarse pass.
    pub refine_steps: usize,
    /// Refinement window scale: round `k` (0-based) searches
    /// `± range × refine_factor / 2^(k+1)` around the incumbent.
    pub refine_factor: f64,
    /// Evaluate candidates on a rayon pool.
    pub parallel: bool,
    /// Worker threads; `0` lets rayon decide.
    pub threads: usize,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            pv_min: 0.0,
            pv_max: 300.0,
            bess_min: 0.0,
            bess_max: 600.0,
            pv_points: 21,
            bess_points: 21,
            refine_steps: 2,
            refine_factor: 0.25,
            parallel: true,
            threads: 4,
        }
    }
}

/// Discrete option sets for the exact selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExactConfig {
    pub pv_options: Vec<f64>,
    pub bess_options: Vec<f64>,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            pv_options: (50..=200).step_by(10).map(f64::from).collect(),
            bess_options: (40..300).step_by(50).map(f64::from).collect(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.eta_charge"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: the reference off-grid site.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the diesel-only preset: no sun, flat 10 kWh/h load, 20 kW generator.
    pub fn diesel_only() -> Self {
        Self {
            generator: GeneratorConfig {
                prime_kw: 20.0,
                ..GeneratorConfig::default()
            },
            profile: ProfileConfig {
                peak_yield_per_kwp: 0.0,
                irradiance_noise_std: 0.0,
                base_load_kw: 10.0,
                load_amp_kw: 0.0,
                load_noise_std: 0.0,
                ..ProfileConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "diesel_only"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "diesel_only" => Ok(Self::diesel_only()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError {
                    field: field.into(),
                    message: message.into(),
                });
            }
        };

        let p = &self.project;
        check(p.years > 0, "project.years", "must be > 0");
        check(
            p.discount_rate.is_finite() && p.discount_rate > -1.0,
            "project.discount_rate",
            "must be > -1",
        );
        check(p.cpi.is_finite() && p.cpi > -1.0, "project.cpi", "must be > -1");

        let pv = &self.pv;
        check(
            non_negative(pv.unit_cost_per_kwp),
            "pv.unit_cost_per_kwp",
            "must be >= 0",
        );
        check(non_negative(pv.om_per_year), "pv.om_per_year", "must be >= 0");
        check(
            (0.0..1.0).contains(&pv.degradation_rate),
            "pv.degradation_rate",
            "must be in [0, 1)",
        );

        let bat = &self.battery;
        check(
            non_negative(bat.unit_cost_per_kwh),
            "battery.unit_cost_per_kwh",
            "must be >= 0",
        );
        check(
            non_negative(bat.om_per_year),
            "battery.om_per_year",
            "must be >= 0",
        );
        check(
            unit_interval(bat.eta_charge),
            "battery.eta_charge",
            "must be in (0, 1]",
        );
        check(
            unit_interval(bat.eta_discharge),
            "battery.eta_discharge",
            "must be in (0, 1]",
        );
        check(
            unit_interval(bat.depth_of_discharge),
            "battery.depth_of_discharge",
            "must be in (0, 1]",
        );
        check(
            bat.charge_rate.is_finite() && bat.charge_rate > 0.0,
            "battery.charge_rate",
            "must be > 0",
        );
        check(
            bat.discharge_rate.is_finite() && bat.discharge_rate > 0.0,
            "battery.discharge_rate",
            "must be > 0",
        );
        if !bat.capacity_factors.is_empty() {
            check(
                bat.capacity_factors.len() > p.years as usize,
                "battery.capacity_factors",
                "must have at least project.years + 1 entries (index 0 unused)",
            );
            check(
                bat.capacity_factors.iter().all(|&f| non_negative(f)),
                "battery.capacity_factors",
                "entries must be >= 0",
            );
        }

        let g = &self.generator;
        check(
            g.prime_kw.is_finite() && g.prime_kw > 0.0,
            "generator.prime_kw",
            "must be > 0",
        );
        check(
            g.fuel_curve_lph.iter().all(|&r| non_negative(r)),
            "generator.fuel_curve_lph",
            "rates must be >= 0",
        );
        check(
            g.fuel_curve_lph.windows(2).all(|w| w[0] <= w[1]),
            "generator.fuel_curve_lph",
            "rates must be non-decreasing with load",
        );
        check(
            non_negative(g.diesel_price_per_l),
            "generator.diesel_price_per_l",
            "must be >= 0",
        );
        check(
            g.diesel_inflation.is_finite() && g.diesel_inflation > -1.0,
            "generator.diesel_inflation",
            "must be > -1",
        );
        check(
            non_negative(g.idle_hour_cost),
            "generator.idle_hour_cost",
            "must be >= 0",
        );

        let prof = &self.profile;
        match prof.source.as_str() {
            "synthetic" => {
                check(prof.hours > 0, "profile.hours", "must be > 0");
                check(
                    prof.sunrise_hour < prof.sunset_hour && prof.sunset_hour <= 24,
                    "profile.sunrise_hour",
                    "must be < profile.sunset_hour <= 24",
                );
                check(
                    non_negative(prof.peak_yield_per_kwp),
                    "profile.peak_yield_per_kwp",
                    "must be >= 0",
                );
                check(
                    non_negative(prof.base_load_kw),
                    "profile.base_load_kw",
                    "must be >= 0",
                );
            }
            "csv" => check(!prof.path.is_empty(), "profile.path", "required for csv"),
            "monthly_csv" => {
                check(
                    !prof.path.is_empty(),
                    "profile.path",
                    "required for monthly_csv",
                );
                check(
                    !prof.load_path.is_empty(),
                    "profile.load_path",
                    "required for monthly_csv",
                );
            }
            other => check(
                false,
                "profile.source",
                &format!("must be \"synthetic\", \"csv\" or \"monthly_csv\", got \"{other}\""),
            ),
        }

        let gs = &self.grid_search;
        check(
            non_negative(gs.pv_min) && gs.pv_min <= gs.pv_max,
            "grid_search.pv_min",
            "must be >= 0 and <= grid_search.pv_max",
        );
        check(
            non_negative(gs.bess_min) && gs.bess_min <= gs.bess_max,
            "grid_search.bess_min",
            "must be >= 0 and <= grid_search.bess_max",
        );
        check(gs.pv_points > 0, "grid_search.pv_points", "must be > 0");
        check(gs.bess_points > 0, "grid_search.bess_points", "must be > 0");
        check(
            gs.refine_factor.is_finite() && gs.refine_factor > 0.0,
            "grid_search.refine_factor",
            "must be > 0",
        );

        let ex = &self.exact;
        check(
            ex.pv_options.iter().all(|&v| non_negative(v)),
            "exact.pv_options",
            "entries must be >= 0",
        );
        check(
            ex.bess_options.iter().all(|&v| non_negative(v)),
            "exact.bess_options",
            "entries must be >= 0",
        );

        errors
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn unit_interval(v: f64) -> bool {
    v.is_finite() && v > 0.0 && v <= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[project]
years = 10
discount_rate = 0.08
cpi = 0.03

[pv]
unit_cost_per_kwp = 900000.0
om_per_year = 1000.0
degradation_rate = 0.005

[battery]
unit_cost_per_kwh = 350000.0
eta_charge = 0.92
eta_discharge = 0.93
depth_of_discharge = 0.8
charge_rate = 0.5
discharge_rate = 1.0
capacity_factors = [1.0, 0.98, 0.96, 0.94, 0.92, 0.90, 0.88, 0.86, 0.84, 0.82, 0.80]

[generator]
prime_kw = 60.0
fuel_curve_lph = [5.0, 8.0, 11.5, 15.0]
diesel_price_per_l = 1200.0

[profile]
source = "csv"
path = "site.csv"

[grid_search]
pv_max = 200.0
pv_points = 5
bess_points = 5
parallel = false

[exact]
pv_options = [10.0, 20.0]
bess_options = [0.0, 50.0]
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.project.years), Some(10));
        assert_eq!(cfg.as_ref().map(|c| c.generator.prime_kw), Some(60.0));
        assert_eq!(cfg.as_ref().map(|c| &*c.profile.source), Some("csv"));
        assert_eq!(
            cfg.as_ref().map(|c| c.validate().len()),
            Some(0),
            "parsed scenario should validate"
        );
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[battery]
eta_charge = 0.9
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[project]
years = 5
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.project.years), Some(5));
        assert_eq!(cfg.as_ref().map(|c| c.project.discount_rate), Some(0.07));
        assert_eq!(cfg.as_ref().map(|c| c.generator.prime_kw), Some(32.0));
    }

    #[test]
    fn validation_catches_bad_efficiency() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.eta_charge = 0.0;
        cfg.battery.eta_discharge = 1.2;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.eta_charge"));
        assert!(errors.iter().any(|e| e.field == "battery.eta_discharge"));
    }

    #[test]
    fn validation_catches_short_capacity_factors() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.capacity_factors = vec![1.0; 15];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.capacity_factors"));
    }

    #[test]
    fn empty_capacity_factors_are_allowed() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.capacity_factors.clear();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_catches_decreasing_fuel_curve() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.generator.fuel_curve_lph = [4.0, 3.0, 6.9, 8.8];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "generator.fuel_curve_lph"));
    }

    #[test]
    fn validation_catches_discount_rate_below_minus_one() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.project.discount_rate = -1.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "project.discount_rate"));
    }

    #[test]
    fn validation_catches_bad_profile_source() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.profile.source = "xlsx".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "profile.source"));
    }

    #[test]
    fn validation_catches_inverted_grid_range() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.grid_search.bess_min = 700.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "grid_search.bess_min"));
    }

    #[test]
    fn diesel_only_has_no_sun() {
        let cfg = ScenarioConfig::diesel_only();
        assert_eq!(cfg.profile.peak_yield_per_kwp, 0.0);
        assert_eq!(cfg.generator.prime_kw, 20.0);
    }
}
