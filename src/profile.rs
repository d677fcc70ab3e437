//! Hourly irradiance/load profiles: validation, loaders and synthetic generation.

use std::path::Path;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::config::ProfileConfig;
use crate::error::{SizingError, SizingResult};

/// Hours in a non-leap year.
pub const HOURS_PER_YEAR: usize = 8760;

/// Days per month of a non-leap year.
pub const DAYS_IN_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A pair of equal-length hourly series replayed every simulated year.
///
/// `irradiance` is the PV energy yield proxy per installed kWp for each hour;
/// `load` is the energy demanded in that hour. Both are validated on
/// construction and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile {
    irradiance: Vec<f64>,
    load: Vec<f64>,
}

impl HourlyProfile {
    /// Builds a profile, rejecting mismatched lengths, empty series and
    /// negative or non-finite values.
    pub fn new(irradiance: Vec<f64>, load: Vec<f64>) -> SizingResult<Self> {
        if irradiance.len() != load.len() {
            return Err(SizingError::ProfileLengthMismatch {
                irradiance: irradiance.len(),
                load: load.len(),
            });
        }
        if irradiance.is_empty() {
            return Err(SizingError::EmptyProfile);
        }
        check_series("irradiance", &irradiance)?;
        check_series("load", &load)?;
        Ok(Self { irradiance, load })
    }

    /// Builds the profile described by a scenario's `[profile]` section.
    pub fn from_config(cfg: &ProfileConfig) -> SizingResult<Self> {
        match cfg.source.as_str() {
            "csv" => Self::from_csv(Path::new(&cfg.path)),
            "monthly_csv" => {
                Self::from_monthly_csv(Path::new(&cfg.path), Path::new(&cfg.load_path))
            }
            _ => Ok(Self::synthetic(cfg)),
        }
    }

    /// Reads a two-column CSV with an `irradiance,load` header.
    pub fn from_csv(path: &Path) -> SizingResult<Self> {
        #[derive(Deserialize)]
        struct Row {
            irradiance: f64,
            load: f64,
        }

        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let mut irradiance = Vec::with_capacity(HOURS_PER_YEAR);
        let mut load = Vec::with_capacity(HOURS_PER_YEAR);
        for row in rdr.deserialize() {
            let row: Row = row?;
            irradiance.push(row.irradiance);
            load.push(row.load);
        }
        tracing::debug!(hours = irradiance.len(), path = %path.display(), "loaded profile");
        Self::new(irradiance, load)
    }

    /// Reads a 24-row by 12-column typical-day irradiance matrix (no header)
    /// and a single-column load file (no header), expanding the matrix to a
    /// full year.
    pub fn from_monthly_csv(matrix_path: &Path, load_path: &Path) -> SizingResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(matrix_path)?;
        let mut matrix = [[0.0; 12]; 24];
        let mut rows = 0;
        for record in rdr.deserialize() {
            let values: Vec<f64> = record?;
            if rows >= 24 || values.len() != 12 {
                return Err(SizingError::MalformedMatrix(format!(
                    "row {} has {} columns, expected 24 rows of 12",
                    rows + 1,
                    values.len()
                )));
            }
            matrix[rows].copy_from_slice(&values);
            rows += 1;
        }
        if rows != 24 {
            return Err(SizingError::MalformedMatrix(format!(
                "found {rows} rows, expected 24"
            )));
        }
        let irradiance = expand_monthly_matrix(&matrix, &DAYS_IN_MONTH);

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(load_path)?;
        let mut load = Vec::with_capacity(HOURS_PER_YEAR);
        for record in rdr.deserialize() {
            let (value,): (f64,) = record?;
            load.push(value);
        }
        Self::new(irradiance, load)
    }

    /// Generates a seeded synthetic profile.
    ///
    /// Irradiance follows a half-sine between sunrise and sunset scaled by
    /// `peak_yield_per_kwp`, with multiplicative Gaussian noise. Load is a
    /// daily sinusoid around `base_load_kw` with additive Gaussian noise.
    /// Both series are clamped non-negative.
    pub fn synthetic(cfg: &ProfileConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut irradiance = Vec::with_capacity(cfg.hours);
        let mut load = Vec::with_capacity(cfg.hours);

        for t in 0..cfg.hours {
            let hour = t % 24;
            let frac = daylight_frac(hour, cfg.sunrise_hour, cfg.sunset_hour);
            let sun = if frac > 0.0 && cfg.peak_yield_per_kwp > 0.0 {
                let mult = 1.0 + gaussian_noise(&mut rng, cfg.irradiance_noise_std);
                (cfg.peak_yield_per_kwp * frac * mult).max(0.0)
            } else {
                0.0
            };
            irradiance.push(sun);

            let angle = 2.0 * std::f64::consts::PI * hour as f64 / 24.0 + cfg.load_phase_rad;
            let noise = gaussian_noise(&mut rng, cfg.load_noise_std);
            load.push((cfg.base_load_kw + cfg.load_amp_kw * angle.sin() + noise).max(0.0));
        }

        Self { irradiance, load }
    }

    pub fn irradiance(&self) -> &[f64] {
        &self.irradiance
    }

    pub fn load(&self) -> &[f64] {
        &self.load
    }

    /// Number of hours replayed per simulated year.
    pub fn hours(&self) -> usize {
        self.load.len()
    }

    /// Total annual load.
    pub fn total_load(&self) -> f64 {
        self.load.iter().sum()
    }

    /// Largest single-hour load.
    pub fn peak_load(&self) -> f64 {
        self.load.iter().copied().fold(0.0, f64::max)
    }
}

fn check_series(series: &'static str, values: &[f64]) -> SizingResult<()> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        Some((hour, &value)) => Err(SizingError::InvalidProfileValue {
            series,
            hour,
            value,
        }),
        None => Ok(()),
    }
}

/// Expands a 24x12 typical-day matrix (rows = hour of day, columns = month)
/// into an hourly series by repeating each month's column once per day.
///
/// ```
/// use offgrid_sizer::profile::{DAYS_IN_MONTH, expand_monthly_matrix};
///
/// let matrix = [[1.0; 12]; 24];
/// assert_eq!(expand_monthly_matrix(&matrix, &DAYS_IN_MONTH).len(), 8760);
/// ```
pub fn expand_monthly_matrix(matrix: &[[f64; 12]; 24], days_in_month: &[usize; 12]) -> Vec<f64> {
    let total: usize = days_in_month.iter().sum::<usize>() * 24;
    let mut hourly = Vec::with_capacity(total);
    for (month, &days) in days_in_month.iter().enumerate() {
        for _ in 0..days {
            hourly.extend(matrix.iter().map(|row| row[month]));
        }
    }
    hourly
}

/// Half-sine daylight shape in `[0, 1]`, zero outside `[sunrise, sunset)`.
fn daylight_frac(hour: usize, sunrise: usize, sunset: usize) -> f64 {
    if hour < sunrise || hour >= sunset {
        return 0.0;
    }
    let span = (sunset - sunrise) as f64;
    let pos = (hour - sunrise) as f64 + 0.5;
    (std::f64::consts::PI * pos / span).sin()
}

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
