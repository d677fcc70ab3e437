//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SizingError {
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    #[error("irradiance length {irradiance} does not match load length {load}")]
    ProfileLengthMismatch { irradiance: usize, load: usize },

    #[error("hourly profile is empty")]
    EmptyProfile,

    #[error("{series} value {value} at hour {hour} must be finite and non-negative")]
    InvalidProfileValue {
        series: &'static str,
        hour: usize,
        value: f64,
    },

    #[error("malformed irradiance matrix: {0}")]
    MalformedMatrix(String),

    #[error("malformed fuel curve: {0}")]
    InvalidFuelCurve(String),

    #[error("capacity factor list has {got} entries, need at least {needed} (index 0 unused)")]
    CapacityFactorsTooShort { needed: usize, got: usize },

    #[error("hour {hour} is outside the {hours}-hour profile")]
    HourOutOfRange { hour: usize, hours: usize },

    #[error("capture day {day} is outside 1..=31 or beyond the {hours}-hour profile")]
    InvalidCaptureDay { day: u32, hours: usize },

    #[error(
        "generator rated {prime_kw} kW cannot serve {load_kwh} kWh in year {year}, hour {hour}"
    )]
    GeneratorUndersized {
        year: u32,
        hour: usize,
        load_kwh: f64,
        prime_kw: f64,
    },

    #[error("invalid search parameters: {0}")]
    InvalidSearch(String),

    #[error("selection solver failed: {0}")]
    Solver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SizingError {
    /// Whether the error belongs to a single candidate's sizing rather than the
    /// shared inputs. Searches skip such candidates instead of aborting.
    pub fn is_candidate_specific(&self) -> bool {
        matches!(self, Self::GeneratorUndersized { .. })
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SizingResult<T> = Result<T, SizingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_joined() {
        let err = SizingError::Config(vec![
            ConfigError {
                field: "project.years".into(),
                message: "must be > 0".into(),
            },
            ConfigError {
                field: "battery.eta_charge".into(),
                message: "must be in (0, 1]".into(),
            },
        ]);
        let s = err.to_string();
        assert!(s.contains("project.years"));
        assert!(s.contains("battery.eta_charge"));
    }

    #[test]
    fn only_undersized_generator_is_candidate_specific() {
        let undersized = SizingError::GeneratorUndersized {
            year: 1,
            hour: 3,
            load_kwh: 40.0,
            prime_kw: 32.0,
        };
        assert!(undersized.is_candidate_specific());
        assert!(!SizingError::EmptyProfile.is_candidate_specific());
    }
}
