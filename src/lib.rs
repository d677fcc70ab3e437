//! Off-grid PV + battery + diesel capacity sizing simulator.

pub mod config;
pub mod devices;
pub mod error;
pub mod io;
/// Hourly irradiance and load profiles.
pub mod profile;
/// Grid refinement and exact capacity searches.
pub mod search;
/// Dispatch simulation, finance and KPI modules.
pub mod sim;

pub use error::{SizingError, SizingResult};
