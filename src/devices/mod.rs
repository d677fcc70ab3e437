//! Physical asset models used by the dispatch simulator.

/// Stationary battery storage model.
pub mod battery;
/// Generator fuel consumption curve.
pub mod fuel;
pub mod generator;
/// Solar photovoltaic array model.
pub mod solar;

// Re-export the main types for convenience
pub use battery::Battery;
pub use fuel::{FuelCurve, fuel_rate};
pub use generator::DieselGenerator;
pub use solar::PvArray;
