/// Hourly PV/battery/diesel dispatch state machine.
pub mod dispatch;
pub mod finance;
pub mod kpi;
pub mod types;

pub use dispatch::{DispatchEngine, simulate};
pub use kpi::KpiReport;
pub use types::{
    CapacityFactors, HourDispatch, HourlyCapture, SimulationConfig, SimulationResult,
    YearlyAggregate,
};
