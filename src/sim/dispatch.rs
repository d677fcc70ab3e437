//! Hour-by-hour dispatch of PV, battery and diesel over the project horizon.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::devices::{Battery, PvArray};
use crate::error::{SizingError, SizingResult};
use crate::profile::HourlyProfile;

use super::finance::{self, YearCashFlow, round2};
use super::types::{
    CAPTURE_HOURS, HourDispatch, HourlyCapture, SimulationConfig, SimulationResult,
    YearlyAggregate,
};

/// Residuals below this are treated as zero.
pub const EPS: f64 = 1e-6;

/// Last day of January that can be captured.
const MAX_CAPTURE_DAY: u32 = 31;

/// Full-precision running totals of one year.
#[derive(Debug, Default)]
struct YearTotals {
    load: f64,
    pv_generation: f64,
    from_pv: f64,
    from_battery: f64,
    from_generator: f64,
    fuel_hybrid: f64,
    fuel_genonly: f64,
    losses: f64,
    generator_hours: u32,
    load_hours: u32,
}

impl YearTotals {
    fn add(&mut self, h: &HourDispatch) {
        self.load += h.load_kwh;
        self.pv_generation += h.pv_generation_kwh;
        self.from_pv += h.pv_to_load_kwh;
        self.from_battery += h.battery_to_load_kwh;
        self.from_generator += h.generator_kwh;
        self.fuel_hybrid += h.fuel_l;
        self.fuel_genonly += h.genonly_fuel_l;
        self.losses += h.curtailed_kwh;
        if h.generator_kwh > EPS {
            self.generator_hours += 1;
        }
        if h.load_kwh > 0.0 {
            self.load_hours += 1;
        }
    }

    fn into_aggregate(self, year: u32, soc_end: f64, flow: &YearCashFlow) -> YearlyAggregate {
        YearlyAggregate {
            year,
            load_kwh: round2(self.load),
            pv_generation_kwh: round2(self.pv_generation),
            served_by_pv_kwh: round2(self.from_pv),
            served_by_battery_kwh: round2(self.from_battery),
            served_by_generator_kwh: round2(self.from_generator),
            fuel_hybrid_l: round2(self.fuel_hybrid),
            fuel_genonly_l: round2(self.fuel_genonly),
            fuel_cost_hybrid: round2(flow.fuel_cost_hybrid),
            fuel_cost_genonly: round2(flow.fuel_cost_genonly),
            fuel_savings: round2(flow.fuel_savings),
            charging_losses_kwh: round2(self.losses),
            soc_end_kwh: round2(soc_end),
            generator_hours: self.generator_hours,
            load_hours: self.load_hours,
            opex_pv_bess: round2(flow.opex_pv_bess),
            opex_generator: round2(flow.opex_generator),
            gross_savings: round2(flow.gross_savings),
            discounted_savings: round2(flow.discounted_savings),
        }
    }
}

/// Dispatch state machine for one (PV, battery) candidate.
///
/// Holds the only mutable state of a run, the battery, and borrows the
/// shared profile and configuration so candidates can run in parallel.
pub struct DispatchEngine<'a> {
    config: &'a SimulationConfig,
    profile: &'a HourlyProfile,
    pv: PvArray,
    battery: Battery,
    year: u32,
}

impl<'a> DispatchEngine<'a> {
    /// Creates an engine positioned at the start of year 1.
    pub fn new(
        pv_kwp: f64,
        bess_kwh: f64,
        profile: &'a HourlyProfile,
        config: &'a SimulationConfig,
    ) -> Self {
        Self {
            config,
            profile,
            pv: PvArray::new(pv_kwp),
            battery: config.battery(bess_kwh.max(0.0)),
            year: 1,
        }
    }

    /// Moves to `year`, applying its battery derating.
    ///
    /// Stored energy above the derated window is dropped.
    pub fn begin_year(&mut self, year: u32) {
        self.year = year;
        let removed = self
            .battery
            .set_capacity_factor(self.config.capacity_factor(year));
        if removed > EPS {
            trace!(year, removed_kwh = removed, "derating clamped battery SOC");
        }
    }

    /// Dispatches one hour of the current year.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::HourOutOfRange`] for an hour past the profile,
    /// and [`SizingError::GeneratorUndersized`] if the hour's load alone
    /// exceeds the generator rating.
    pub fn step(&mut self, hour: usize) -> SizingResult<HourDispatch> {
        let cfg = self.config;
        let generator = &cfg.generator;
        let (Some(&load), Some(&irradiance)) = (
            self.profile.load().get(hour),
            self.profile.irradiance().get(hour),
        ) else {
            return Err(SizingError::HourOutOfRange {
                hour,
                hours: self.profile.hours(),
            });
        };

        if !generator.can_serve(load) {
            return Err(SizingError::GeneratorUndersized {
                year: self.year,
                hour,
                load_kwh: load,
                prime_kw: generator.prime_kw,
            });
        }
        let genonly_fuel_l = if load > EPS {
            generator.fuel_for_hour(load)
        } else {
            0.0
        };

        // 1. PV available this hour
        let pv_generation = self
            .pv
            .energy_kwh(irradiance, cfg.pv_degradation(self.year));

        // 2. PV straight to load
        let pv_to_load = pv_generation.min(load);
        let mut remaining = load - pv_to_load;
        let surplus = pv_generation - pv_to_load;

        // 3. Surplus into storage, the rest is curtailed
        let mut pv_to_battery = 0.0;
        let mut curtailed = 0.0;
        if surplus > EPS {
            pv_to_battery = self.battery.charge(surplus);
            curtailed = surplus - pv_to_battery;
        }

        // 4. Storage to load
        let mut battery_to_load = 0.0;
        if remaining > EPS {
            battery_to_load = self.battery.discharge(remaining);
            remaining -= battery_to_load;
        }

        // 5. Diesel covers the rest
        let mut generator_kwh = 0.0;
        let mut fuel_l = 0.0;
        if remaining > EPS {
            generator_kwh = remaining;
            fuel_l = generator.fuel_for_hour(generator_kwh);
        }

        Ok(HourDispatch {
            year: self.year,
            hour,
            load_kwh: load,
            pv_generation_kwh: pv_generation,
            pv_to_load_kwh: pv_to_load,
            pv_to_battery_kwh: pv_to_battery,
            curtailed_kwh: curtailed,
            battery_to_load_kwh: battery_to_load,
            generator_kwh,
            fuel_l,
            genonly_fuel_l,
            soc_kwh: self.battery.soc_kwh,
        })
    }

    /// Runs the full horizon and returns the candidate's result.
    ///
    /// # Errors
    ///
    /// See [`DispatchEngine::run_with`].
    pub fn run(&mut self, capture_day: Option<u32>) -> SizingResult<SimulationResult> {
        self.run_with(capture_day, |_| {})
    }

    /// Runs the full horizon, handing every dispatched hour to `on_hour`.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::InvalidCaptureDay`] for a capture day outside
    /// 1..=31 or past the profile, and propagates step errors.
    pub fn run_with<F>(
        &mut self,
        capture_day: Option<u32>,
        mut on_hour: F,
    ) -> SizingResult<SimulationResult>
    where
        F: FnMut(&HourDispatch),
    {
        let hours = self.profile.hours();
        let mut capture = capture_day
            .map(|day| validate_capture_day(day, hours).map(HourlyCapture::new))
            .transpose()?;

        let cfg = self.config;
        let capex = finance::capex(self.pv.kwp, self.battery.capacity_kwh, cfg);
        let mut years = BTreeMap::new();
        let mut discounted = Vec::with_capacity(cfg.years as usize);

        for year in 1..=cfg.years {
            self.begin_year(year);
            let mut totals = YearTotals::default();

            for hour in 0..hours {
                let h = self.step(hour)?;
                totals.add(&h);
                if year == 1 {
                    if let Some(cap) = capture.as_mut() {
                        if cap.hour_range().contains(&hour) {
                            cap.push(&h);
                        }
                    }
                }
                on_hour(&h);
            }

            let flow = YearCashFlow::compute(
                cfg,
                year,
                totals.fuel_hybrid,
                totals.fuel_genonly,
                totals.load_hours,
                totals.generator_hours,
            );
            debug!(
                pv_kwp = self.pv.kwp,
                bess_kwh = self.battery.capacity_kwh,
                year,
                fuel_l = totals.fuel_hybrid,
                generator_hours = totals.generator_hours,
                discounted_savings = flow.discounted_savings,
                "year simulated"
            );
            discounted.push(flow.discounted_savings);
            years.insert(
                year,
                totals.into_aggregate(year, self.battery.soc_kwh, &flow),
            );
        }

        let npv = finance::npv(capex, &discounted);
        let payback_year = finance::payback_year(capex, &discounted).map(round2);

        Ok(SimulationResult {
            pv_kwp: self.pv.kwp,
            bess_kwh: self.battery.capacity_kwh,
            capex: round2(capex),
            feasible: true,
            npv: round2(npv),
            payback_year,
            years,
            hourly_capture: capture,
        })
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn config(&self) -> &SimulationConfig {
        self.config
    }
}

fn validate_capture_day(day: u32, hours: usize) -> SizingResult<u32> {
    let end = day as usize * CAPTURE_HOURS;
    if day == 0 || day > MAX_CAPTURE_DAY || end > hours {
        return Err(SizingError::InvalidCaptureDay { day, hours });
    }
    Ok(day)
}

/// Simulates one candidate over the horizon.
///
/// # Arguments
///
/// * `pv_kwp` - PV nameplate (kWp)
/// * `bess_kwh` - Battery nameplate (kWh)
/// * `profile` - Hourly irradiance proxy and load, reused every year
/// * `config` - Resolved simulation parameters
/// * `capture_day` - Optional day of January (1-31) to record hour by hour
///
/// # Errors
///
/// Returns [`SizingError::GeneratorUndersized`] when the generator cannot
/// carry the load alone in some hour, and [`SizingError::InvalidCaptureDay`]
/// for an unusable capture day.
///
/// # Examples
///
/// ```
/// use offgrid_sizer::config::ScenarioConfig;
/// use offgrid_sizer::profile::HourlyProfile;
/// use offgrid_sizer::sim::{SimulationConfig, simulate};
///
/// let mut scenario = ScenarioConfig::baseline();
/// scenario.project.years = 2;
/// let cfg = SimulationConfig::from_scenario(&scenario).unwrap();
/// let profile = HourlyProfile::new(vec![0.0, 0.5, 0.0], vec![10.0, 5.0, 10.0]).unwrap();
///
/// let result = simulate(20.0, 0.0, &profile, &cfg, None).unwrap();
/// assert_eq!(result.years.len(), 2);
/// assert!(result.feasible);
/// ```
pub fn simulate(
    pv_kwp: f64,
    bess_kwh: f64,
    profile: &HourlyProfile,
    config: &SimulationConfig,
    capture_day: Option<u32>,
) -> SizingResult<SimulationResult> {
    DispatchEngine::new(pv_kwp, bess_kwh, profile, config).run(capture_day)
}
