/// A battery energy storage system dispatched in one-hour steps.
///
/// `Battery` tracks its state of charge (SOC) in energy units and enforces
/// the hourly charge/discharge limits, the depth-of-discharge window and the
/// round-trip efficiencies.
///
/// # SOC Window
/// The usable window is centred in the nameplate range: with depth of
/// discharge `DOD`, the minimum SOC fraction is `(1 - DOD) / 2` and the
/// maximum is its complement. Both bounds scale with the current year's
/// capacity-derating factor.
///
/// # Energy Convention
/// - `charge` takes input-side energy (what the PV array gives up) and stores
///   `input × eta_c`.
/// - `discharge` removes energy from storage and delivers `removed × eta_d`.
#[derive(Debug, Clone)]
pub struct Battery {
    /// Nameplate capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// Stored energy in kilowatt-hours.
    pub soc_kwh: f64,

    /// Maximum energy accepted into storage per hour (nameplate × C-rate).
    pub max_charge_kwh: f64,

    /// Maximum energy withdrawn from storage per hour (nameplate × C-rate).
    pub max_discharge_kwh: f64,

    /// Charging efficiency (0..1.0].
    pub eta_c: f64,

    /// Discharging efficiency (0..1.0].
    pub eta_d: f64,

    soc_min_frac: f64,
    soc_max_frac: f64,

    /// Capacity-derating factor of the current year.
    capacity_factor: f64,
}

impl Battery {
    /// Creates a battery resting at the bottom of its SOC window.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Nameplate capacity in kWh (may be zero)
    /// * `charge_rate` - Hourly charge limit as a fraction of nameplate
    /// * `discharge_rate` - Hourly discharge limit as a fraction of nameplate
    /// * `eta_c` - Charging efficiency (0..1.0]
    /// * `eta_d` - Discharging efficiency (0..1.0]
    /// * `depth_of_discharge` - Usable fraction of nameplate (0..1.0]
    /// * `capacity_factor` - Derating factor of the first simulated year
    ///
    /// # Panics
    ///
    /// Panics if capacity is negative or efficiencies/DOD are outside (0, 1].
    pub fn new(
        capacity_kwh: f64,
        charge_rate: f64,
        discharge_rate: f64,
        eta_c: f64,
        eta_d: f64,
        depth_of_discharge: f64,
        capacity_factor: f64,
    ) -> Self {
        assert!(capacity_kwh >= 0.0);
        assert!(charge_rate >= 0.0 && discharge_rate >= 0.0);
        assert!(eta_c > 0.0 && eta_c <= 1.0);
        assert!(eta_d > 0.0 && eta_d <= 1.0);
        assert!(depth_of_discharge > 0.0 && depth_of_discharge <= 1.0);

        let soc_min_frac = (1.0 - depth_of_discharge) / 2.0;
        let mut battery = Self {
            capacity_kwh,
            soc_kwh: 0.0,
            max_charge_kwh: capacity_kwh * charge_rate,
            max_discharge_kwh: capacity_kwh * discharge_rate,
            eta_c,
            eta_d,
            soc_min_frac,
            soc_max_frac: 1.0 - soc_min_frac,
            capacity_factor,
        };
        battery.soc_kwh = battery.soc_min_kwh();
        battery
    }

    /// Lower SOC bound for the current year.
    pub fn soc_min_kwh(&self) -> f64 {
        self.soc_min_frac * self.capacity_kwh * self.capacity_factor
    }

    /// Upper SOC bound for the current year.
    pub fn soc_max_kwh(&self) -> f64 {
        self.soc_max_frac * self.capacity_kwh * self.capacity_factor
    }

    pub fn capacity_factor(&self) -> f64 {
        self.capacity_factor
    }

    /// Moves to a new year's derating factor, clamping the SOC into the new
    /// window. Returns the stored energy removed by the clamp.
    pub fn set_capacity_factor(&mut self, factor: f64) -> f64 {
        self.capacity_factor = factor;
        let clamped = self.soc_kwh.clamp(self.soc_min_kwh(), self.soc_max_kwh());
        let removed = (self.soc_kwh - clamped).max(0.0);
        self.soc_kwh = clamped;
        removed
    }

    /// Absorbs up to `surplus_kwh` of input energy and returns the amount taken.
    ///
    /// Limited by the hourly charge rate (input side, `max_charge / eta_c`)
    /// and by the input needed to reach the upper SOC bound.
    pub fn charge(&mut self, surplus_kwh: f64) -> f64 {
        let headroom = (self.soc_max_kwh() - self.soc_kwh).max(0.0);
        let to_fill = headroom / self.eta_c;
        let rate_limit = self.max_charge_kwh / self.eta_c;
        let absorbed = surplus_kwh.max(0.0).min(rate_limit).min(to_fill);

        if absorbed > 0.0 {
            self.soc_kwh = (self.soc_kwh + absorbed * self.eta_c).min(self.soc_max_kwh());
        }
        absorbed
    }

    /// Delivers up to `demand_kwh` to the load and returns the energy delivered.
    ///
    /// Limited by the energy above the lower SOC bound, the hourly discharge
    /// rate, and the storage-side energy needed to cover the demand
    /// (`demand / eta_d`).
    pub fn discharge(&mut self, demand_kwh: f64) -> f64 {
        let available = (self.soc_kwh - self.soc_min_kwh()).max(0.0);
        let needed = demand_kwh.max(0.0) / self.eta_d;
        let removed = available.min(self.max_discharge_kwh).min(needed);

        self.soc_kwh -= removed;
        removed * self.eta_d
    }
}
