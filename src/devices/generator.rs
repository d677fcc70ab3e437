use super::fuel::FuelCurve;

/// Slack when comparing an hourly load against the generator rating.
const RATING_TOLERANCE_KWH: f64 = 1e-9;

/// A diesel generator with a PRIME power rating and a fuel curve.
///
/// With one-hour timesteps, the energy served in an hour equals the average
/// power in that hour and the fuel burned equals the fuel rate.
#[derive(Debug, Clone, Copy)]
pub struct DieselGenerator {
    /// PRIME power rating in kilowatts.
    pub prime_kw: f64,
    curve: FuelCurve,
}

impl DieselGenerator {
    /// Creates a generator.
    ///
    /// # Panics
    ///
    /// Panics if `prime_kw` is not strictly positive.
    pub fn new(prime_kw: f64, curve: FuelCurve) -> Self {
        assert!(prime_kw > 0.0, "prime_kw must be > 0");
        Self { prime_kw, curve }
    }

    /// Load fraction in percent of rating for an hour serving `energy_kwh`.
    pub fn load_pct(&self, energy_kwh: f64) -> f64 {
        energy_kwh / self.prime_kw * 100.0
    }

    /// Litres burned to serve `energy_kwh` in one hour.
    pub fn fuel_for_hour(&self, energy_kwh: f64) -> f64 {
        self.curve.fuel_rate(self.load_pct(energy_kwh))
    }

    /// Whether one hour of `energy_kwh` fits within the rating.
    pub fn can_serve(&self, energy_kwh: f64) -> bool {
        energy_kwh <= self.prime_kw + RATING_TOLERANCE_KWH
    }

    pub fn curve(&self) -> &FuelCurve {
        &self.curve
    }
}
