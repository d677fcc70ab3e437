/// A PV array whose hourly output is its nameplate times the irradiance
/// proxy, derated by the year's degradation factor.
#[derive(Debug, Clone, Copy)]
pub struct PvArray {
    /// Nameplate rating in kWp.
    pub kwp: f64,
}

impl PvArray {
    /// Creates an array; negative ratings are clamped to zero.
    pub fn new(kwp: f64) -> Self {
        Self { kwp: kwp.max(0.0) }
    }

    /// Energy available in an hour with the given yield per kWp.
    pub fn energy_kwh(&self, yield_per_kwp: f64, degradation_factor: f64) -> f64 {
        self.kwp * yield_per_kwp * degradation_factor
    }
}
