use crate::error::{SizingError, SizingResult};

/// Load fractions (percent) of the four calibration points.
pub const CALIBRATION_LOADS_PCT: [f64; 4] = [25.0, 50.0, 75.0, 100.0];

/// Generator fuel consumption curve.
///
/// Four calibration rates (L/h) at 25/50/75/100 % load plus an implicit
/// `(0 %, 0 L/h)` point. Between 0 and 100 % the rate is interpolated
/// linearly; above 100 % it grows in proportion to load (constant
/// specific consumption beyond rating).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelCurve {
    rates_lph: [f64; 4],
}

impl FuelCurve {
    /// Creates a curve from the fuel rates at 25, 50, 75 and 100 % load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFuelCurve` if any rate is negative or non-finite, or
    /// if the rates decrease with load.
    pub fn new(rates_lph: [f64; 4]) -> SizingResult<Self> {
        if let Some(r) = rates_lph.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(SizingError::InvalidFuelCurve(format!(
                "rate {r} must be finite and >= 0"
            )));
        }
        if rates_lph.windows(2).any(|w| w[1] < w[0]) {
            return Err(SizingError::InvalidFuelCurve(format!(
                "rates {rates_lph:?} must be non-decreasing with load"
            )));
        }
        Ok(Self { rates_lph })
    }

    /// Fuel rate at full (100 %) load.
    pub fn rate_at_full_load(&self) -> f64 {
        self.rates_lph[3]
    }

    /// Fuel burn rate (L/h) at `load_pct` percent of rated power.
    ///
    /// Negative loads are treated as 0 %.
    pub fn fuel_rate(&self, load_pct: f64) -> f64 {
        let pct = load_pct.max(0.0);
        let full = self.rate_at_full_load();

        if pct > 100.0 {
            if full == 0.0 {
                return 0.0;
            }
            return full * pct / 100.0;
        }

        let mut x0 = 0.0;
        let mut y0 = 0.0;
        for (&x1, &y1) in CALIBRATION_LOADS_PCT.iter().zip(&self.rates_lph) {
            if pct <= x1 {
                return y0 + (y1 - y0) * (pct - x0) / (x1 - x0);
            }
            x0 = x1;
            y0 = y1;
        }
        full
    }
}

/// Convenience wrapper over [`FuelCurve::fuel_rate`].
pub fn fuel_rate(load_pct: f64, curve: &FuelCurve) -> f64 {
    curve.fuel_rate(load_pct)
}
