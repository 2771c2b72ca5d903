//! Head-loss laws in SI units (head in m, flow in m³/s).
//!
//! Each law returns the head loss `h` and its derivative `g = dh/dQ`,
//! with `g` floored so the gradient method never divides by zero.

/// Hazen-Williams flow exponent.
pub const HW_EXPONENT: f64 = 1.852;

/// Smallest admissible dh/dQ.
pub const MIN_GRADIENT: f64 = 1e-7;

/// Head loss and its flow derivative for one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadLoss {
    pub h: f64,
    pub g: f64,
}

/// Hazen-Williams resistance `r` such that `h = r |Q|^0.852 Q`.
pub fn hazen_williams_resistance(length_m: f64, diameter_m: f64, c_factor: f64) -> f64 {
    10.667 * length_m / (c_factor.powf(HW_EXPONENT) * diameter_m.powf(4.871))
}

pub fn hazen_williams(r: f64, q: f64) -> HeadLoss {
    let aq = q.abs();
    let h = r * aq.powf(HW_EXPONENT - 1.0) * q;
    let g = (HW_EXPONENT * r * aq.powf(HW_EXPONENT - 1.0)).max(MIN_GRADIENT);
    HeadLoss { h, g }
}

/// Emitter resistance from a coefficient in (L/s)/m^0.5.
///
/// Returns `None` for a zero coefficient (no emitter).
pub fn emitter_resistance(coeff_lps: f64) -> Option<f64> {
    if coeff_lps > 0.0 {
        let c_si = coeff_lps / 1000.0;
        Some(1.0 / (c_si * c_si))
    } else {
        None
    }
}

/// Emitter law `h = r Q |Q|`, i.e. `Q = C sqrt(h)` for positive pressure.
pub fn emitter(r: f64, q: f64) -> HeadLoss {
    let h = r * q * q.abs();
    let g = (2.0 * r * q.abs()).max(MIN_GRADIENT);
    HeadLoss { h, g }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazen_williams_is_odd() {
        let r = hazen_williams_resistance(500.0, 0.2, 120.0);
        let a = hazen_williams(r, 0.01);
        let b = hazen_williams(r, -0.01);
        assert!((a.h + b.h).abs() < 1e-12);
        assert!((a.g - b.g).abs() < 1e-12);
        assert!(a.h > 0.0);
    }

    #[test]
    fn hazen_williams_gradient_matches_finite_difference() {
        let r = hazen_williams_resistance(300.0, 0.15, 100.0);
        let q = 0.004;
        let eps = 1e-8;
        let fd = (hazen_williams(r, q + eps).h - hazen_williams(r, q - eps).h) / (2.0 * eps);
        let g = hazen_williams(r, q).g;
        assert!((fd - g).abs() / g < 1e-5);
    }

    #[test]
    fn emitter_recovers_square_root_law() {
        // 2 (L/s)/m^0.5 at 16 m of pressure discharges 8 L/s.
        let r = emitter_resistance(2.0).unwrap();
        let q = 0.008;
        assert!((emitter(r, q).h - 16.0).abs() < 1e-9);
    }

    #[test]
    fn zero_coefficient_has_no_emitter() {
        assert!(emitter_resistance(0.0).is_none());
    }

    #[test]
    fn gradient_is_floored_at_zero_flow() {
        assert_eq!(hazen_williams(1.0, 0.0).g, MIN_GRADIENT);
        assert_eq!(emitter(1.0, 0.0).g, MIN_GRADIENT);
    }
}
