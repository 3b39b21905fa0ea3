use std::fmt::Display;

/// Default factor between the device frequency and the displayed frequency.
/// Quadrature sampling detectors run the LO at four times the tuned frequency.
pub const DEFAULT_MULTIPLIER: f64 = 4.0;

/// Converts between raw device frequencies and user facing frequencies.
///
/// A raw reading of exactly zero is how the device signals a failed read. It is
/// never a frequency and must not be divided and reported.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Multiplier(f64);

impl Multiplier {
    /// Returns `None` unless the factor is finite and positive.
    pub fn new(factor: f64) -> Option<Multiplier> {
        (factor.is_finite() && factor > 0.0).then_some(Multiplier(factor))
    }

    pub fn factor(&self) -> f64 {
        self.0
    }

    pub fn to_user(&self, raw: f64) -> f64 {
        raw / self.0
    }

    pub fn to_device(&self, user: f64) -> f64 {
        user * self.0
    }

    /// Like [Multiplier::to_user], but maps the zero sentinel to `None`.
    pub fn to_user_checked(&self, raw: f64) -> Option<f64> {
        if raw == 0.0 { None } else { Some(self.to_user(raw)) }
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier(DEFAULT_MULTIPLIER)
    }
}

impl Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_degenerate_factors() {
        assert!(Multiplier::new(0.0).is_none());
        assert!(Multiplier::new(-4.0).is_none());
        assert!(Multiplier::new(f64::NAN).is_none());
        assert_eq!(Multiplier::new(2.0).unwrap().factor(), 2.0);
    }

    #[test]
    fn conversion_is_reversible() {
        for factor in [1.0, 2.0, 4.0, 8.0] {
            let m = Multiplier::new(factor).unwrap();
            for f in [1.8, 3.5, 7.074, 14.074, 28.12345, 50.1] {
                assert!((m.to_user(m.to_device(f)) - f).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn zero_is_a_failed_read() {
        let m = Multiplier::default();
        assert_eq!(m.to_user_checked(0.0), None);
        assert_eq!(m.to_user_checked(56.296), Some(14.074));
    }

    #[test]
    fn displays_six_decimals() {
        assert_eq!(Multiplier::new(8.0).unwrap().to_string(), "8.000000");
    }
}
