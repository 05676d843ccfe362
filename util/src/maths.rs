//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Limit a value to the closed range `[min, max]`.
///
/// Evaluated as `max(min, min(max, value))`. Unlike `f64::clamp` this does not panic if
/// `min > max`, instead `min` wins. A `NaN` input gives `max`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    min.max(max.min(value))
}

/// Return true if `a` and `b` are within `tol` of each other.
pub fn approx_eq<T>(a: T, b: T, tol: T) -> bool
where
    T: Float
{
    (a - b).abs() <= tol
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 180f64), (500f64, 2500f64), 0.0), 500.0);
        assert_eq!(lin_map((0f64, 180f64), (500f64, 2500f64), 90.0), 1500.0);
        assert_eq!(lin_map((0f64, 180f64), (500f64, 2500f64), 180.0), 2500.0);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 10f64), 0.0), 5.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(150f64, 90.0, 120.0), 120.0);
        assert_eq!(clamp(150f64, 45.0, 90.0), 90.0);
        assert_eq!(clamp(-5f64, 0.0, 180.0), 0.0);
        assert_eq!(clamp(100f64, 90.0, 120.0), 100.0);
        assert_eq!(clamp(f64::NAN, 0.0, 180.0), 180.0);
        assert_eq!(clamp(5f64, 10.0, 0.0), 10.0);
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(0.1f64 + 0.2, 0.3, 1e-12));
        assert!(!approx_eq(1f64, 1.1, 1e-3));
    }
}
