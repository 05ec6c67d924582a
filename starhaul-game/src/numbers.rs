//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 into the u64 range, returning 0 for negative or non-finite values.
#[must_use]
pub fn floor_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).floor()).unwrap_or(u64::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Saturating u64 -> i64 conversion for signed resource deltas.
#[must_use]
pub fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Round to a fixed number of decimal places.
#[must_use]
pub fn round_to_places(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Map a unit-interval draw onto an index in `0..len`.
#[must_use]
pub fn index_from_fraction(fraction: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let scaled = floor_f64_to_u64(fraction * usize_to_f64(len));
    usize::try_from(scaled).unwrap_or(usize::MAX).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_clamps_negative_and_non_finite() {
        assert_eq!(floor_f64_to_u64(-3.7), 0);
        assert_eq!(floor_f64_to_u64(f64::NAN), 0);
        assert_eq!(floor_f64_to_u64(12.99), 12);
        assert_eq!(floor_f64_to_u64(f64::MAX), u64::MAX);
    }

    #[test]
    fn rounding_to_places() {
        assert!((round_to_places(1.234_56, 4) - 1.2346).abs() < 1e-12);
        assert!((round_to_places(1.005_4, 2) - 1.01).abs() < 1e-12);
        assert!((round_to_places(f64::NAN, 2)).abs() < f64::EPSILON);
    }

    #[test]
    fn fraction_indexes_stay_in_bounds() {
        assert_eq!(index_from_fraction(0.0, 4), 0);
        assert_eq!(index_from_fraction(0.999_999, 4), 3);
        assert_eq!(index_from_fraction(1.0, 4), 3);
        assert_eq!(index_from_fraction(0.5, 0), 0);
    }

    #[test]
    fn saturating_signed_conversion() {
        assert_eq!(u64_to_i64(u64::MAX), i64::MAX);
        assert_eq!(u64_to_i64(42), 42);
    }
}
