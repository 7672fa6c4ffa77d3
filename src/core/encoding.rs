//! Positioning encoder
//!
//! The receiver takes fixed-mode coordinates as a standard integer part plus a
//! high-precision residual:
//!
//! | Quantity  | Standard unit | HP unit   | Scale | HP decimals |
//! |-----------|---------------|-----------|-------|-------------|
//! | Latitude  | 1e-7 deg      | 1e-9 deg  | 10^7  | 2           |
//! | Longitude | 1e-7 deg      | 1e-9 deg  | 10^7  | 2           |
//! | Height    | cm            | 0.1 mm    | 10^2  | 1           |
//!
//! Rounding is half-to-even on both parts.

use crate::error::EncodingError;

/// Scale factor for latitude/longitude (1e-7 degree units)
pub const COORDINATE_SCALE: u32 = 10_000_000;
/// High-precision decimals for latitude/longitude (1e-9 degree)
pub const COORDINATE_HP_DECIMALS: u32 = 2;
/// Scale factor for height (cm)
pub const ALTITUDE_SCALE: u32 = 100;
/// High-precision decimals for height (0.1 mm)
pub const ALTITUDE_HP_DECIMALS: u32 = 1;

/// Split `value * scale_factor` into `(standard_part, high_precision_part)`.
///
/// The standard part is the truncated scaled value; the high-precision part is
/// the remaining fraction expressed at `10^decimal_places` resolution. Both
/// carry the sign of the input.
///
/// The standard part is not carried: a fraction that rounds up yields a
/// high-precision part of exactly `±10^decimal_places` (±100 for coordinates).
pub fn to_precision_integers(
    value: f64,
    scale_factor: u32,
    decimal_places: u32,
) -> Result<(i64, i64), EncodingError> {
    if !value.is_finite() {
        return Err(EncodingError::NonFinite(value));
    }

    let scaled = value * f64::from(scale_factor);
    let integer_part = scaled.trunc();
    let fractional_part = scaled - integer_part;

    if integer_part.abs() > f64::from(i32::MAX) {
        return Err(EncodingError::OutOfRange(scaled));
    }

    let residual = fractional_part * 10f64.powi(decimal_places as i32);
    Ok((
        integer_part.round_ties_even() as i64,
        residual.round_ties_even() as i64,
    ))
}

/// Encode latitude or longitude in degrees
pub fn encode_coordinate(degrees: f64) -> Result<(i64, i64), EncodingError> {
    to_precision_integers(degrees, COORDINATE_SCALE, COORDINATE_HP_DECIMALS)
}

/// Encode height above ellipsoid in meters
pub fn encode_altitude(meters: f64) -> Result<(i64, i64), EncodingError> {
    to_precision_integers(meters, ALTITUDE_SCALE, ALTITUDE_HP_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pinned_coordinates() {
        assert_eq!(encode_coordinate(48.6467596667), Ok((486_467_596, 67)));
        assert_eq!(encode_coordinate(16.791555), Ok((167_915_550, 0)));
        assert_eq!(encode_coordinate(37.42199865), Ok((374_219_986, 50)));
        assert_eq!(encode_coordinate(-122.08400345), Ok((-1_220_840_034, -50)));
    }

    #[test]
    fn test_pinned_altitude() {
        assert_eq!(encode_altitude(215.3), Ok((21_530, 0)));
        assert_eq!(encode_altitude(512.345), Ok((51_234, 5)));
    }

    #[test]
    fn test_ties_round_to_even() {
        // 2.5 -> 2, 7.5 -> 8, -2.5 -> -2
        assert_eq!(to_precision_integers(0.25, 1, 1), Ok((0, 2)));
        assert_eq!(to_precision_integers(0.75, 1, 1), Ok((0, 8)));
        assert_eq!(to_precision_integers(-0.25, 1, 1), Ok((0, -2)));
        assert_eq!(to_precision_integers(2.5, 1, 0), Ok((2, 0)));
    }

    #[test]
    fn test_rounded_fraction_not_carried() {
        assert_eq!(to_precision_integers(0.996, 1, 2), Ok((0, 100)));
        assert_eq!(to_precision_integers(-0.996, 1, 2), Ok((0, -100)));
        assert_eq!(to_precision_integers(3.96, 1, 1), Ok((3, 10)));
    }

    #[test]
    fn test_reconstruction_within_resolution() {
        let samples = [
            48.6467596667,
            -33.85678443,
            151.21529671,
            0.000000123,
            -0.5,
            89.99999999,
            -179.123456789,
        ];
        for &value in &samples {
            let (standard, hp) = encode_coordinate(value).unwrap();
            let reconstructed =
                (standard as f64 + hp as f64 / 100.0) / f64::from(COORDINATE_SCALE);
            assert_abs_diff_eq!(reconstructed, value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(
            encode_altitude(f64::INFINITY),
            Err(EncodingError::NonFinite(f64::INFINITY))
        );
        assert!(matches!(
            encode_coordinate(f64::NAN),
            Err(EncodingError::NonFinite(_))
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            encode_coordinate(500.0),
            Err(EncodingError::OutOfRange(_))
        ));
    }
}
