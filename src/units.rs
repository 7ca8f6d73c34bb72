//! Unit conversion factors (spec §6 "Unit conversions", §4.5 phase 6).
//!
//! Applied only to `session, lap, record, segment_lap` per spec, and only
//! to fields the profile marks with a physical [`crate::profile::FieldKind`]
//! (distance, altitude, speed, temperature). Every conversion here rounds to
//! the decimal precision the spec's worked examples use, matching the
//! teacher's habit of rounding display-facing derived values rather than
//! storing full float precision (see `process.rs`'s `round()` helper uses).

/// Rounds `value` to `decimals` decimal places. Grounded on the teacher's
/// own small `round()` utility in `lib/fit-rs/src/process.rs`.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    round_to(c * 9.0 / 5.0 + 32.0, 2)
}

pub fn meters_to_miles(m: f64) -> f64 {
    round_to(m * 0.000_621_371_192, 5)
}

pub fn meters_to_feet(m: f64) -> f64 {
    round_to(m * 3.280_839_9, 1)
}

pub fn mps_to_mph(ms: f64) -> f64 {
    round_to(ms * 2.236_936_29, 3)
}

pub fn mps_to_mph_pace(ms: f64) -> f64 {
    round_to(60.0 / 2.236_936_29 / ms, 3)
}

pub fn mps_to_kph(ms: f64) -> f64 {
    round_to(ms * 3.6, 3)
}

pub fn mps_to_kph_pace(ms: f64) -> f64 {
    round_to(60.0 / 3.6 / ms, 3)
}

pub fn semicircles_to_degrees(semi: f64) -> f64 {
    round_to(semi * 180.0 / 2f64.powi(31), 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_conversion() {
        assert_eq!(celsius_to_fahrenheit(20.0), 68.0);
    }

    #[test]
    fn semicircles_conversion_roundtrips_known_value() {
        // 2^31 semicircles == 180 degrees
        assert_eq!(semicircles_to_degrees(2f64.powi(31)), 180.0);
    }

    #[test]
    fn speed_pace_conversion_is_inverse_of_direct() {
        let kph = mps_to_kph(5.0);
        let pace = mps_to_kph_pace(5.0);
        // sanity: faster speed implies shorter pace
        assert!(kph > 0.0 && pace > 0.0);
    }
}
