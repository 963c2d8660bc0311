//! Time and rounding utilities for deterministic simulation.
//!
//! Simulation time is carried in fixed-point seconds so that phase timers
//! accumulate identically on every platform and compare exactly against
//! their durations. Resource counters stay in `f64` because they compound
//! multiplicatively on upgrade; every conversion from a counter to a whole
//! number goes through the helpers below.

use fixed::types::I32F32;

/// Fixed-point number type for simulation time.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647 seconds
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited durations.
///
/// Config and scenario files write seconds as plain numbers (`60.0`); the
/// value is converted to [`Fixed`] on load and written back as `f64`.
pub mod seconds_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize fixed-point seconds as a float.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize float seconds into fixed-point.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(secs)
            .ok_or_else(|| D::Error::custom(format!("seconds out of range: {secs}")))
    }
}

/// Whole seconds as fixed-point time.
#[must_use]
pub fn seconds(secs: i32) -> Fixed {
    Fixed::from_num(secs)
}

/// Fixed-point time as `f64` seconds, for multiplying against rates.
#[must_use]
pub fn to_seconds_f64(value: Fixed) -> f64 {
    value.to_num::<f64>()
}

/// Truncate a non-negative counter to a whole count.
///
/// Negative and NaN inputs map to zero.
#[must_use]
pub fn floor_count(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as u64
    }
}

/// Round a non-negative quantity to the nearest whole number, halves up.
///
/// Negative and NaN inputs map to zero.
#[must_use]
pub fn round_half_up(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value + 0.5).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(0.49), 0);
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(1.5), 2);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(29.999), 30);
        assert_eq!(round_half_up(-3.0), 0);
        assert_eq!(round_half_up(f64::NAN), 0);
    }

    #[test]
    fn test_floor_count() {
        assert_eq!(floor_count(100.99), 100);
        assert_eq!(floor_count(0.2), 0);
        assert_eq!(floor_count(-4.0), 0);
    }

    #[test]
    fn test_fixed_accumulation_is_exact() {
        let mut elapsed = Fixed::ZERO;
        for _ in 0..240 {
            elapsed += Fixed::from_num(0.25);
        }
        assert_eq!(elapsed, seconds(60));
    }

    #[test]
    fn test_seconds_conversion() {
        assert_eq!(to_seconds_f64(seconds(30)), 30.0);
        assert_eq!(to_seconds_f64(Fixed::from_num(1.5)), 1.5);
    }
}
