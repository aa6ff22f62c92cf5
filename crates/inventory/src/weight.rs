//! Exact metal weights.
//!
//! Weights are held as whole milligrams so that repeated decrements never
//! drift below zero through float rounding. On the wire they are grams.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use karatbook_core::{DomainError, DomainResult};

/// Non-negative weight in milligrams.
///
/// Decoding mirrors piece counts: a blank string or null is zero, since form
/// edits store whatever the input held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Weight(u64);

impl Weight {
    pub const ZERO: Weight = Weight(0);

    pub fn from_milligrams(mg: u64) -> Self {
        Self(mg)
    }

    /// Convert grams to a weight, rounding to the nearest milligram.
    pub fn from_grams(grams: f64) -> DomainResult<Self> {
        if !grams.is_finite() {
            return Err(DomainError::invariant(format!("weight must be finite, got {grams}")));
        }
        if grams < 0.0 {
            return Err(DomainError::invariant(format!(
                "weight cannot be negative, got {grams}"
            )));
        }
        let mg = (grams * 1000.0).round();
        // `as` saturates; anything at or past u64::MAX is not a real weight.
        if mg >= u64::MAX as f64 {
            return Err(DomainError::invariant(format!("weight {grams} g is out of range")));
        }
        Ok(Self(mg as u64))
    }

    pub fn milligrams(self) -> u64 {
        self.0
    }

    pub fn grams(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `None` when the result would be negative.
    pub fn checked_sub(self, other: Weight) -> Option<Weight> {
        self.0.checked_sub(other.0).map(Weight)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1000;
        let frac = self.0 % 1000;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Weight {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let grams: f64 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid weight '{s}'")))?;
        Weight::from_grams(grams).map_err(|e| DomainError::validation(e.to_string()))
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 1000 == 0 {
            serializer.serialize_u64(self.0 / 1000)
        } else {
            serializer.serialize_f64(self.grams())
        }
    }
}

struct WeightVisitor;

impl<'de> Visitor<'de> for WeightVisitor {
    type Value = Weight;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative weight in grams")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Weight, E> {
        v.checked_mul(1000)
            .map(Weight)
            .ok_or_else(|| E::custom(format!("weight {v} out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Weight, E> {
        if v < 0 {
            return Err(E::custom(format!("weight cannot be negative, got {v}")));
        }
        self.visit_u64(v as u64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Weight, E> {
        Weight::from_grams(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Weight, E> {
        if v.trim().is_empty() {
            return Ok(Weight::ZERO);
        }
        v.parse().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Weight, E> {
        Ok(Weight::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Weight, E> {
        Ok(Weight::ZERO)
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WeightVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrements_are_exact() {
        let stock: Weight = "0.3".parse().unwrap();
        let first: Weight = "0.1".parse().unwrap();
        let second: Weight = "0.2".parse().unwrap();
        let left = stock.checked_sub(first).and_then(|w| w.checked_sub(second));
        assert_eq!(left, Some(Weight::ZERO));
    }

    #[test]
    fn checked_sub_refuses_to_go_negative() {
        let five = Weight::from_milligrams(5_000);
        let ten = Weight::from_milligrams(10_000);
        assert_eq!(five.checked_sub(ten), None);
    }

    #[test]
    fn decodes_numbers_and_numeric_strings() {
        let w: Weight = serde_json::from_str("12.5").unwrap();
        assert_eq!(w.milligrams(), 12_500);
        let w: Weight = serde_json::from_str("\" 7 \"").unwrap();
        assert_eq!(w.milligrams(), 7_000);
        assert!(serde_json::from_str::<Weight>("-1").is_err());
        assert!(serde_json::from_str::<Weight>("\"heavy\"").is_err());
    }

    #[test]
    fn blank_or_null_weight_decodes_as_zero() {
        assert_eq!(serde_json::from_str::<Weight>("\"\"").unwrap(), Weight::ZERO);
        assert_eq!(serde_json::from_str::<Weight>("\"  \"").unwrap(), Weight::ZERO);
        assert_eq!(serde_json::from_str::<Weight>("null").unwrap(), Weight::ZERO);
        // Typed input stays strict.
        assert!("".parse::<Weight>().is_err());
    }

    #[test]
    fn out_of_range_grams_are_rejected() {
        assert!(Weight::from_grams(1e30).is_err());
        assert!(Weight::from_grams(u64::MAX as f64).is_err());
        assert!("1e30".parse::<Weight>().is_err());
        assert!(serde_json::from_str::<Weight>("1e30").is_err());
        assert_eq!(Weight::from_grams(1e6).unwrap().milligrams(), 1_000_000_000);
    }

    #[test]
    fn encodes_whole_grams_as_integers() {
        assert_eq!(serde_json::to_string(&Weight::from_milligrams(40_000)).unwrap(), "40");
        assert_eq!(serde_json::to_string(&Weight::from_milligrams(2_250)).unwrap(), "2.25");
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Weight::from_milligrams(10_500).to_string(), "10.5");
        assert_eq!(Weight::from_milligrams(10_000).to_string(), "10");
        assert_eq!(Weight::from_milligrams(5).to_string(), "0.005");
    }
}
