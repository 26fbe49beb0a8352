use super::fixed_point::{FixedPointVisitor, format_fixed, parse_fixed, pow10};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const MONEY_SCALE: u32 = 2;
const QUANTITY_SCALE: u32 = 3;

/// Non-negative monetary amount held in minor units (1/100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Result<Self, String> {
        if minor < 0 {
            return Err(format!("Money cannot be negative: {minor}"));
        }
        Ok(Self(minor))
    }

    pub fn from_major(major: i64) -> Result<Self, String> {
        let minor = major
            .checked_mul(pow10(MONEY_SCALE))
            .ok_or_else(|| format!("Money out of range: {major}"))?;
        Self::from_minor(minor)
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        parse_fixed(value, MONEY_SCALE).map(Self)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `None` when the result would be negative.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0
            .checked_sub(other.0)
            .filter(|value| *value >= 0)
            .map(Money)
    }

    /// Price times quantity, rounded half-up to the nearest minor unit.
    pub fn times(self, quantity: Quantity) -> Option<Money> {
        let product = i128::from(self.0) * i128::from(quantity.0);
        let divisor = i128::from(pow10(QUANTITY_SCALE));
        let rounded = (product + divisor / 2) / divisor;
        i64::try_from(rounded).ok().map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed(self.0, MONEY_SCALE))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(FixedPointVisitor {
                scale: MONEY_SCALE,
                expecting: "a non-negative amount with at most two decimal places",
            })
            .map(Money)
    }
}

/// Non-negative stock quantity held in thousandths, so loose goods sold by weight stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn from_milli(milli: i64) -> Result<Self, String> {
        if milli < 0 {
            return Err(format!("Quantity cannot be negative: {milli}"));
        }
        Ok(Self(milli))
    }

    pub fn from_units(units: i64) -> Result<Self, String> {
        let milli = units
            .checked_mul(pow10(QUANTITY_SCALE))
            .ok_or_else(|| format!("Quantity out of range: {units}"))?;
        Self::from_milli(milli)
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        parse_fixed(value, QUANTITY_SCALE).map(Self)
    }

    pub fn milli_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Decimal text of `-self`, used for outbound stock deltas.
    pub fn negated_decimal(&self) -> String {
        format_fixed(-self.0, QUANTITY_SCALE)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed(self.0, QUANTITY_SCALE))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(FixedPointVisitor {
                scale: QUANTITY_SCALE,
                expecting: "a non-negative quantity with at most three decimal places",
            })
            .map(Quantity)
    }
}
