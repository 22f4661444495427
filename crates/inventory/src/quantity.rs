use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, ValueObject};

/// A non-negative whole number of units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// `None` when the result would drop below zero.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        let v = self.0 - other.0;
        (v >= 0).then_some(Quantity(v))
    }
}

impl ValueObject for Quantity {}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quantity as it arrives from a client: a JSON number or a string cell from an
/// uploaded sheet. Convert with [`QuantityInput::parse`] before any write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl QuantityInput {
    pub fn parse(&self) -> DomainResult<Quantity> {
        match self {
            QuantityInput::Integer(v) => Quantity::new(*v),
            QuantityInput::Number(v) => {
                if !v.is_finite() || v.fract() != 0.0 {
                    return Err(DomainError::validation(format!(
                        "quantity must be a whole number (got {v})"
                    )));
                }
                if *v < i64::MIN as f64 || *v > i64::MAX as f64 {
                    return Err(DomainError::validation("quantity is out of range"));
                }
                Quantity::new(*v as i64)
            }
            QuantityInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err(DomainError::validation("quantity is required"));
                }
                let v: i64 = s.parse().map_err(|_| {
                    DomainError::validation(format!("quantity must be a whole number (got {s:?})"))
                })?;
                Quantity::new(v)
            }
        }
    }
}

impl From<i64> for QuantityInput {
    fn from(value: i64) -> Self {
        QuantityInput::Integer(value)
    }
}
