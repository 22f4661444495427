//! Inventory quantity reconciliation.
//!
//! Manual adjustment, single create and bulk upload all compute the new on-hand
//! quantity through [`reconcile`]. Storage backends call it inside their
//! critical section (row lock or write lock), so the computed delta always
//! matches the value that gets written.

use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult};

use crate::quantity::Quantity;

/// Adjustment mode accepted by the adjustment endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdjustmentType {
    Add,
    Subtract,
    Set,
}

impl AdjustmentType {
    pub fn with(self, amount: Quantity) -> Adjustment {
        match self {
            AdjustmentType::Add => Adjustment::Add(amount),
            AdjustmentType::Subtract => Adjustment::Subtract(amount),
            AdjustmentType::Set => Adjustment::Set(amount),
        }
    }
}

/// Bulk upload semantics for matched rows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Amount is added to the existing on-hand.
    Add,
    /// Amount becomes the new on-hand.
    Replace,
}

impl UploadMode {
    pub fn with(self, amount: Quantity) -> Adjustment {
        match self {
            UploadMode::Add => Adjustment::Add(amount),
            UploadMode::Replace => Adjustment::Set(amount),
        }
    }
}

/// A requested change to an on-hand quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "amount", rename_all = "snake_case")]
pub enum Adjustment {
    Add(Quantity),
    Subtract(Quantity),
    Set(Quantity),
}

/// Outcome of [`reconcile`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub previous: Quantity,
    pub on_hand: Quantity,
    /// Signed `on_hand - previous`; recorded on the ledger.
    pub delta: i64,
}

/// Compute the new on-hand quantity for `adjustment` applied to `on_hand`.
///
/// `Subtract` below zero is a validation error; the result is never clamped.
pub fn reconcile(on_hand: Quantity, adjustment: Adjustment) -> DomainResult<Reconciliation> {
    let next = match adjustment {
        Adjustment::Add(amount) => on_hand
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("resulting quantity is too large"))?,
        Adjustment::Subtract(amount) => on_hand.checked_sub(amount).ok_or_else(|| {
            DomainError::validation(format!(
                "cannot subtract {amount} from on-hand quantity {on_hand}: result would be negative"
            ))
        })?,
        Adjustment::Set(amount) => amount,
    };

    Ok(Reconciliation {
        previous: on_hand,
        on_hand: next,
        delta: next.get() - on_hand.get(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(v: i64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    #[test]
    fn add_increases_on_hand_and_records_positive_delta() {
        let r = reconcile(q(10), Adjustment::Add(q(20))).unwrap();
        assert_eq!(r.previous, q(10));
        assert_eq!(r.on_hand, q(30));
        assert_eq!(r.delta, 20);
    }

    #[test]
    fn subtract_below_zero_is_rejected() {
        let err = reconcile(q(10), Adjustment::Subtract(q(15))).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("negative")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn subtract_to_exactly_zero_is_allowed() {
        let r = reconcile(q(10), Adjustment::Subtract(q(10))).unwrap();
        assert_eq!(r.on_hand, Quantity::ZERO);
        assert_eq!(r.delta, -10);
    }

    #[test]
    fn set_records_negative_delta_when_lowering() {
        let r = reconcile(q(50), Adjustment::Set(q(20))).unwrap();
        assert_eq!(r.on_hand, q(20));
        assert_eq!(r.delta, -30);
    }

    #[test]
    fn add_overflow_is_a_validation_error() {
        let err = reconcile(q(i64::MAX), Adjustment::Add(q(1))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn upload_modes_map_to_add_and_set() {
        assert_eq!(UploadMode::Add.with(q(5)), Adjustment::Add(q(5)));
        assert_eq!(UploadMode::Replace.with(q(5)), Adjustment::Set(q(5)));
    }

    #[test]
    fn adjustment_type_uses_uppercase_wire_names() {
        let t: AdjustmentType = serde_json::from_str("\"SUBTRACT\"").unwrap();
        assert_eq!(t, AdjustmentType::Subtract);
        assert!(serde_json::from_str::<AdjustmentType>("\"subtract\"").is_err());
    }

    #[test]
    fn upload_mode_uses_lowercase_wire_names() {
        let m: UploadMode = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(m, UploadMode::Replace);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        #[test]
        fn add_is_sum(old in 0i64..1_000_000_000, amount in 0i64..1_000_000_000) {
            let r = reconcile(q(old), Adjustment::Add(q(amount))).unwrap();
            prop_assert_eq!(r.on_hand.get(), old + amount);
            prop_assert_eq!(r.delta, amount);
        }

        #[test]
        fn subtract_is_difference_or_rejected(old in 0i64..1_000_000, amount in 0i64..1_000_000) {
            let res = reconcile(q(old), Adjustment::Subtract(q(amount)));
            if amount <= old {
                let r = res.unwrap();
                prop_assert_eq!(r.on_hand.get(), old - amount);
                prop_assert_eq!(r.delta, -amount);
            } else {
                prop_assert!(matches!(res, Err(DomainError::Validation(_))));
            }
        }

        #[test]
        fn set_ignores_old(old in 0i64..1_000_000, amount in 0i64..1_000_000) {
            let r = reconcile(q(old), Adjustment::Set(q(amount))).unwrap();
            prop_assert_eq!(r.on_hand.get(), amount);
            prop_assert_eq!(r.delta, amount - old);
        }

        /// Property: replace is idempotent, add is not.
        #[test]
        fn replace_idempotent_add_accumulates(old in 0i64..1_000_000, amount in 1i64..1_000_000) {
            let once = reconcile(q(old), UploadMode::Replace.with(q(amount))).unwrap();
            let twice = reconcile(once.on_hand, UploadMode::Replace.with(q(amount))).unwrap();
            prop_assert_eq!(once.on_hand, twice.on_hand);
            prop_assert_eq!(twice.delta, 0);

            let once = reconcile(q(old), UploadMode::Add.with(q(amount))).unwrap();
            let twice = reconcile(once.on_hand, UploadMode::Add.with(q(amount))).unwrap();
            prop_assert_eq!(twice.on_hand.get(), old + 2 * amount);
        }
    }
}
