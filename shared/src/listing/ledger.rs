//! Quantity ledger — the `available` / `reserved` pair
//!
//! All quantities are exact decimals; the ledger never rounds and never
//! converts units. Invariant held after every operation:
//! `0 <= reserved <= available`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::QuantityUnit;

/// Ledger operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        requested: Decimal,
        available: Decimal,
    },

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

/// The quantity ledger embedded in a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quantity {
    /// Total quantity still for sale (includes reserved holds)
    pub available: Decimal,
    pub unit: QuantityUnit,
    /// Quantity provisionally held by buyers, `<= available`
    #[serde(default)]
    pub reserved: Decimal,
}

impl Quantity {
    pub fn new(available: Decimal, unit: QuantityUnit) -> Self {
        Self {
            available,
            unit,
            reserved: Decimal::ZERO,
        }
    }

    /// Quantity a new reservation can still claim: `available - reserved`
    pub fn actual_available(&self) -> Decimal {
        (self.available - self.reserved).max(Decimal::ZERO)
    }

    /// Place a provisional hold of `amount`
    ///
    /// Fails without mutating the ledger if `amount` exceeds
    /// [`actual_available`](Self::actual_available).
    pub fn reserve(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        require_positive(amount)?;
        let actual = self.actual_available();
        if amount > actual {
            return Err(LedgerError::InsufficientQuantity {
                requested: amount,
                available: actual,
            });
        }
        self.reserved += amount;
        Ok(())
    }

    /// Release a hold of `amount`, clamped at zero
    ///
    /// Releasing more than is reserved is not an error: the buyer's hold
    /// simply vanishes. `available` is never raised by a release.
    pub fn release(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        require_positive(amount)?;
        self.reserved = (self.reserved - amount).max(Decimal::ZERO);
        Ok(())
    }

    /// Fulfill an order of `amount`
    ///
    /// Decrements `available` by `amount` and `reserved` by
    /// `min(reserved, amount)`. Returns `true` when the listing is now
    /// sold out (`available == 0`). Fails without mutating the ledger if
    /// `amount > available`.
    pub fn reduce(&mut self, amount: Decimal) -> Result<bool, LedgerError> {
        require_positive(amount)?;
        if amount > self.available {
            return Err(LedgerError::InsufficientQuantity {
                requested: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        self.reserved = (self.reserved - amount).max(Decimal::ZERO);
        Ok(self.available <= Decimal::ZERO)
    }
}

/// Shared positivity check for ledger amounts
pub fn require_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn qty(available: i64) -> Quantity {
        Quantity::new(Decimal::from(available), QuantityUnit::Kg)
    }

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn reserve_within_actual_available() {
        let mut q = qty(100);
        q.reserve(dec(30)).unwrap();
        assert_eq!(q.reserved, dec(30));
        assert_eq!(q.actual_available(), dec(70));
    }

    #[test]
    fn reserve_beyond_actual_available_leaves_ledger_unchanged() {
        let mut q = qty(100);
        q.reserve(dec(30)).unwrap();

        let err = q.reserve(dec(80)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientQuantity {
                requested: dec(80),
                available: dec(70),
            }
        );
        assert_eq!(q.reserved, dec(30));
        assert_eq!(q.available, dec(100));
    }

    #[test]
    fn reserve_rejects_non_positive_amounts() {
        let mut q = qty(100);
        assert!(matches!(
            q.reserve(Decimal::ZERO),
            Err(LedgerError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            q.reserve(dec(-5)),
            Err(LedgerError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn release_clamps_at_zero() {
        let mut q = qty(100);
        q.reserve(dec(20)).unwrap();
        q.release(dec(50)).unwrap();
        assert_eq!(q.reserved, Decimal::ZERO);
        // release never raises available
        assert_eq!(q.available, dec(100));
    }

    #[test]
    fn repeated_release_never_goes_negative() {
        let mut q = qty(10);
        q.reserve(dec(5)).unwrap();
        q.release(dec(3)).unwrap();
        q.release(dec(3)).unwrap();
        q.release(dec(3)).unwrap();
        assert_eq!(q.reserved, Decimal::ZERO);
    }

    #[test]
    fn reduce_consumes_available_and_reserved() {
        let mut q = qty(100);
        q.reserve(dec(30)).unwrap();

        let sold_out = q.reduce(dec(40)).unwrap();
        assert!(!sold_out);
        assert_eq!(q.available, dec(60));
        // reserved decremented by min(reserved, amount)
        assert_eq!(q.reserved, Decimal::ZERO);
    }

    #[test]
    fn reduce_to_zero_reports_sold_out() {
        let mut q = qty(100);
        let sold_out = q.reduce(dec(100)).unwrap();
        assert!(sold_out);
        assert_eq!(q.available, Decimal::ZERO);
        assert_eq!(q.reserved, Decimal::ZERO);
    }

    #[test]
    fn reduce_beyond_available_leaves_ledger_unchanged() {
        let mut q = qty(50);
        q.reserve(dec(10)).unwrap();

        let err = q.reduce(dec(60)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientQuantity {
                requested: dec(60),
                available: dec(50),
            }
        );
        assert_eq!(q.available, dec(50));
        assert_eq!(q.reserved, dec(10));
    }

    #[test]
    fn fractional_amounts_are_exact() {
        let mut q = Quantity::new(Decimal::from_str("10.5").unwrap(), QuantityUnit::Quintal);
        q.reserve(Decimal::from_str("0.1").unwrap()).unwrap();
        q.reserve(Decimal::from_str("0.2").unwrap()).unwrap();
        assert_eq!(q.reserved, Decimal::from_str("0.3").unwrap());
        assert_eq!(q.actual_available(), Decimal::from_str("10.2").unwrap());
    }

    #[test]
    fn invariant_reserved_never_exceeds_available() {
        let mut q = qty(100);
        q.reserve(dec(100)).unwrap();
        assert_eq!(q.actual_available(), Decimal::ZERO);
        assert!(q.reserve(dec(1)).is_err());
        assert!(q.reserved <= q.available);
    }
}
