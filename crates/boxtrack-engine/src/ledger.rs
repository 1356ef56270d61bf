//! Stock movement arithmetic and ledger replay.
//!
//! The transaction ledger is the source of truth for material stock; the
//! counters on a `Material` row are a rebuildable projection. Every
//! movement is applied with checked arithmetic and the stock invariant
//! (`allocated <= current`) is verified before anything is committed.

use boxtrack_core::{Material, MaterialTransaction, StockError, TransactionKind};
use serde::{Deserialize, Serialize};

/// Snapshot of the two stock counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    /// Units physically on hand.
    pub current: u64,
    /// Units reserved but not yet consumed.
    pub allocated: u64,
}

impl StockLevels {
    /// Levels read from a material row.
    #[inline]
    #[must_use]
    pub fn of(material: &Material) -> Self {
        Self {
            current: material.current_stock,
            allocated: material.allocated_stock,
        }
    }

    /// Units not reserved.
    #[inline]
    #[must_use]
    pub fn available(self) -> u64 {
        self.current.saturating_sub(self.allocated)
    }

    /// Apply one movement, checked.
    ///
    /// # Errors
    /// - `StockError::Underflow` when a counter would go below zero
    /// - `StockError::InvariantViolated` when reservations would exceed
    ///   stock on hand after the movement
    pub fn apply(
        self,
        kind: TransactionKind,
        quantity: u64,
        material: &Material,
    ) -> Result<Self, StockError> {
        let underflow = || StockError::Underflow {
            material: material.code.clone(),
        };

        let next = match kind {
            TransactionKind::Receipt => Self {
                current: self.current.checked_add(quantity).ok_or_else(underflow)?,
                allocated: self.allocated,
            },
            TransactionKind::Allocation => Self {
                current: self.current,
                allocated: self.allocated.checked_add(quantity).ok_or_else(underflow)?,
            },
            TransactionKind::Consumption => Self {
                current: self.current.checked_sub(quantity).ok_or_else(underflow)?,
                allocated: self.allocated.checked_sub(quantity).ok_or_else(underflow)?,
            },
            TransactionKind::Return => Self {
                current: self.current,
                allocated: self.allocated.checked_sub(quantity).ok_or_else(underflow)?,
            },
        };

        if next.allocated > next.current {
            return Err(StockError::InvariantViolated {
                material: material.code.clone(),
            });
        }
        Ok(next)
    }
}

/// Fold a material's transactions from zero into stock levels.
///
/// Replay applies the same checked arithmetic as live mutation, so a
/// ledger that was only ever written through the engine always replays
/// cleanly; an error here means the ledger itself is inconsistent.
pub fn replay<'a>(
    material: &Material,
    transactions: impl IntoIterator<Item = &'a MaterialTransaction>,
) -> Result<StockLevels, StockError> {
    let mut levels = StockLevels::default();
    for txn in transactions {
        levels = levels.apply(txn.kind, txn.quantity, material)?;
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxtrack_core::MemberId;

    fn cement() -> Material {
        Material::new("M-CEMENT", "Portland cement", "kg")
    }

    fn txn(material: &Material, kind: TransactionKind, quantity: u64) -> MaterialTransaction {
        MaterialTransaction::new(material.id, kind, quantity, MemberId::new())
    }

    #[test]
    fn receipt_then_allocation() {
        let material = cement();
        let levels = StockLevels::default()
            .apply(TransactionKind::Receipt, 100, &material)
            .unwrap()
            .apply(TransactionKind::Allocation, 30, &material)
            .unwrap();

        assert_eq!(levels, StockLevels { current: 100, allocated: 30 });
        assert_eq!(levels.available(), 70);
    }

    #[test]
    fn consumption_decrements_both_counters() {
        let material = cement();
        let levels = StockLevels { current: 100, allocated: 30 }
            .apply(TransactionKind::Consumption, 30, &material)
            .unwrap();
        assert_eq!(levels, StockLevels { current: 70, allocated: 0 });
    }

    #[test]
    fn return_releases_reservation_only() {
        let material = cement();
        let levels = StockLevels { current: 100, allocated: 30 }
            .apply(TransactionKind::Return, 30, &material)
            .unwrap();
        assert_eq!(levels, StockLevels { current: 100, allocated: 0 });
    }

    #[test]
    fn allocation_beyond_stock_violates_invariant() {
        let material = cement();
        let err = StockLevels { current: 100, allocated: 80 }
            .apply(TransactionKind::Allocation, 30, &material)
            .unwrap_err();
        assert!(matches!(err, StockError::InvariantViolated { .. }));
    }

    #[test]
    fn consumption_underflow_is_rejected() {
        let material = cement();
        let err = StockLevels { current: 10, allocated: 5 }
            .apply(TransactionKind::Consumption, 20, &material)
            .unwrap_err();
        assert!(matches!(err, StockError::Underflow { .. }));
    }

    #[test]
    fn replay_reproduces_counters() {
        let material = cement();
        let history = vec![
            txn(&material, TransactionKind::Receipt, 100),
            txn(&material, TransactionKind::Allocation, 30),
            txn(&material, TransactionKind::Allocation, 50),
            txn(&material, TransactionKind::Consumption, 30),
            txn(&material, TransactionKind::Return, 50),
            txn(&material, TransactionKind::Receipt, 25),
        ];

        let levels = replay(&material, &history).unwrap();
        assert_eq!(levels, StockLevels { current: 95, allocated: 0 });
    }

    #[test]
    fn replay_of_empty_ledger_is_zero() {
        let material = cement();
        let levels = replay(&material, std::iter::empty::<&MaterialTransaction>()).unwrap();
        assert_eq!(levels, StockLevels::default());
    }
}
