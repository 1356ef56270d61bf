//! Materials, per-box requirements, and the stock movement ledger.

use crate::ids::{BoxId, BoxMaterialId, MaterialId, MemberId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog code of a material, e.g. "M-CEMENT".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaterialCode(String);

impl MaterialCode {
    /// Wrap a code string.
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the underlying string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MaterialCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for MaterialCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// A stocked material.
///
/// `current_stock` and `allocated_stock` are a projection of the
/// transaction ledger; the ledger rows, not these counters, are
/// authoritative for recovery and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Row identifier.
    pub id: MaterialId,
    /// Unique material code.
    pub code: MaterialCode,
    /// Human-readable name.
    pub name: String,
    /// Unit of measure, e.g. "kg", "m3".
    pub unit: String,
    /// Units physically on hand.
    pub current_stock: u64,
    /// Units reserved against boxes but not yet consumed.
    pub allocated_stock: u64,
    /// Stock level below which supply is critical.
    pub minimum_stock: u64,
    /// Stock level that should trigger a purchase order.
    pub reorder_level: u64,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl Material {
    /// Register a material with empty stock.
    #[must_use]
    pub fn new(code: impl Into<MaterialCode>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: MaterialId::new(),
            code: code.into(),
            name: name.into(),
            unit: unit.into(),
            current_stock: 0,
            allocated_stock: 0,
            minimum_stock: 0,
            reorder_level: 0,
            version: 0,
        }
    }

    /// With minimum and reorder thresholds.
    #[inline]
    #[must_use]
    pub fn with_thresholds(mut self, minimum: u64, reorder: u64) -> Self {
        self.minimum_stock = minimum;
        self.reorder_level = reorder;
        self
    }

    /// Units on hand that are not reserved.
    #[inline]
    #[must_use]
    pub fn available(&self) -> u64 {
        self.current_stock.saturating_sub(self.allocated_stock)
    }

    /// Whether unreserved stock has fallen to the reorder level.
    #[inline]
    #[must_use]
    pub fn needs_reorder(&self) -> bool {
        self.available() <= self.reorder_level
    }

    /// Stock invariant: reservations never exceed stock on hand.
    #[inline]
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.allocated_stock <= self.current_stock
    }
}

/// Lifecycle of a per-box material requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxMaterialStatus {
    /// Declared but nothing reserved yet.
    Pending,
    /// Stock reserved against the box.
    Allocated,
    /// Reserved stock physically used.
    Consumed,
}

/// Material requirement of one box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxMaterial {
    /// Row identifier.
    pub id: BoxMaterialId,
    /// Owning box.
    pub box_id: BoxId,
    /// Required material.
    pub material_id: MaterialId,
    /// Quantity the box needs in total.
    pub required_qty: u64,
    /// Quantity currently reserved.
    pub allocated_qty: u64,
    /// Quantity already consumed.
    pub consumed_qty: u64,
    /// Allocation lifecycle status.
    pub status: BoxMaterialStatus,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl BoxMaterial {
    /// Declare a pending requirement.
    #[inline]
    #[must_use]
    pub fn new(box_id: BoxId, material_id: MaterialId, required_qty: u64) -> Self {
        Self {
            id: BoxMaterialId::new(),
            box_id,
            material_id,
            required_qty,
            allocated_qty: 0,
            consumed_qty: 0,
            status: BoxMaterialStatus::Pending,
            version: 0,
        }
    }

    /// Whether the requirement is covered (allocated or already consumed).
    #[inline]
    #[must_use]
    pub fn is_covered(&self) -> bool {
        matches!(
            self.status,
            BoxMaterialStatus::Allocated | BoxMaterialStatus::Consumed
        )
    }
}

/// Kind of stock movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Stock arrived from a supplier.
    Receipt,
    /// Stock reserved against a box.
    Allocation,
    /// Reserved stock physically used.
    Consumption,
    /// Reservation reversed without consumption.
    Return,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionKind::Receipt => "receipt",
            TransactionKind::Allocation => "allocation",
            TransactionKind::Consumption => "consumption",
            TransactionKind::Return => "return",
        };
        write!(f, "{s}")
    }
}

/// Append-only ledger row recording one stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialTransaction {
    /// Transaction identifier, sortable by creation time.
    pub id: TransactionId,
    /// Material moved.
    pub material_id: MaterialId,
    /// Box the movement was booked against, when applicable.
    pub box_id: Option<BoxId>,
    /// Requirement row the movement was booked against, when applicable.
    pub box_material_id: Option<BoxMaterialId>,
    /// Movement kind.
    pub kind: TransactionKind,
    /// Units moved; always positive.
    pub quantity: u64,
    /// Who performed the movement.
    pub performed_by: MemberId,
    /// When the movement was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl MaterialTransaction {
    /// Record a movement now.
    #[must_use]
    pub fn new(
        material_id: MaterialId,
        kind: TransactionKind,
        quantity: u64,
        performed_by: MemberId,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            material_id,
            box_id: None,
            box_material_id: None,
            kind,
            quantity,
            performed_by,
            recorded_at: Utc::now(),
        }
    }

    /// Book the movement against a box requirement.
    #[inline]
    #[must_use]
    pub fn against(mut self, box_id: BoxId, box_material_id: BoxMaterialId) -> Self {
        self.box_id = Some(box_id);
        self.box_material_id = Some(box_material_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_never_underflows() {
        let mut material = Material::new("M-CEMENT", "Portland cement", "kg");
        material.allocated_stock = 10;
        assert_eq!(material.available(), 0);
        assert!(!material.invariant_holds());
    }

    #[test]
    fn reorder_triggers_on_available_not_on_hand() {
        let mut material = Material::new("M-REBAR", "Rebar 12mm", "kg").with_thresholds(10, 50);
        material.current_stock = 100;
        material.allocated_stock = 60;
        assert!(material.needs_reorder());
    }

    #[test]
    fn requirement_coverage() {
        let mut requirement = BoxMaterial::new(BoxId::new(), MaterialId::new(), 40);
        assert!(!requirement.is_covered());
        requirement.status = BoxMaterialStatus::Allocated;
        assert!(requirement.is_covered());
    }
}
