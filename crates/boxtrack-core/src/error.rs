//! Error taxonomy for the production workflow.
//!
//! Every operation fails with one of five concerns:
//! - input validation and referential integrity
//! - illegal state-machine moves
//! - stock invariant violations
//! - schedule construction defects
//! - optimistic-concurrency conflicts
//!
//! Rejections are all-or-nothing: an error leaves no partial mutation.

use crate::activity::{ActivityCode, ActivityStatus};
use crate::ids::{BoxActivityId, BoxId};
use crate::material::{BoxMaterialStatus, MaterialCode};
use crate::wir::WirStatus;

/// Malformed input or a broken referential-integrity expectation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Quantities must be strictly positive.
    #[error("quantity must be positive")]
    ZeroQuantity,

    /// Progress percentages live in 0..=100.
    #[error("progress {0} out of range 0..=100")]
    ProgressOutOfRange(u8),

    /// A unique key was reused.
    #[error("duplicate {entity}: {key}")]
    Duplicate {
        /// Entity kind, e.g. "project code".
        entity: &'static str,
        /// Offending key.
        key: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind, e.g. "material".
        entity: &'static str,
        /// Missing key.
        key: String,
    },

    /// A box schedule may only be instantiated once.
    #[error("box {0} already has a schedule")]
    AlreadyScheduled(BoxId),

    /// Inspections may only be raised against checkpoint activities.
    #[error("activity {0} is not an inspection checkpoint")]
    NotACheckpoint(BoxActivityId),

    /// Only one non-terminal inspection per activity at a time.
    #[error("activity {0} already has an open inspection")]
    OpenInspectionExists(BoxActivityId),

    /// A rejection verdict needs a reason.
    #[error("rejection reason must not be empty")]
    EmptyRejectionReason,

    /// Crew progress may only be reported on in-progress work.
    #[error("activity {0} is not in progress")]
    NotInProgress(BoxActivityId),
}

/// An illegal state-machine move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Activity status transition not in the legal set.
    #[error("illegal activity transition: {from:?} -> {to:?}")]
    Activity {
        /// Status before the attempt.
        from: ActivityStatus,
        /// Requested status.
        to: ActivityStatus,
    },

    /// Inspection status transition not in the legal set.
    #[error("illegal inspection transition: {from:?} -> {to:?}")]
    Wir {
        /// Status before the attempt.
        from: WirStatus,
        /// Requested status.
        to: WirStatus,
    },

    /// Requirement-row lifecycle move not in the legal set.
    #[error("illegal material requirement transition: {from:?} -> {to:?}")]
    BoxMaterial {
        /// Status before the attempt.
        from: BoxMaterialStatus,
        /// Requested status.
        to: BoxMaterialStatus,
    },

    /// Completion attempted while a predecessor is unfinished.
    #[error("activity {activity} has unfinished predecessor {predecessor}")]
    PredecessorsIncomplete {
        /// Activity being completed.
        activity: BoxActivityId,
        /// First unfinished predecessor found.
        predecessor: BoxActivityId,
    },

    /// Completion attempted on a checkpoint without an approved inspection.
    #[error("checkpoint activity {0} has no approved inspection")]
    CheckpointNotApproved(BoxActivityId),
}

/// A reservation or consumption that would break the stock invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    /// `current - allocated` cannot cover the request.
    #[error("insufficient stock of {material}: requested {requested}, available {available}")]
    Insufficient {
        /// Material code.
        material: MaterialCode,
        /// Units requested.
        requested: u64,
        /// Units unreserved at the time of the check.
        available: u64,
    },

    /// A movement would drive a counter out of range.
    #[error("stock movement would overrun counters of {material}")]
    Underflow {
        /// Material code.
        material: MaterialCode,
    },

    /// A movement would leave reservations exceeding stock on hand.
    #[error("allocated stock would exceed stock on hand for {material}")]
    InvariantViolated {
        /// Material code.
        material: MaterialCode,
    },
}

/// A defect detected while instantiating a box schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// A prerequisite code is absent from the box's instantiated schedule.
    #[error("activity {activity} references unknown prerequisite {prerequisite}")]
    UnknownPrerequisite {
        /// Activity declaring the prerequisite.
        activity: ActivityCode,
        /// The unresolved code.
        prerequisite: ActivityCode,
    },

    /// An activity may not depend on itself.
    #[error("activity {0} depends on itself")]
    SelfDependency(ActivityCode),

    /// The dependency edges do not form a DAG.
    #[error("dependency cycle detected in schedule for box {0}")]
    CycleDetected(BoxId),
}

/// Optimistic-concurrency conflict: the row changed under the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("concurrent update on {entity} {key}: expected version {expected}, found {found}")]
pub struct ConflictError {
    /// Entity kind, e.g. "box activity".
    pub entity: &'static str,
    /// Row key.
    pub key: String,
    /// Version the caller read.
    pub expected: u64,
    /// Version currently stored.
    pub found: u64,
}

/// Audit chain violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// The hash chain does not verify from the given index on.
    #[error("audit chain broken at event {0}")]
    ChainBroken(usize),
}

/// Top-level error for every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed input or missing row.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Illegal state-machine move.
    #[error("invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// Stock invariant violation.
    #[error("stock violation: {0}")]
    Stock(#[from] StockError),

    /// Schedule construction defect.
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    /// Row version mismatch.
    #[error("concurrency conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Audit log violation.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

impl EngineError {
    /// Whether an automatic retry may succeed.
    ///
    /// Only version conflicts are transient; every other concern is
    /// deterministic and retrying would fail identically.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Convenience constructor for not-found errors.
#[inline]
#[must_use]
pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> ValidationError {
    ValidationError::NotFound {
        entity,
        key: key.to_string(),
    }
}

/// Convenience constructor for duplicate-key errors.
#[inline]
#[must_use]
pub fn duplicate(entity: &'static str, key: impl std::fmt::Display) -> ValidationError {
    ValidationError::Duplicate {
        entity,
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = EngineError::from(ConflictError {
            entity: "box activity",
            key: "a".into(),
            expected: 1,
            found: 2,
        });
        assert!(conflict.is_retryable());

        let validation = EngineError::from(ValidationError::ZeroQuantity);
        assert!(!validation.is_retryable());

        let stock = EngineError::from(StockError::Insufficient {
            material: MaterialCode::new("M-CEMENT"),
            requested: 30,
            available: 20,
        });
        assert!(!stock.is_retryable());
    }

    #[test]
    fn error_display_carries_context() {
        let err = StockError::Insufficient {
            material: MaterialCode::new("M-CEMENT"),
            requested: 30,
            available: 20,
        };
        let text = err.to_string();
        assert!(text.contains("M-CEMENT"));
        assert!(text.contains("30"));
        assert!(text.contains("20"));
    }
}
