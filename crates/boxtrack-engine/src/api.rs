//! Operational traits and receipts.
//!
//! The traits are the engine's caller-facing seams: scheduling, the
//! material ledger, the inspection gate, and progress readouts. All of
//! them reject invalid work synchronously with no partial mutation;
//! version conflicts are retried once before surfacing.

use crate::ledger::StockLevels;
use async_trait::async_trait;
use boxtrack_core::{
    ActivityStatus, BoxActivity, BoxActivityId, BoxId, BoxMaterial, BoxMaterialId, EngineError,
    MaterialId, MemberId, ProjectId, TransactionId, WirId, WirRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Receipt of a completed activity status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionReceipt {
    /// Activity moved.
    pub activity_id: BoxActivityId,
    /// Status before.
    pub from: ActivityStatus,
    /// Status after.
    pub to: ActivityStatus,
    /// Row version after the move.
    pub version: u64,
    /// Box progress after re-aggregation.
    pub box_progress: f64,
    /// When the move materialized.
    pub timestamp: DateTime<Utc>,
}

/// Receipt of a committed material reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationReceipt {
    /// Ledger row recording the allocation.
    pub transaction_id: TransactionId,
    /// Material reserved.
    pub material_id: MaterialId,
    /// Requirement row the reservation covers.
    pub box_material_id: BoxMaterialId,
    /// Units reserved.
    pub quantity: u64,
    /// Stock counters after commit.
    pub levels: StockLevels,
}

/// Outcome of reconciling a material's counters against its ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Material reconciled.
    pub material_id: MaterialId,
    /// Levels computed by replaying the ledger from zero.
    pub ledger: StockLevels,
    /// Levels found on the row before reconciliation.
    pub columns: StockLevels,
    /// Whether the row disagreed with the ledger.
    pub drift_detected: bool,
    /// Whether the row was rewritten to the ledger's values.
    pub repaired: bool,
}

/// Schedule instantiation and activity state control.
#[async_trait]
pub trait SchedulePlanner {
    /// Instantiate a box's activity schedule from the catalog.
    ///
    /// Filters templates by the box's type, orders by overall sequence,
    /// assigns per-box-unique sequence numbers, wires the dependency DAG,
    /// and computes planned date windows. Fails without mutation when a
    /// prerequisite is unresolved or the dependencies contain a cycle.
    async fn instantiate_schedule(&self, box_id: BoxId) -> Result<Vec<BoxActivity>, EngineError>;

    /// Move an activity to a new status.
    ///
    /// Completion is gated on finished predecessors and, for checkpoint
    /// activities, an approved inspection. `expected_version` enables
    /// optimistic concurrency; a mismatch is retried once with backoff
    /// before surfacing as a conflict.
    async fn advance_activity(
        &self,
        activity_id: BoxActivityId,
        to: ActivityStatus,
        expected_version: Option<u64>,
    ) -> Result<TransitionReceipt, EngineError>;

    /// Record crew-reported progress on an in-progress activity.
    ///
    /// Reporting 100 does not complete the activity; completion stays an
    /// explicit `advance_activity` call.
    async fn set_activity_progress(
        &self,
        activity_id: BoxActivityId,
        progress: u8,
    ) -> Result<(), EngineError>;

    /// Statuses the activity may legally move to right now.
    async fn allowed_transitions(
        &self,
        activity_id: BoxActivityId,
    ) -> Result<Vec<ActivityStatus>, EngineError>;
}

/// Stock reservation, consumption, and ledger reconstruction.
#[async_trait]
pub trait MaterialLedger {
    /// Book received stock into a material.
    async fn receive(
        &self,
        material_id: MaterialId,
        quantity: u64,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError>;

    /// Declare a box's requirement for a material.
    async fn require_material(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
        quantity: u64,
    ) -> Result<BoxMaterial, EngineError>;

    /// Reserve stock against a box's requirement.
    ///
    /// The availability check runs inside the same critical section that
    /// writes the ledger row; shortfall aborts, it is never clamped.
    async fn reserve(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
        quantity: u64,
        actor: MemberId,
    ) -> Result<ReservationReceipt, EngineError>;

    /// Consume a reserved requirement.
    async fn consume(
        &self,
        box_material_id: BoxMaterialId,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError>;

    /// Reverse an un-consumed reservation.
    async fn release(
        &self,
        box_material_id: BoxMaterialId,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError>;

    /// Fold the material's ledger from zero into stock levels.
    async fn replay_stock(&self, material_id: MaterialId) -> Result<StockLevels, EngineError>;

    /// Recompute the material's counters from the ledger, repairing drift.
    async fn reconcile(&self, material_id: MaterialId) -> Result<ReconcileReport, EngineError>;
}

/// Formal inspection workflow over checkpoint activities.
#[async_trait]
pub trait InspectionGate {
    /// Raise an inspection request against a checkpoint activity.
    async fn request_inspection(
        &self,
        activity_id: BoxActivityId,
        requested_by: MemberId,
    ) -> Result<WirRecord, EngineError>;

    /// Assign an inspector and begin review.
    async fn begin_review(&self, wir_id: WirId, inspector: MemberId) -> Result<(), EngineError>;

    /// Approve a record under review, unblocking checkpoint completion.
    ///
    /// Approval never flips activity status itself; completing the
    /// checkpoint remains an explicit `advance_activity` call.
    async fn approve(&self, wir_id: WirId, notes: Option<String>) -> Result<(), EngineError>;

    /// Reject a record under review with a reason.
    async fn reject(&self, wir_id: WirId, reason: String) -> Result<(), EngineError>;

    /// Resubmit a rejected record for a fresh review round.
    async fn resubmit(&self, wir_id: WirId) -> Result<(), EngineError>;

    /// Accept a rejection as final.
    async fn close(&self, wir_id: WirId) -> Result<(), EngineError>;
}

/// Progress roll-up readouts.
#[async_trait]
pub trait ProgressReporter {
    /// Current duration-weighted progress of a box.
    async fn box_progress(&self, box_id: BoxId) -> Result<f64, EngineError>;

    /// Current mean progress over a project's boxes.
    async fn project_progress(&self, project_id: ProjectId) -> Result<f64, EngineError>;

    /// Recompute and persist a box's progress and derived status.
    async fn recompute_box(&self, box_id: BoxId) -> Result<f64, EngineError>;
}
