//! Work Inspection Request (WIR) records.
//!
//! A WIR is the formal checkpoint a box activity flagged as an inspection
//! gate must pass before it may complete.

use crate::ids::{BoxActivityId, MemberId, WirId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inspection request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WirStatus {
    /// Submitted, waiting for an inspector.
    Requested,
    /// An inspector is reviewing the work.
    UnderReview,
    /// Inspection passed; the checkpoint may complete.
    Approved,
    /// Inspection failed; may be resubmitted or closed.
    Rejected,
    /// Rejection accepted as final.
    Closed,
}

impl WirStatus {
    /// Approved and Closed records never change again.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, WirStatus::Approved | WirStatus::Closed)
    }
}

/// One inspection request raised against a checkpoint activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirRecord {
    /// Row identifier.
    pub id: WirId,
    /// Checkpoint activity under inspection.
    pub box_activity_id: BoxActivityId,
    /// Inspection code copied from the activity, e.g. "WIR-CAST".
    pub wir_code: Option<String>,
    /// Current status.
    pub status: WirStatus,
    /// Who raised the request.
    pub requested_by: MemberId,
    /// Inspector assigned once review begins.
    pub inspector: Option<MemberId>,
    /// Free-text inspection notes.
    pub notes: Option<String>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// When the request was raised.
    pub requested_at: DateTime<Utc>,
    /// When the review reached a verdict.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl WirRecord {
    /// Raise a new request in `Requested` state.
    #[must_use]
    pub fn new(
        box_activity_id: BoxActivityId,
        wir_code: Option<String>,
        requested_by: MemberId,
    ) -> Self {
        Self {
            id: WirId::new(),
            box_activity_id,
            wir_code,
            status: WirStatus::Requested,
            requested_by,
            inspector: None,
            notes: None,
            rejection_reason: None,
            requested_at: Utc::now(),
            reviewed_at: None,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_requested() {
        let record = WirRecord::new(BoxActivityId::new(), Some("WIR-CAST".into()), MemberId::new());
        assert_eq!(record.status, WirStatus::Requested);
        assert!(record.reviewed_at.is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(WirStatus::Approved.is_terminal());
        assert!(WirStatus::Closed.is_terminal());
        assert!(!WirStatus::Rejected.is_terminal());
    }
}
