//! Hash-chained audit trail.
//!
//! Append-only record of materialized mutations. Each event carries the
//! hash of its predecessor, so tampering or loss anywhere in the chain is
//! detectable by a single forward walk. Rejected operations are never
//! recorded here.

use boxtrack_core::AuditEventId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One audited mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: AuditEventId,
    /// When the mutation materialized.
    pub timestamp: DateTime<Utc>,
    /// Entity kind, e.g. "box_activity".
    pub entity: String,
    /// Entity key.
    pub entity_key: String,
    /// Operation name, e.g. "advance".
    pub action: String,
    /// Human-readable outcome details.
    pub detail: String,
    /// Hash of the preceding event (zero for the first).
    pub prev_hash: [u8; 32],
    /// Hash over this event's fields and `prev_hash`.
    pub hash: [u8; 32],
}

impl AuditEvent {
    /// Hex rendering of the event hash, for reports.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Report produced by a chain walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Whether the full chain verified.
    pub valid: bool,
    /// Events inspected.
    pub events_checked: usize,
    /// Index of the first broken link, when invalid.
    pub first_invalid_index: Option<usize>,
}

/// Append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl AuditLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a materialized mutation.
    pub fn record(
        &self,
        entity: impl Into<String>,
        entity_key: impl std::fmt::Display,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> AuditEventId {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);

        let mut event = AuditEvent {
            event_id: AuditEventId::new(),
            timestamp: Utc::now(),
            entity: entity.into(),
            entity_key: entity_key.to_string(),
            action: action.into(),
            detail: detail.into(),
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = compute_hash(&event);

        let id = event.event_id;
        guard.push(event);
        id
    }

    /// Snapshot of all events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the chain and verify every link.
    #[must_use]
    pub fn verify_integrity(&self) -> IntegrityReport {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, event) in guard.iter().enumerate() {
            if event.prev_hash != prev || event.hash != compute_hash(event) {
                return IntegrityReport {
                    valid: false,
                    events_checked: guard.len(),
                    first_invalid_index: Some(index),
                };
            }
            prev = event.hash;
        }
        IntegrityReport {
            valid: true,
            events_checked: guard.len(),
            first_invalid_index: None,
        }
    }
}

fn compute_hash(event: &AuditEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.0.as_bytes());
    hasher.update(event.timestamp.to_rfc3339().as_bytes());
    hasher.update(event.entity.as_bytes());
    hasher.update([0]);
    hasher.update(event.entity_key.as_bytes());
    hasher.update([0]);
    hasher.update(event.action.as_bytes());
    hasher.update([0]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_verifies() {
        let log = AuditLog::new();
        let report = log.verify_integrity();
        assert!(report.valid);
        assert_eq!(report.events_checked, 0);
    }

    #[test]
    fn chain_links_consecutive_events() {
        let log = AuditLog::new();
        log.record("material", "M-CEMENT", "receive", "qty=100");
        log.record("material", "M-CEMENT", "reserve", "qty=30");

        let events = log.events();
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert!(log.verify_integrity().valid);
    }

    #[test]
    fn detects_tampering() {
        let log = AuditLog::new();
        log.record("box", "B-101", "create", "type=Standard");
        log.record("box", "B-101", "schedule", "activities=3");

        {
            let mut guard = log.inner.lock();
            guard[0].detail = String::from("type=Bathroom");
        }

        let report = log.verify_integrity();
        assert!(!report.valid);
        assert_eq!(report.first_invalid_index, Some(0));
    }
}
