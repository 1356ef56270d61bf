//! Legal status moves for activities, inspections, and requirement rows.
//!
//! These tables validate shape only; contextual completion guards
//! (predecessors, inspection approval) live with the engine operations.

use boxtrack_core::{ActivityStatus, BoxMaterialStatus, TransitionError, WirStatus};

/// Validate an activity status move.
pub fn validate_activity_transition(
    from: ActivityStatus,
    to: ActivityStatus,
) -> Result<(), TransitionError> {
    if allowed_activity_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::Activity { from, to })
    }
}

/// Statuses an activity may move to from `from`.
///
/// Terminal statuses (Completed, Skipped) have no exits; blocking is only
/// meaningful for work that has not finished.
pub fn allowed_activity_transitions(from: ActivityStatus) -> Vec<ActivityStatus> {
    use ActivityStatus::*;
    match from {
        Pending => vec![InProgress, Blocked, Skipped],
        InProgress => vec![Completed, Blocked],
        Blocked => vec![Pending],
        Completed => vec![],
        Skipped => vec![],
    }
}

/// Validate an inspection status move.
pub fn validate_wir_transition(from: WirStatus, to: WirStatus) -> Result<(), TransitionError> {
    if allowed_wir_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::Wir { from, to })
    }
}

/// Statuses an inspection may move to from `from`.
///
/// A rejected inspection is resubmitted (back to Requested) or closed;
/// Approved and Closed are sinks.
pub fn allowed_wir_transitions(from: WirStatus) -> Vec<WirStatus> {
    use WirStatus::*;
    match from {
        Requested => vec![UnderReview],
        UnderReview => vec![Approved, Rejected],
        Rejected => vec![Requested, Closed],
        Approved => vec![],
        Closed => vec![],
    }
}

/// Validate a requirement-row lifecycle move.
pub fn validate_box_material_transition(
    from: BoxMaterialStatus,
    to: BoxMaterialStatus,
) -> Result<(), TransitionError> {
    if allowed_box_material_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::BoxMaterial { from, to })
    }
}

/// Statuses a requirement row may move to from `from`.
pub fn allowed_box_material_transitions(from: BoxMaterialStatus) -> Vec<BoxMaterialStatus> {
    use BoxMaterialStatus::*;
    match from {
        Pending => vec![Allocated],
        Allocated => vec![Consumed, Pending],
        Consumed => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_happy_path() {
        use ActivityStatus::*;
        assert!(validate_activity_transition(Pending, InProgress).is_ok());
        assert!(validate_activity_transition(InProgress, Completed).is_ok());
    }

    #[test]
    fn activity_block_and_resume() {
        use ActivityStatus::*;
        assert!(validate_activity_transition(Pending, Blocked).is_ok());
        assert!(validate_activity_transition(InProgress, Blocked).is_ok());
        assert!(validate_activity_transition(Blocked, Pending).is_ok());
        assert!(validate_activity_transition(Blocked, Completed).is_err());
    }

    #[test]
    fn activity_terminal_states_are_sinks() {
        use ActivityStatus::*;
        assert!(allowed_activity_transitions(Completed).is_empty());
        assert!(allowed_activity_transitions(Skipped).is_empty());
        assert!(validate_activity_transition(Completed, InProgress).is_err());
    }

    #[test]
    fn activity_cannot_jump_to_completed() {
        use ActivityStatus::*;
        assert!(validate_activity_transition(Pending, Completed).is_err());
    }

    #[test]
    fn wir_review_flow() {
        use WirStatus::*;
        assert!(validate_wir_transition(Requested, UnderReview).is_ok());
        assert!(validate_wir_transition(UnderReview, Approved).is_ok());
        assert!(validate_wir_transition(UnderReview, Rejected).is_ok());
        assert!(validate_wir_transition(Requested, Approved).is_err());
    }

    #[test]
    fn wir_resubmission_and_closure() {
        use WirStatus::*;
        assert!(validate_wir_transition(Rejected, Requested).is_ok());
        assert!(validate_wir_transition(Rejected, Closed).is_ok());
        assert!(allowed_wir_transitions(Approved).is_empty());
        assert!(allowed_wir_transitions(Closed).is_empty());
    }

    #[test]
    fn requirement_release_path() {
        use BoxMaterialStatus::*;
        assert!(validate_box_material_transition(Pending, Allocated).is_ok());
        assert!(validate_box_material_transition(Allocated, Pending).is_ok());
        assert!(validate_box_material_transition(Allocated, Consumed).is_ok());
        assert!(validate_box_material_transition(Consumed, Pending).is_err());
        assert!(validate_box_material_transition(Pending, Consumed).is_err());
    }
}
