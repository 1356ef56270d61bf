//! Activity catalog templates and per-box activity instances.

use crate::ids::{BoxActivityId, BoxId, MemberId, TeamId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Catalog code of an activity template, e.g. "CAST-POUR".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityCode(String);

impl ActivityCode {
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

    /// True when the code is empty or whitespace-only.
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ActivityCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for ActivityCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Immutable catalog entry describing one production step.
///
/// Templates are reference data: a box's schedule is instantiated from the
/// catalog entries whose `applicable_box_types` match the box, ordered by
/// `overall_sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTemplate {
    /// Unique catalog code.
    pub code: ActivityCode,
    /// Human-readable name.
    pub name: String,
    /// Name of the production stage grouping this activity.
    pub stage_name: String,
    /// 1-based stage number.
    pub stage_number: u32,
    /// 1-based position within the stage.
    pub sequence_in_stage: u32,
    /// 1-based position over the whole pipeline.
    pub overall_sequence: u32,
    /// Estimated duration in working days; 0 means negligible.
    pub estimated_duration_days: u32,
    /// Whether completion is gated on an approved inspection.
    pub is_wir_checkpoint: bool,
    /// Inspection code attached to checkpoint activities, e.g. "WIR-CAST".
    pub wir_code: Option<String>,
    /// Box types this activity applies to; empty means all types.
    pub applicable_box_types: Vec<String>,
    /// Codes of activities that must finish before this one may complete.
    pub prerequisites: Vec<ActivityCode>,
}

impl ActivityTemplate {
    /// Create a template with the given identity and position.
    #[must_use]
    pub fn new(
        code: impl Into<ActivityCode>,
        name: impl Into<String>,
        stage_name: impl Into<String>,
        stage_number: u32,
        sequence_in_stage: u32,
        overall_sequence: u32,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            stage_name: stage_name.into(),
            stage_number,
            sequence_in_stage,
            overall_sequence,
            estimated_duration_days: 1,
            is_wir_checkpoint: false,
            wir_code: None,
            applicable_box_types: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    /// With an estimated duration in days.
    #[inline]
    #[must_use]
    pub fn with_duration_days(mut self, days: u32) -> Self {
        self.estimated_duration_days = days;
        self
    }

    /// Mark as an inspection checkpoint with the given WIR code.
    #[inline]
    #[must_use]
    pub fn with_checkpoint(mut self, wir_code: impl Into<String>) -> Self {
        self.is_wir_checkpoint = true;
        self.wir_code = Some(wir_code.into());
        self
    }

    /// Restrict to the given box types.
    #[inline]
    #[must_use]
    pub fn for_box_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.applicable_box_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Declare prerequisite activity codes.
    #[inline]
    #[must_use]
    pub fn after(mut self, codes: impl IntoIterator<Item = impl Into<ActivityCode>>) -> Self {
        self.prerequisites = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this template applies to the given box type.
    #[inline]
    #[must_use]
    pub fn applies_to(&self, box_type: &str) -> bool {
        self.applicable_box_types.is_empty()
            || self.applicable_box_types.iter().any(|t| t == box_type)
    }
}

/// Status of an activity instantiated for a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityStatus {
    /// Scheduled, not yet started.
    Pending,
    /// A crew is working on it.
    InProgress,
    /// Paused pending a resolution.
    Blocked,
    /// Finished; progress is 100.
    Completed,
    /// Deliberately not performed for this box.
    Skipped,
}

impl ActivityStatus {
    /// Completed and Skipped activities never change status again.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityStatus::Completed | ActivityStatus::Skipped)
    }

    /// Whether this status satisfies a successor's predecessor check.
    #[inline]
    #[must_use]
    pub fn satisfies_dependency(self) -> bool {
        self.is_terminal()
    }
}

/// One activity on a box's schedule, instantiated from a catalog template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxActivity {
    /// Row identifier.
    pub id: BoxActivityId,
    /// Owning box.
    pub box_id: BoxId,
    /// Catalog code this row was instantiated from.
    pub activity_code: ActivityCode,
    /// Display name copied from the template.
    pub name: String,
    /// Position in the box schedule; unique per box, 1-based.
    pub sequence: u32,
    /// Current status.
    pub status: ActivityStatus,
    /// Crew-reported progress percentage, 0..=100.
    pub progress: u8,
    /// Planned window computed at instantiation.
    pub planned_start: Option<NaiveDate>,
    /// Planned finish computed at instantiation.
    pub planned_end: Option<NaiveDate>,
    /// Stamped when the activity enters `InProgress`.
    pub actual_start: Option<DateTime<Utc>>,
    /// Stamped when the activity enters `Completed`.
    pub actual_end: Option<DateTime<Utc>>,
    /// Team assigned to the work, if any.
    pub assigned_team: Option<TeamId>,
    /// Member assigned to the work, if any.
    pub assigned_member: Option<MemberId>,
    /// Whether every material requirement of the box is allocated.
    pub materials_available: bool,
    /// Estimated duration copied from the template; weight for roll-ups.
    pub estimated_duration_days: u32,
    /// Whether completion is gated on an approved inspection.
    pub is_wir_checkpoint: bool,
    /// Inspection code copied from the template.
    pub wir_code: Option<String>,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl BoxActivity {
    /// Instantiate a pending activity from a catalog template.
    #[must_use]
    pub fn from_template(box_id: BoxId, template: &ActivityTemplate, sequence: u32) -> Self {
        Self {
            id: BoxActivityId::new(),
            box_id,
            activity_code: template.code.clone(),
            name: template.name.clone(),
            sequence,
            status: ActivityStatus::Pending,
            progress: 0,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            assigned_team: None,
            assigned_member: None,
            materials_available: false,
            estimated_duration_days: template.estimated_duration_days,
            is_wir_checkpoint: template.is_wir_checkpoint,
            wir_code: template.wir_code.clone(),
            version: 0,
        }
    }

    /// Weight used by progress roll-ups; zero-duration activities count as 1.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.estimated_duration_days.max(1)
    }
}

/// How a predecessor constrains its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Successor may not start until the predecessor finishes.
    FinishToStart,
    /// Successor may not start until the predecessor starts.
    StartToStart,
}

/// Scheduling metadata carried on a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMeta {
    /// Constraint kind.
    pub kind: DependencyKind,
    /// Working days of lag after the constraint is met.
    pub lag_days: u32,
}

impl DependencyMeta {
    /// Finish-to-start with no lag, the default for catalog prerequisites.
    #[inline]
    #[must_use]
    pub fn finish_to_start() -> Self {
        Self {
            kind: DependencyKind::FinishToStart,
            lag_days: 0,
        }
    }
}

impl Default for DependencyMeta {
    fn default() -> Self {
        Self::finish_to_start()
    }
}

/// A recorded dependency edge between two activities of the same box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The activity that waits.
    pub successor: BoxActivityId,
    /// The activity it waits on.
    pub predecessor: BoxActivityId,
    /// Constraint kind and lag.
    pub meta: DependencyMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_builder() {
        let template = ActivityTemplate::new("CAST-QC", "Casting inspection", "Casting", 2, 3, 6)
            .with_duration_days(1)
            .with_checkpoint("WIR-CAST")
            .after(["CAST-POUR", "CAST-CURE"]);

        assert!(template.is_wir_checkpoint);
        assert_eq!(template.wir_code.as_deref(), Some("WIR-CAST"));
        assert_eq!(template.prerequisites.len(), 2);
    }

    #[test]
    fn applies_to_all_when_unrestricted() {
        let template = ActivityTemplate::new("MLD-PREP", "Mould preparation", "Mould", 1, 1, 1);
        assert!(template.applies_to("Standard"));
        assert!(template.applies_to("Bathroom"));
    }

    #[test]
    fn applies_to_filters_box_types() {
        let template = ActivityTemplate::new("FIT-MEP", "MEP fit-out", "Fit-out", 3, 1, 7)
            .for_box_types(["Bathroom", "Plant"]);
        assert!(template.applies_to("Bathroom"));
        assert!(!template.applies_to("Standard"));
    }

    #[test]
    fn instance_inherits_checkpoint_flags() {
        let template = ActivityTemplate::new("FIN-QC", "Final inspection", "Finish", 3, 4, 10)
            .with_checkpoint("WIR-FINAL")
            .with_duration_days(0);
        let activity = BoxActivity::from_template(BoxId::new(), &template, 4);

        assert!(activity.is_wir_checkpoint);
        assert_eq!(activity.status, ActivityStatus::Pending);
        assert_eq!(activity.weight(), 1);
    }

    #[test]
    fn terminal_statuses_satisfy_dependencies() {
        assert!(ActivityStatus::Completed.satisfies_dependency());
        assert!(ActivityStatus::Skipped.satisfies_dependency());
        assert!(!ActivityStatus::InProgress.satisfies_dependency());
    }
}
