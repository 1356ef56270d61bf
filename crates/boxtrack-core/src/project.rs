//! Projects and the boxes (modular units) they own.

use crate::ids::{BoxId, ProjectId};
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    /// Set up but not yet in production.
    Planned,
    /// Boxes are being manufactured.
    Active,
    /// All boxes completed or dispatched.
    Completed,
    /// Production paused.
    OnHold,
}

/// A construction project owning a set of boxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub id: ProjectId,
    /// Unique project code, e.g. "PRJ-2041".
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Number of boxes planned for the project.
    pub total_boxes: u32,
    /// Rolled-up progress over owned boxes, in [0, 100].
    pub progress: f64,
}

impl Project {
    /// Create a new project in `Planned` state.
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            code: code.into(),
            name: name.into(),
            status: ProjectStatus::Planned,
            total_boxes: 0,
            progress: 0.0,
        }
    }
}

/// Box manufacturing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxStatus {
    /// No activity has started.
    NotStarted,
    /// At least one activity underway.
    InProgress,
    /// Production paused by an operator.
    OnHold,
    /// Every scheduled activity finished.
    Completed,
    /// Left the factory.
    Dispatched,
}

impl BoxStatus {
    /// Statuses an operator owns; aggregation never overwrites these.
    #[inline]
    #[must_use]
    pub fn is_operator_owned(self) -> bool {
        matches!(self, BoxStatus::OnHold | BoxStatus::Dispatched)
    }
}

/// Physical envelope of a box, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_mm: u32,
    pub width_mm: u32,
    pub height_mm: u32,
}

/// A single precast modular unit tracked through manufacturing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxUnit {
    /// Box identifier.
    pub id: BoxId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Tag, unique within the project, e.g. "B-101".
    pub tag: String,
    /// Box type used to filter the activity catalog, e.g. "Standard".
    pub box_type: String,
    /// Optional physical envelope.
    pub dimensions: Option<Dimensions>,
    /// Manufacturing status.
    pub status: BoxStatus,
    /// Duration-weighted progress over the box's activities, in [0, 100].
    pub progress: f64,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl BoxUnit {
    /// Create a new box in `NotStarted` state.
    #[inline]
    #[must_use]
    pub fn new(project_id: ProjectId, tag: impl Into<String>, box_type: impl Into<String>) -> Self {
        Self {
            id: BoxId::new(),
            project_id,
            tag: tag.into(),
            box_type: box_type.into(),
            dimensions: None,
            status: BoxStatus::NotStarted,
            progress: 0.0,
            version: 0,
        }
    }

    /// With physical dimensions.
    #[inline]
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_box_defaults() {
        let project = Project::new("PRJ-1", "Riverside Modules");
        let unit = BoxUnit::new(project.id, "B-101", "Standard");

        assert_eq!(unit.status, BoxStatus::NotStarted);
        assert_eq!(unit.progress, 0.0);
        assert_eq!(unit.version, 0);
    }

    #[test]
    fn operator_owned_statuses() {
        assert!(BoxStatus::OnHold.is_operator_owned());
        assert!(BoxStatus::Dispatched.is_operator_owned());
        assert!(!BoxStatus::InProgress.is_operator_owned());
    }
}
