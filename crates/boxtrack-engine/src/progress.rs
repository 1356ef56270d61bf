//! Progress roll-ups.
//!
//! Pure, idempotent functions: box progress is the duration-weighted mean
//! of its activities, project progress the plain mean of its boxes. Both
//! are recomputed in full on every trigger rather than patched
//! incrementally, so repeated recomputation cannot drift.

use boxtrack_core::{ActivityStatus, BoxActivity, BoxStatus, BoxUnit};

/// Duration-weighted progress of a box over its activities, in [0, 100].
///
/// Skipped activities are left out of the weighting: they contribute no
/// work, so they neither raise nor drag the figure. A schedule with no
/// weighable activities reports 0.
#[must_use]
pub fn box_progress(activities: &[BoxActivity]) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for activity in activities {
        if activity.status == ActivityStatus::Skipped {
            continue;
        }
        let weight = f64::from(activity.weight());
        weighted += weight * f64::from(activity.progress);
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return 0.0;
    }
    (weighted / total_weight).clamp(0.0, 100.0)
}

/// Plain mean of box progress over a project, in [0, 100].
#[must_use]
pub fn project_progress(boxes: &[BoxUnit]) -> f64 {
    if boxes.is_empty() {
        return 0.0;
    }
    let sum: f64 = boxes.iter().map(|b| b.progress).sum();
    (sum / boxes.len() as f64).clamp(0.0, 100.0)
}

/// Derive a box status from its activities.
///
/// Operator-owned statuses (OnHold, Dispatched) are never overwritten.
/// Otherwise: every activity terminal means Completed, any work started
/// means InProgress, and an untouched schedule stays NotStarted.
#[must_use]
pub fn derive_box_status(current: BoxStatus, activities: &[BoxActivity]) -> BoxStatus {
    if current.is_operator_owned() {
        return current;
    }
    if activities.is_empty() {
        return current;
    }

    let all_terminal = activities.iter().all(|a| a.status.is_terminal());
    if all_terminal {
        return BoxStatus::Completed;
    }

    let any_started = activities.iter().any(|a| {
        a.status != ActivityStatus::Pending || a.progress > 0
    });
    if any_started {
        BoxStatus::InProgress
    } else {
        BoxStatus::NotStarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxtrack_core::{ActivityTemplate, BoxId, ProjectId};

    fn activity(duration: u32, progress: u8, status: ActivityStatus) -> BoxActivity {
        let template = ActivityTemplate::new("T", "Test", "Stage", 1, 1, 1)
            .with_duration_days(duration);
        let mut a = BoxActivity::from_template(BoxId::new(), &template, 1);
        a.progress = progress;
        a.status = status;
        a
    }

    #[test]
    fn empty_schedule_is_zero() {
        assert_eq!(box_progress(&[]), 0.0);
    }

    #[test]
    fn weighting_by_duration() {
        // 1-day at 100% and 3-day at 0% => 25%.
        let activities = vec![
            activity(1, 100, ActivityStatus::Completed),
            activity(3, 0, ActivityStatus::Pending),
        ];
        assert!((box_progress(&activities) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_weighs_one() {
        let activities = vec![
            activity(0, 100, ActivityStatus::Completed),
            activity(1, 0, ActivityStatus::Pending),
        ];
        assert!((box_progress(&activities) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn skipped_activities_are_excluded() {
        let activities = vec![
            activity(5, 0, ActivityStatus::Skipped),
            activity(1, 100, ActivityStatus::Completed),
        ];
        assert!((box_progress(&activities) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn recompute_is_idempotent() {
        let activities = vec![
            activity(2, 40, ActivityStatus::InProgress),
            activity(3, 0, ActivityStatus::Pending),
        ];
        let first = box_progress(&activities);
        let second = box_progress(&activities);
        assert_eq!(first, second);
    }

    #[test]
    fn project_mean_is_unweighted() {
        let project = ProjectId::new();
        let mut b1 = BoxUnit::new(project, "B-1", "Standard");
        let mut b2 = BoxUnit::new(project, "B-2", "Standard");
        b1.progress = 100.0;
        b2.progress = 0.0;
        assert!((project_progress(&[b1, b2]) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn status_derivation() {
        let done = vec![activity(1, 100, ActivityStatus::Completed)];
        assert_eq!(
            derive_box_status(BoxStatus::InProgress, &done),
            BoxStatus::Completed
        );

        let started = vec![
            activity(1, 10, ActivityStatus::InProgress),
            activity(1, 0, ActivityStatus::Pending),
        ];
        assert_eq!(
            derive_box_status(BoxStatus::NotStarted, &started),
            BoxStatus::InProgress
        );

        let untouched = vec![activity(1, 0, ActivityStatus::Pending)];
        assert_eq!(
            derive_box_status(BoxStatus::NotStarted, &untouched),
            BoxStatus::NotStarted
        );
    }

    #[test]
    fn operator_statuses_are_preserved() {
        let done = vec![activity(1, 100, ActivityStatus::Completed)];
        assert_eq!(
            derive_box_status(BoxStatus::OnHold, &done),
            BoxStatus::OnHold
        );
        assert_eq!(
            derive_box_status(BoxStatus::Dispatched, &done),
            BoxStatus::Dispatched
        );
    }
}
