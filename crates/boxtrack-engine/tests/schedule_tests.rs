//! Schedule instantiation: filtering, ordering, dependency wiring.

use boxtrack_core::{
    ActivityStatus, ActivityTemplate, EngineError, ScheduleError, ValidationError,
};
use boxtrack_engine::{ActivityCatalog, ProgressReporter, SchedulePlanner};
use boxtrack_test_utils::{anchor_date, fast_engine, scheduled_box, three_stage_catalog};
use chrono::Days;

#[tokio::test]
async fn three_stage_box_instantiates_in_order() {
    let engine = fast_engine(three_stage_catalog());
    let (_, box_id, activities) = scheduled_box(&engine, "B-101", "Standard").await;

    assert_eq!(activities.len(), 3);
    let codes: Vec<&str> = activities.iter().map(|a| a.activity_code.as_str()).collect();
    assert_eq!(codes, vec!["STAGE1-FAB", "STAGE1-DEL", "STAGE1-QC"]);

    let sequences: Vec<u32> = activities.iter().map(|a| a.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    assert!(activities.iter().all(|a| a.status == ActivityStatus::Pending));
    assert!(activities.iter().all(|a| a.progress == 0));

    let progress = engine.box_progress(box_id).await.unwrap();
    assert_eq!(progress, 0.0);
}

#[tokio::test]
async fn activity_count_matches_filtered_catalog() {
    let engine = fast_engine(boxtrack_engine::standard_catalog().clone());

    let (_, _, standard) = scheduled_box(&engine, "B-201", "Standard").await;
    let (_, _, bathroom) = scheduled_box(&engine, "B-202", "Bathroom").await;

    let catalog = engine.catalog();
    assert_eq!(standard.len(), catalog.applicable_for("Standard").len());
    assert_eq!(bathroom.len(), catalog.applicable_for("Bathroom").len());
    // FIT-MEP is restricted to Bathroom and Plant boxes.
    assert_eq!(bathroom.len(), standard.len() + 1);

    // Sequences are unique per box.
    let mut sequences: Vec<u32> = bathroom.iter().map(|a| a.sequence).collect();
    sequences.sort_unstable();
    sequences.dedup();
    assert_eq!(sequences.len(), bathroom.len());
}

#[tokio::test]
async fn unresolved_prerequisite_fails_instantiation() {
    // SPECIAL-PREP only applies to "Special" boxes, but FAB depends on it
    // for every type; a "Standard" schedule cannot resolve it.
    let templates = vec![
        ActivityTemplate::new("SPECIAL-PREP", "Special preparation", "Stage", 1, 1, 1)
            .for_box_types(["Special"]),
        ActivityTemplate::new("FAB", "Fabrication", "Stage", 1, 2, 2).after(["SPECIAL-PREP"]),
    ];
    let engine = fast_engine(ActivityCatalog::from_templates(templates).unwrap());

    let project = engine.create_project("PRJ-1", "Test").unwrap();
    let unit = engine.add_box(project.id, "B-1", "Standard", None).unwrap();

    let err = engine.instantiate_schedule(unit.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Schedule(ScheduleError::UnknownPrerequisite { .. })
    ));

    // Nothing was committed.
    assert!(engine.activities_of(unit.id).is_empty());
}

#[tokio::test]
async fn cyclic_dependencies_are_rejected() {
    let engine = fast_engine(boxtrack_test_utils::cyclic_catalog());

    let project = engine.create_project("PRJ-1", "Test").unwrap();
    let unit = engine.add_box(project.id, "B-1", "Standard", None).unwrap();

    let err = engine.instantiate_schedule(unit.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Schedule(ScheduleError::CycleDetected(_))
    ));
    assert!(engine.activities_of(unit.id).is_empty());
}

#[tokio::test]
async fn schedule_cannot_be_instantiated_twice() {
    let engine = fast_engine(three_stage_catalog());
    let (_, box_id, _) = scheduled_box(&engine, "B-101", "Standard").await;

    let err = engine.instantiate_schedule(box_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::AlreadyScheduled(_))
    ));
}

#[tokio::test]
async fn planned_windows_follow_dependencies() {
    let engine = fast_engine(three_stage_catalog());
    let (_, _, activities) = scheduled_box(&engine, "B-101", "Standard").await;
    let anchor = anchor_date();
    let day = |n: u64| anchor.checked_add_days(Days::new(n)).unwrap();

    // FAB: 2 days from the anchor; DEL and QC chain behind it.
    assert_eq!(activities[0].planned_start, Some(anchor));
    assert_eq!(activities[0].planned_end, Some(day(2)));
    assert_eq!(activities[1].planned_start, Some(day(2)));
    assert_eq!(activities[1].planned_end, Some(day(3)));
    assert_eq!(activities[2].planned_start, Some(day(3)));
    assert_eq!(activities[2].planned_end, Some(day(4)));
}

#[tokio::test]
async fn dependency_edges_are_recorded() {
    let engine = fast_engine(three_stage_catalog());
    let (_, box_id, activities) = scheduled_box(&engine, "B-101", "Standard").await;

    let edges = engine.dependencies_of(box_id);
    assert_eq!(edges.len(), 2);
    assert!(edges
        .iter()
        .any(|e| e.successor == activities[1].id && e.predecessor == activities[0].id));
    assert!(edges
        .iter()
        .any(|e| e.successor == activities[2].id && e.predecessor == activities[1].id));
}

#[tokio::test]
async fn deleting_a_box_cascades_to_activities() {
    let engine = fast_engine(three_stage_catalog());
    let (_, box_id, activities) = scheduled_box(&engine, "B-101", "Standard").await;

    engine.delete_box(box_id).unwrap();

    assert!(engine.box_unit(box_id).is_err());
    assert!(engine.activities_of(box_id).is_empty());
    for activity in activities {
        assert!(engine.activity(activity.id).is_err());
    }
}

#[tokio::test]
async fn duplicate_box_tag_is_rejected() {
    let engine = fast_engine(three_stage_catalog());
    let project = engine.create_project("PRJ-1", "Test").unwrap();
    engine.add_box(project.id, "B-1", "Standard", None).unwrap();

    let err = engine.add_box(project.id, "B-1", "Standard", None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::Duplicate { .. })
    ));
}
