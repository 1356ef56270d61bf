//! Testing utilities for the boxtrack workspace.
//!
//! Canned catalogs, a fast-retry engine factory, and drivers for common
//! multi-step flows.

use boxtrack_core::{
    ActivityTemplate, BoxActivity, BoxId, Material, MaterialCode, MemberId, ProjectId,
};
use boxtrack_engine::{
    ActivityCatalog, EngineConfig, InspectionGate, MaterialLedger, RetryPolicy, SchedulePlanner,
    TrackerEngine,
};
use chrono::NaiveDate;

/// Fixed anchor date used by test engines so planned windows are stable.
#[must_use]
pub fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid fixture date")
}

/// Three sequential activities, no inspection checkpoints.
#[must_use]
pub fn three_stage_catalog() -> ActivityCatalog {
    let templates = vec![
        ActivityTemplate::new("STAGE1-FAB", "Fabrication", "Stage One", 1, 1, 1)
            .with_duration_days(2),
        ActivityTemplate::new("STAGE1-DEL", "Delivery to yard", "Stage One", 1, 2, 2)
            .with_duration_days(1)
            .after(["STAGE1-FAB"]),
        ActivityTemplate::new("STAGE1-QC", "Quality check", "Stage One", 1, 3, 3)
            .with_duration_days(1)
            .after(["STAGE1-DEL"]),
    ];
    ActivityCatalog::from_templates(templates).expect("fixture catalog is valid")
}

/// Two activities where the second is an inspection checkpoint.
#[must_use]
pub fn checkpointed_catalog() -> ActivityCatalog {
    let templates = vec![
        ActivityTemplate::new("FAB", "Fabrication", "Production", 1, 1, 1).with_duration_days(2),
        ActivityTemplate::new("HOLD-QC", "Hold-point inspection", "Production", 1, 2, 2)
            .with_duration_days(1)
            .with_checkpoint("WIR-HOLD")
            .after(["FAB"]),
    ];
    ActivityCatalog::from_templates(templates).expect("fixture catalog is valid")
}

/// Two activities depending on each other.
///
/// The codes resolve, so catalog construction accepts the set; the cycle
/// must surface at schedule instantiation.
#[must_use]
pub fn cyclic_catalog() -> ActivityCatalog {
    let templates = vec![
        ActivityTemplate::new("A", "First of the loop", "Stage", 1, 1, 1).after(["B"]),
        ActivityTemplate::new("B", "Second of the loop", "Stage", 1, 2, 2).after(["A"]),
    ];
    ActivityCatalog::from_templates(templates).expect("codes resolve at catalog level")
}

/// Engine over the given catalog with millisecond retry backoff and a
/// pinned schedule anchor.
#[must_use]
pub fn fast_engine(catalog: ActivityCatalog) -> TrackerEngine {
    let config = EngineConfig::new()
        .with_retry(RetryPolicy {
            max_retries: 1,
            base_delay_ms: 1,
        })
        .with_schedule_anchor(anchor_date());
    TrackerEngine::with_config(catalog, config)
}

/// Create a project and a scheduled box of the given type.
///
/// The project code is derived from a fresh id so repeated calls against
/// the same engine never collide.
pub async fn scheduled_box(
    engine: &TrackerEngine,
    tag: &str,
    box_type: &str,
) -> (ProjectId, BoxId, Vec<BoxActivity>) {
    let project = engine
        .create_project(format!("PRJ-{}", ProjectId::new()), "Fixture project")
        .expect("fixture project inserts");
    let unit = engine
        .add_box(project.id, tag, box_type, None)
        .expect("fixture box inserts");
    let activities = engine
        .instantiate_schedule(unit.id)
        .await
        .expect("fixture schedule instantiates");
    (project.id, unit.id, activities)
}

/// Drive one activity to completion, passing its inspection gate when the
/// activity is a checkpoint.
pub async fn complete_activity(engine: &TrackerEngine, activity: &BoxActivity) {
    use boxtrack_core::ActivityStatus;

    engine
        .advance_activity(activity.id, ActivityStatus::InProgress, None)
        .await
        .expect("activity starts");

    if activity.is_wir_checkpoint {
        let requester = MemberId::new();
        let inspector = MemberId::new();
        let record = engine
            .request_inspection(activity.id, requester)
            .await
            .expect("inspection requested");
        engine
            .begin_review(record.id, inspector)
            .await
            .expect("review begins");
        engine
            .approve(record.id, None)
            .await
            .expect("inspection approves");
    }

    engine
        .advance_activity(activity.id, ActivityStatus::Completed, None)
        .await
        .expect("activity completes");
}

/// Register a material and book opening stock into it.
pub async fn stocked_material(
    engine: &TrackerEngine,
    code: &str,
    opening_stock: u64,
) -> (Material, MemberId) {
    let actor = MemberId::new();
    let material = engine
        .register_material(MaterialCode::new(code), code, "kg", 0, 0)
        .expect("fixture material registers");
    engine
        .receive(material.id, opening_stock, actor)
        .await
        .expect("opening stock books");
    let material = engine.material(material.id).expect("material re-reads");
    (material, actor)
}
