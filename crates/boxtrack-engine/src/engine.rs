//! The `TrackerEngine` facade.
//!
//! Owns the catalog, the store, and the audit trail, and implements the
//! operational traits in [`crate::api`]. Every operation runs as one
//! critical section over the store and either commits fully or leaves no
//! trace; only materialized mutations reach the audit log.

use crate::api::{
    InspectionGate, MaterialLedger, ProgressReporter, ReconcileReport, ReservationReceipt,
    SchedulePlanner, TransitionReceipt,
};
use crate::audit::AuditLog;
use crate::catalog::ActivityCatalog;
use crate::config::EngineConfig;
use crate::ledger::{replay, StockLevels};
use crate::progress;
use crate::schedule::{DependencyGraph, DependencyViolation};
use crate::state_machine;
use crate::store::{Store, StoreState};
use async_trait::async_trait;
use boxtrack_core::{
    ActivityCode, ActivityStatus, BoxActivity, BoxActivityId, BoxId, BoxMaterial, BoxMaterialId,
    BoxMaterialStatus, BoxUnit, ConflictError, DependencyEdge, DependencyMeta, Dimensions,
    EngineError, Material, MaterialCode, MaterialId, MaterialTransaction, MemberId, Project,
    ProjectId, ScheduleError, TransactionId, TransactionKind, ValidationError, WirId, WirRecord,
    WirStatus,
};
use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;

/// Production workflow engine over an in-memory system of record.
#[derive(Debug)]
pub struct TrackerEngine {
    config: EngineConfig,
    catalog: ActivityCatalog,
    store: Store,
    audit: AuditLog,
}

impl TrackerEngine {
    /// Engine over the given catalog with default configuration.
    #[must_use]
    pub fn new(catalog: ActivityCatalog) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    /// Engine over the given catalog and configuration.
    #[must_use]
    pub fn with_config(catalog: ActivityCatalog, config: EngineConfig) -> Self {
        Self {
            config,
            catalog,
            store: Store::new(),
            audit: AuditLog::new(),
        }
    }

    /// Engine configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The activity catalog in use.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &ActivityCatalog {
        &self.catalog
    }

    /// The audit trail of materialized mutations.
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    // ---- project / box plumbing ----

    /// Create a project with a unique code.
    pub fn create_project(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Project, EngineError> {
        let project = Project::new(code, name);
        self.store.write().insert_project(project.clone())?;
        self.audit
            .record("project", &project.code, "create", &project.name);
        tracing::info!(code = %project.code, "project created");
        Ok(project)
    }

    /// Add a box to a project; the tag must be unique within it.
    pub fn add_box(
        &self,
        project_id: ProjectId,
        tag: impl Into<String>,
        box_type: impl Into<String>,
        dimensions: Option<Dimensions>,
    ) -> Result<BoxUnit, EngineError> {
        let mut unit = BoxUnit::new(project_id, tag, box_type);
        if let Some(dimensions) = dimensions {
            unit = unit.with_dimensions(dimensions);
        }
        self.store.write().insert_box(unit.clone())?;
        self.audit
            .record("box", &unit.tag, "create", format!("type={}", unit.box_type));
        tracing::info!(tag = %unit.tag, box_type = %unit.box_type, "box created");
        Ok(unit)
    }

    /// Delete a box, cascading to its activities, dependencies,
    /// inspections, and requirement rows.
    pub fn delete_box(&self, box_id: BoxId) -> Result<(), EngineError> {
        let mut state = self.store.write();
        let unit = state.box_unit(box_id)?.clone();
        let removed = state.remove_box(box_id)?;

        // Project roll-up no longer includes the removed box.
        let boxes: Vec<BoxUnit> = state.boxes_of(unit.project_id).into_iter().cloned().collect();
        state.project_mut(unit.project_id)?.progress = progress::project_progress(&boxes);
        drop(state);

        self.audit.record(
            "box",
            &unit.tag,
            "delete",
            format!("cascaded_activities={removed}"),
        );
        tracing::info!(tag = %unit.tag, removed, "box deleted");
        Ok(())
    }

    /// Register a material with a unique code.
    pub fn register_material(
        &self,
        code: impl Into<MaterialCode>,
        name: impl Into<String>,
        unit: impl Into<String>,
        minimum_stock: u64,
        reorder_level: u64,
    ) -> Result<Material, EngineError> {
        let material = Material::new(code, name, unit).with_thresholds(minimum_stock, reorder_level);
        self.store.write().insert_material(material.clone())?;
        self.audit
            .record("material", &material.code, "register", &material.name);
        Ok(material)
    }

    // ---- read accessors ----

    /// Project snapshot.
    pub fn project(&self, id: ProjectId) -> Result<Project, EngineError> {
        Ok(self.store.read().project(id)?.clone())
    }

    /// Box snapshot.
    pub fn box_unit(&self, id: BoxId) -> Result<BoxUnit, EngineError> {
        Ok(self.store.read().box_unit(id)?.clone())
    }

    /// Activity snapshot.
    pub fn activity(&self, id: BoxActivityId) -> Result<BoxActivity, EngineError> {
        Ok(self.store.read().activity(id)?.clone())
    }

    /// A box's activities in sequence order.
    pub fn activities_of(&self, box_id: BoxId) -> Vec<BoxActivity> {
        self.store.read().activities_of_cloned(box_id)
    }

    /// A box's recorded dependency edges.
    pub fn dependencies_of(&self, box_id: BoxId) -> Vec<DependencyEdge> {
        self.store.read().dependencies_of(box_id).to_vec()
    }

    /// Material snapshot.
    pub fn material(&self, id: MaterialId) -> Result<Material, EngineError> {
        Ok(self.store.read().material(id)?.clone())
    }

    /// Material snapshot by code.
    pub fn material_by_code(&self, code: &MaterialCode) -> Result<Material, EngineError> {
        Ok(self.store.read().material_by_code(code)?.clone())
    }

    /// Requirement row snapshot.
    pub fn box_material(&self, id: BoxMaterialId) -> Result<BoxMaterial, EngineError> {
        Ok(self.store.read().box_material(id)?.clone())
    }

    /// Requirement row snapshot for a `(box, material)` pair.
    pub fn box_material_for(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
    ) -> Result<BoxMaterial, EngineError> {
        Ok(self.store.read().box_material_for(box_id, material_id)?.clone())
    }

    /// Inspection snapshot.
    pub fn wir(&self, id: WirId) -> Result<WirRecord, EngineError> {
        Ok(self.store.read().wir(id)?.clone())
    }

    /// Most recent inspection of an activity.
    pub fn latest_wir(&self, activity_id: BoxActivityId) -> Option<WirRecord> {
        self.store.read().latest_wir(activity_id).cloned()
    }

    /// A material's ledger rows, oldest first.
    pub fn transactions_for(&self, material_id: MaterialId) -> Vec<MaterialTransaction> {
        self.store
            .read()
            .transactions_for(material_id)
            .into_iter()
            .cloned()
            .collect()
    }

    // ---- internals ----

    /// One attempt at an activity transition; the caller handles retry.
    fn try_advance(
        &self,
        activity_id: BoxActivityId,
        to: ActivityStatus,
        expected_version: Option<u64>,
    ) -> Result<TransitionReceipt, EngineError> {
        let mut state = self.store.write();
        let activity = state.activity(activity_id)?.clone();

        if let Some(expected) = expected_version {
            if activity.version != expected {
                return Err(ConflictError {
                    entity: "box activity",
                    key: activity_id.to_string(),
                    expected,
                    found: activity.version,
                }
                .into());
            }
        }

        state_machine::validate_activity_transition(activity.status, to)?;

        if to == ActivityStatus::Completed {
            let graph = state.graph(activity.box_id)?;
            let predecessors = graph.predecessors(activity_id);
            for (predecessor, _meta) in predecessors {
                if !state.activity(predecessor)?.status.satisfies_dependency() {
                    return Err(boxtrack_core::TransitionError::PredecessorsIncomplete {
                        activity: activity_id,
                        predecessor,
                    }
                    .into());
                }
            }
            if activity.is_wir_checkpoint {
                let approved = state
                    .latest_wir(activity_id)
                    .is_some_and(|w| w.status == WirStatus::Approved);
                if !approved {
                    return Err(boxtrack_core::TransitionError::CheckpointNotApproved(
                        activity_id,
                    )
                    .into());
                }
            }
        }

        let now = Utc::now();
        let row = state.activity_mut(activity_id)?;
        let from = row.status;
        row.status = to;
        match to {
            ActivityStatus::InProgress => {
                if row.actual_start.is_none() {
                    row.actual_start = Some(now);
                }
            }
            ActivityStatus::Completed => {
                row.progress = 100;
                row.actual_end = Some(now);
            }
            _ => {}
        }
        row.version += 1;
        let version = row.version;

        let box_progress = refresh_rollups(&mut state, activity.box_id)?;
        drop(state);

        self.audit.record(
            "box_activity",
            activity_id,
            "advance",
            format!("{from:?} -> {to:?}"),
        );
        tracing::info!(%activity_id, ?from, ?to, box_progress, "activity advanced");

        Ok(TransitionReceipt {
            activity_id,
            from,
            to,
            version,
            box_progress,
            timestamp: now,
        })
    }
}

impl Default for TrackerEngine {
    fn default() -> Self {
        Self::new(crate::catalog::standard_catalog().clone())
    }
}

/// Recompute a box's progress and derived status plus the owning
/// project's roll-up. Returns the box progress.
fn refresh_rollups(state: &mut StoreState, box_id: BoxId) -> Result<f64, ValidationError> {
    let activities = state.activities_of_cloned(box_id);
    let box_progress = progress::box_progress(&activities);

    let unit = state.box_unit_mut(box_id)?;
    unit.progress = box_progress;
    unit.status = progress::derive_box_status(unit.status, &activities);
    unit.version += 1;
    let project_id = unit.project_id;

    let boxes: Vec<BoxUnit> = state.boxes_of(project_id).into_iter().cloned().collect();
    state.project_mut(project_id)?.progress = progress::project_progress(&boxes);

    Ok(box_progress)
}

/// Recompute the shared materials-availability flag of a box's activities.
///
/// The flag is derived state, so refreshing it does not bump activity
/// versions; only status and crew progress contend optimistically.
fn refresh_materials_flag(state: &mut StoreState, box_id: BoxId) -> Result<(), ValidationError> {
    let covered = state
        .box_materials_of(box_id)
        .iter()
        .all(|bm| bm.is_covered());
    let ids: Vec<BoxActivityId> = state.activities_of(box_id).iter().map(|a| a.id).collect();
    for id in ids {
        state.activity_mut(id)?.materials_available = covered;
    }
    Ok(())
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days))).unwrap_or(date)
}

#[async_trait]
impl SchedulePlanner for TrackerEngine {
    async fn instantiate_schedule(&self, box_id: BoxId) -> Result<Vec<BoxActivity>, EngineError> {
        let mut state = self.store.write();
        let unit = state.box_unit(box_id)?.clone();
        if state.has_schedule(box_id) {
            return Err(ValidationError::AlreadyScheduled(box_id).into());
        }

        let templates = self.catalog.applicable_for(&unit.box_type);
        let mut activities: Vec<BoxActivity> = templates
            .iter()
            .enumerate()
            .map(|(index, template)| {
                BoxActivity::from_template(box_id, template, index as u32 + 1)
            })
            .collect();

        let ids: HashMap<ActivityCode, BoxActivityId> = activities
            .iter()
            .map(|a| (a.activity_code.clone(), a.id))
            .collect();

        let mut graph = DependencyGraph::new();
        for activity in &activities {
            graph.add_activity(activity.id);
        }

        let mut edges: Vec<DependencyEdge> = Vec::new();
        for (template, activity) in templates.iter().zip(&activities) {
            for prerequisite in &template.prerequisites {
                let predecessor = *ids.get(prerequisite).ok_or_else(|| {
                    ScheduleError::UnknownPrerequisite {
                        activity: template.code.clone(),
                        prerequisite: prerequisite.clone(),
                    }
                })?;
                let meta = DependencyMeta::finish_to_start();
                graph
                    .add_dependency(activity.id, predecessor, meta)
                    .map_err(|violation| match violation {
                        DependencyViolation::SelfLoop => {
                            ScheduleError::SelfDependency(template.code.clone())
                        }
                        DependencyViolation::Cycle => ScheduleError::CycleDetected(box_id),
                    })?;
                edges.push(DependencyEdge {
                    successor: activity.id,
                    predecessor,
                    meta,
                });
            }
        }

        // Planned windows: walk in topological order so every
        // predecessor's window is known before its successors.
        let anchor = self
            .config
            .schedule_anchor
            .unwrap_or_else(|| Utc::now().date_naive());
        let weights: HashMap<BoxActivityId, u32> =
            activities.iter().map(|a| (a.id, a.weight())).collect();
        let order = graph
            .topological_order()
            .map_err(|_| ScheduleError::CycleDetected(box_id))?;

        let mut windows: HashMap<BoxActivityId, (NaiveDate, NaiveDate)> = HashMap::new();
        for id in order {
            let mut start = anchor;
            for (predecessor, meta) in graph.predecessors(id) {
                if let Some((pred_start, pred_end)) = windows.get(&predecessor) {
                    let candidate = match meta.kind {
                        boxtrack_core::DependencyKind::FinishToStart => {
                            add_days(*pred_end, meta.lag_days)
                        }
                        boxtrack_core::DependencyKind::StartToStart => {
                            add_days(*pred_start, meta.lag_days)
                        }
                    };
                    if candidate > start {
                        start = candidate;
                    }
                }
            }
            let end = add_days(start, weights.get(&id).copied().unwrap_or(1));
            windows.insert(id, (start, end));
        }
        for activity in &mut activities {
            if let Some((start, end)) = windows.get(&activity.id) {
                activity.planned_start = Some(*start);
                activity.planned_end = Some(*end);
            }
        }

        state.insert_schedule(box_id, activities.clone(), graph, edges);
        refresh_materials_flag(&mut state, box_id)?;
        drop(state);

        self.audit.record(
            "box",
            &unit.tag,
            "schedule",
            format!("activities={}", activities.len()),
        );
        tracing::info!(
            tag = %unit.tag,
            activities = activities.len(),
            "schedule instantiated"
        );
        Ok(activities)
    }

    async fn advance_activity(
        &self,
        activity_id: BoxActivityId,
        to: ActivityStatus,
        expected_version: Option<u64>,
    ) -> Result<TransitionReceipt, EngineError> {
        let mut expected = expected_version;
        let mut attempt = 0u32;
        loop {
            match self.try_advance(activity_id, to, expected) {
                Err(EngineError::Conflict(conflict)) if attempt < self.config.retry.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry.delay(attempt);
                    tracing::warn!(
                        %activity_id,
                        attempt,
                        ?delay,
                        %conflict,
                        "version conflict, retrying transition"
                    );
                    tokio::time::sleep(delay).await;
                    // The retry re-reads the row and re-validates the
                    // transition against its current state.
                    expected = None;
                }
                other => return other,
            }
        }
    }

    async fn set_activity_progress(
        &self,
        activity_id: BoxActivityId,
        progress_pct: u8,
    ) -> Result<(), EngineError> {
        if progress_pct > 100 {
            return Err(ValidationError::ProgressOutOfRange(progress_pct).into());
        }

        let mut state = self.store.write();
        let activity = state.activity(activity_id)?;
        if activity.status != ActivityStatus::InProgress {
            return Err(ValidationError::NotInProgress(activity_id).into());
        }
        let box_id = activity.box_id;

        let row = state.activity_mut(activity_id)?;
        row.progress = progress_pct;
        row.version += 1;
        refresh_rollups(&mut state, box_id)?;
        drop(state);

        self.audit.record(
            "box_activity",
            activity_id,
            "report_progress",
            format!("progress={progress_pct}"),
        );
        tracing::debug!(%activity_id, progress_pct, "crew progress reported");
        Ok(())
    }

    async fn allowed_transitions(
        &self,
        activity_id: BoxActivityId,
    ) -> Result<Vec<ActivityStatus>, EngineError> {
        let state = self.store.read();
        let activity = state.activity(activity_id)?;
        Ok(state_machine::allowed_activity_transitions(activity.status))
    }
}

#[async_trait]
impl MaterialLedger for TrackerEngine {
    async fn receive(
        &self,
        material_id: MaterialId,
        quantity: u64,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let mut state = self.store.write();
        let material = state.material(material_id)?.clone();
        let next = StockLevels::of(&material).apply(TransactionKind::Receipt, quantity, &material)?;

        let row = state.material_mut(material_id)?;
        row.current_stock = next.current;
        row.allocated_stock = next.allocated;
        row.version += 1;

        let transaction =
            MaterialTransaction::new(material_id, TransactionKind::Receipt, quantity, actor);
        let transaction_id = transaction.id;
        state.push_transaction(transaction);
        drop(state);

        self.audit.record(
            "material",
            &material.code,
            "receive",
            format!("qty={quantity} current={}", next.current),
        );
        tracing::info!(code = %material.code, quantity, "stock received");
        Ok(transaction_id)
    }

    async fn require_material(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
        quantity: u64,
    ) -> Result<BoxMaterial, EngineError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let requirement = BoxMaterial::new(box_id, material_id, quantity);
        let mut state = self.store.write();
        state.insert_box_material(requirement.clone())?;
        refresh_materials_flag(&mut state, box_id)?;
        drop(state);

        self.audit.record(
            "box_material",
            requirement.id,
            "require",
            format!("qty={quantity}"),
        );
        Ok(requirement)
    }

    async fn reserve(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
        quantity: u64,
        actor: MemberId,
    ) -> Result<ReservationReceipt, EngineError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let mut state = self.store.write();
        let requirement = state.box_material_for(box_id, material_id)?.clone();
        state_machine::validate_box_material_transition(
            requirement.status,
            BoxMaterialStatus::Allocated,
        )?;

        let material = state.material(material_id)?.clone();
        let levels = StockLevels::of(&material);
        // The availability check and the ledger write share this critical
        // section; a racing reservation aborts instead of clamping.
        if levels.available() < quantity {
            return Err(boxtrack_core::StockError::Insufficient {
                material: material.code.clone(),
                requested: quantity,
                available: levels.available(),
            }
            .into());
        }
        let next = levels.apply(TransactionKind::Allocation, quantity, &material)?;

        let material_row = state.material_mut(material_id)?;
        material_row.current_stock = next.current;
        material_row.allocated_stock = next.allocated;
        material_row.version += 1;

        let requirement_row = state.box_material_mut(requirement.id)?;
        requirement_row.allocated_qty = quantity;
        requirement_row.status = BoxMaterialStatus::Allocated;
        requirement_row.version += 1;

        let transaction =
            MaterialTransaction::new(material_id, TransactionKind::Allocation, quantity, actor)
                .against(box_id, requirement.id);
        let transaction_id = transaction.id;
        state.push_transaction(transaction);

        refresh_materials_flag(&mut state, box_id)?;
        drop(state);

        self.audit.record(
            "material",
            &material.code,
            "reserve",
            format!("qty={quantity} allocated={}", next.allocated),
        );
        tracing::info!(code = %material.code, quantity, allocated = next.allocated, "stock reserved");

        Ok(ReservationReceipt {
            transaction_id,
            material_id,
            box_material_id: requirement.id,
            quantity,
            levels: next,
        })
    }

    async fn consume(
        &self,
        box_material_id: BoxMaterialId,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError> {
        let mut state = self.store.write();
        let requirement = state.box_material(box_material_id)?.clone();
        state_machine::validate_box_material_transition(
            requirement.status,
            BoxMaterialStatus::Consumed,
        )?;

        let quantity = requirement.allocated_qty;
        let material = state.material(requirement.material_id)?.clone();
        let next =
            StockLevels::of(&material).apply(TransactionKind::Consumption, quantity, &material)?;

        let material_row = state.material_mut(requirement.material_id)?;
        material_row.current_stock = next.current;
        material_row.allocated_stock = next.allocated;
        material_row.version += 1;

        let requirement_row = state.box_material_mut(box_material_id)?;
        requirement_row.consumed_qty += quantity;
        requirement_row.allocated_qty = 0;
        requirement_row.status = BoxMaterialStatus::Consumed;
        requirement_row.version += 1;

        let transaction = MaterialTransaction::new(
            requirement.material_id,
            TransactionKind::Consumption,
            quantity,
            actor,
        )
        .against(requirement.box_id, box_material_id);
        let transaction_id = transaction.id;
        state.push_transaction(transaction);
        drop(state);

        self.audit.record(
            "material",
            &material.code,
            "consume",
            format!("qty={quantity} current={}", next.current),
        );
        tracing::info!(code = %material.code, quantity, "stock consumed");
        Ok(transaction_id)
    }

    async fn release(
        &self,
        box_material_id: BoxMaterialId,
        actor: MemberId,
    ) -> Result<TransactionId, EngineError> {
        let mut state = self.store.write();
        let requirement = state.box_material(box_material_id)?.clone();
        state_machine::validate_box_material_transition(
            requirement.status,
            BoxMaterialStatus::Pending,
        )?;

        let quantity = requirement.allocated_qty;
        let material = state.material(requirement.material_id)?.clone();
        let next = StockLevels::of(&material).apply(TransactionKind::Return, quantity, &material)?;

        let material_row = state.material_mut(requirement.material_id)?;
        material_row.current_stock = next.current;
        material_row.allocated_stock = next.allocated;
        material_row.version += 1;

        let requirement_row = state.box_material_mut(box_material_id)?;
        requirement_row.allocated_qty = 0;
        requirement_row.status = BoxMaterialStatus::Pending;
        requirement_row.version += 1;

        let transaction = MaterialTransaction::new(
            requirement.material_id,
            TransactionKind::Return,
            quantity,
            actor,
        )
        .against(requirement.box_id, box_material_id);
        let transaction_id = transaction.id;
        state.push_transaction(transaction);

        refresh_materials_flag(&mut state, requirement.box_id)?;
        drop(state);

        self.audit.record(
            "material",
            &material.code,
            "release",
            format!("qty={quantity} allocated={}", next.allocated),
        );
        tracing::info!(code = %material.code, quantity, "reservation released");
        Ok(transaction_id)
    }

    async fn replay_stock(&self, material_id: MaterialId) -> Result<StockLevels, EngineError> {
        let state = self.store.read();
        let material = state.material(material_id)?;
        let levels = replay(material, state.transactions_for(material_id))?;
        Ok(levels)
    }

    async fn reconcile(&self, material_id: MaterialId) -> Result<ReconcileReport, EngineError> {
        let mut state = self.store.write();
        let material = state.material(material_id)?.clone();
        let ledger_levels = replay(&material, state.transactions_for(material_id))?;
        let columns = StockLevels::of(&material);
        let drift_detected = ledger_levels != columns;

        if drift_detected {
            let row = state.material_mut(material_id)?;
            row.current_stock = ledger_levels.current;
            row.allocated_stock = ledger_levels.allocated;
            row.version += 1;
        }
        drop(state);

        if drift_detected {
            self.audit.record(
                "material",
                &material.code,
                "reconcile",
                format!(
                    "columns=({},{}) ledger=({},{})",
                    columns.current, columns.allocated, ledger_levels.current, ledger_levels.allocated
                ),
            );
            tracing::warn!(code = %material.code, "stock drift repaired from ledger");
        } else {
            tracing::debug!(code = %material.code, "stock counters match ledger");
        }

        Ok(ReconcileReport {
            material_id,
            ledger: ledger_levels,
            columns,
            drift_detected,
            repaired: drift_detected,
        })
    }
}

#[async_trait]
impl InspectionGate for TrackerEngine {
    async fn request_inspection(
        &self,
        activity_id: BoxActivityId,
        requested_by: MemberId,
    ) -> Result<WirRecord, EngineError> {
        let mut state = self.store.write();
        let activity = state.activity(activity_id)?.clone();
        if !activity.is_wir_checkpoint {
            return Err(ValidationError::NotACheckpoint(activity_id).into());
        }
        if state.open_wir_exists(activity_id) {
            return Err(ValidationError::OpenInspectionExists(activity_id).into());
        }

        let record = WirRecord::new(activity_id, activity.wir_code.clone(), requested_by);
        state.insert_wir(record.clone());
        drop(state);

        self.audit.record(
            "wir",
            record.id,
            "request",
            format!("activity={activity_id}"),
        );
        tracing::info!(wir = %record.id, %activity_id, "inspection requested");
        Ok(record)
    }

    async fn begin_review(&self, wir_id: WirId, inspector: MemberId) -> Result<(), EngineError> {
        let mut state = self.store.write();
        let record = state.wir(wir_id)?;
        state_machine::validate_wir_transition(record.status, WirStatus::UnderReview)?;

        let row = state.wir_mut(wir_id)?;
        row.status = WirStatus::UnderReview;
        row.inspector = Some(inspector);
        row.version += 1;
        drop(state);

        self.audit.record("wir", wir_id, "begin_review", "");
        tracing::info!(wir = %wir_id, "inspection under review");
        Ok(())
    }

    async fn approve(&self, wir_id: WirId, notes: Option<String>) -> Result<(), EngineError> {
        let mut state = self.store.write();
        let record = state.wir(wir_id)?;
        state_machine::validate_wir_transition(record.status, WirStatus::Approved)?;
        let activity_id = record.box_activity_id;

        let row = state.wir_mut(wir_id)?;
        row.status = WirStatus::Approved;
        row.notes = notes;
        row.reviewed_at = Some(Utc::now());
        row.version += 1;
        drop(state);

        self.audit.record(
            "wir",
            wir_id,
            "approve",
            format!("activity={activity_id}"),
        );
        // The gate only signals; completing the checkpoint remains an
        // explicit advance call by the activity's writer.
        tracing::info!(wir = %wir_id, %activity_id, "inspection approved; checkpoint may complete");
        Ok(())
    }

    async fn reject(&self, wir_id: WirId, reason: String) -> Result<(), EngineError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyRejectionReason.into());
        }

        let mut state = self.store.write();
        let record = state.wir(wir_id)?;
        state_machine::validate_wir_transition(record.status, WirStatus::Rejected)?;

        let row = state.wir_mut(wir_id)?;
        row.status = WirStatus::Rejected;
        row.rejection_reason = Some(reason.clone());
        row.reviewed_at = Some(Utc::now());
        row.version += 1;
        drop(state);

        self.audit.record("wir", wir_id, "reject", reason);
        tracing::warn!(wir = %wir_id, "inspection rejected");
        Ok(())
    }

    async fn resubmit(&self, wir_id: WirId) -> Result<(), EngineError> {
        let mut state = self.store.write();
        let record = state.wir(wir_id)?;
        state_machine::validate_wir_transition(record.status, WirStatus::Requested)?;

        let row = state.wir_mut(wir_id)?;
        row.status = WirStatus::Requested;
        row.rejection_reason = None;
        row.reviewed_at = None;
        row.version += 1;
        drop(state);

        self.audit.record("wir", wir_id, "resubmit", "");
        tracing::info!(wir = %wir_id, "inspection resubmitted");
        Ok(())
    }

    async fn close(&self, wir_id: WirId) -> Result<(), EngineError> {
        let mut state = self.store.write();
        let record = state.wir(wir_id)?;
        state_machine::validate_wir_transition(record.status, WirStatus::Closed)?;

        let row = state.wir_mut(wir_id)?;
        row.status = WirStatus::Closed;
        row.version += 1;
        drop(state);

        self.audit.record("wir", wir_id, "close", "");
        tracing::info!(wir = %wir_id, "inspection closed after rejection");
        Ok(())
    }
}

#[async_trait]
impl ProgressReporter for TrackerEngine {
    async fn box_progress(&self, box_id: BoxId) -> Result<f64, EngineError> {
        let state = self.store.read();
        state.box_unit(box_id)?;
        Ok(progress::box_progress(&state.activities_of_cloned(box_id)))
    }

    async fn project_progress(&self, project_id: ProjectId) -> Result<f64, EngineError> {
        let state = self.store.read();
        state.project(project_id)?;
        let boxes: Vec<BoxUnit> = state.boxes_of(project_id).into_iter().cloned().collect();
        Ok(progress::project_progress(&boxes))
    }

    async fn recompute_box(&self, box_id: BoxId) -> Result<f64, EngineError> {
        let mut state = self.store.write();
        state.box_unit(box_id)?;
        let box_progress = refresh_rollups(&mut state, box_id)?;
        drop(state);
        tracing::debug!(%box_id, box_progress, "roll-up recomputed");
        Ok(box_progress)
    }
}
