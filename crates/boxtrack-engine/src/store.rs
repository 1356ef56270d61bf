//! In-memory system of record.
//!
//! One `RwLock` guards the whole state, so every engine operation runs as
//! a single short-lived critical section and commits all-or-nothing.
//! Rows that field crews and inspectors contend on carry a `version`
//! counter for optimistic concurrency.

use crate::schedule::DependencyGraph;
use boxtrack_core::{
    duplicate, not_found, BoxActivity, BoxActivityId, BoxId, BoxMaterial, BoxMaterialId, BoxUnit,
    DependencyEdge, Material, MaterialCode, MaterialId, MaterialTransaction, Project, ProjectId,
    ValidationError, WirId, WirRecord,
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;

/// All persisted rows and their uniqueness indexes.
#[derive(Debug, Default)]
pub struct StoreState {
    projects: HashMap<ProjectId, Project>,
    project_codes: HashMap<String, ProjectId>,
    boxes: HashMap<BoxId, BoxUnit>,
    box_tags: HashMap<(ProjectId, String), BoxId>,
    activities: HashMap<BoxActivityId, BoxActivity>,
    schedules: HashMap<BoxId, Vec<BoxActivityId>>,
    graphs: HashMap<BoxId, DependencyGraph>,
    dependencies: HashMap<BoxId, Vec<DependencyEdge>>,
    materials: HashMap<MaterialId, Material>,
    material_codes: HashMap<MaterialCode, MaterialId>,
    box_materials: HashMap<BoxMaterialId, BoxMaterial>,
    box_material_index: HashMap<(BoxId, MaterialId), BoxMaterialId>,
    transactions: Vec<MaterialTransaction>,
    wirs: HashMap<WirId, WirRecord>,
    activity_wirs: HashMap<BoxActivityId, Vec<WirId>>,
}

impl StoreState {
    // ---- projects ----

    /// Insert a project, enforcing code uniqueness.
    pub fn insert_project(&mut self, project: Project) -> Result<(), ValidationError> {
        if self.project_codes.contains_key(&project.code) {
            return Err(duplicate("project code", &project.code));
        }
        self.project_codes.insert(project.code.clone(), project.id);
        self.projects.insert(project.id, project);
        Ok(())
    }

    /// Project row by id.
    pub fn project(&self, id: ProjectId) -> Result<&Project, ValidationError> {
        self.projects.get(&id).ok_or_else(|| not_found("project", id))
    }

    /// Mutable project row by id.
    pub fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project, ValidationError> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| not_found("project", id))
    }

    /// All boxes of a project.
    #[must_use]
    pub fn boxes_of(&self, project_id: ProjectId) -> Vec<&BoxUnit> {
        let mut boxes: Vec<&BoxUnit> = self
            .boxes
            .values()
            .filter(|b| b.project_id == project_id)
            .collect();
        boxes.sort_by(|a, b| a.tag.cmp(&b.tag));
        boxes
    }

    // ---- boxes ----

    /// Insert a box, enforcing `(project, tag)` uniqueness.
    pub fn insert_box(&mut self, unit: BoxUnit) -> Result<(), ValidationError> {
        self.project(unit.project_id)?;
        let key = (unit.project_id, unit.tag.clone());
        if self.box_tags.contains_key(&key) {
            return Err(duplicate("box tag", &unit.tag));
        }
        self.box_tags.insert(key, unit.id);
        if let Some(project) = self.projects.get_mut(&unit.project_id) {
            project.total_boxes += 1;
        }
        self.boxes.insert(unit.id, unit);
        Ok(())
    }

    /// Box row by id.
    pub fn box_unit(&self, id: BoxId) -> Result<&BoxUnit, ValidationError> {
        self.boxes.get(&id).ok_or_else(|| not_found("box", id))
    }

    /// Mutable box row by id.
    pub fn box_unit_mut(&mut self, id: BoxId) -> Result<&mut BoxUnit, ValidationError> {
        self.boxes.get_mut(&id).ok_or_else(|| not_found("box", id))
    }

    /// Remove a box and cascade to its activities, dependencies,
    /// inspection records, and requirement rows. Ledger transactions are
    /// append-only history and stay.
    ///
    /// Returns the number of cascaded activity rows.
    pub fn remove_box(&mut self, id: BoxId) -> Result<usize, ValidationError> {
        let unit = self.boxes.remove(&id).ok_or_else(|| not_found("box", id))?;
        self.box_tags.remove(&(unit.project_id, unit.tag.clone()));
        if let Some(project) = self.projects.get_mut(&unit.project_id) {
            project.total_boxes = project.total_boxes.saturating_sub(1);
        }

        let activity_ids = self.schedules.remove(&id).unwrap_or_default();
        for activity_id in &activity_ids {
            self.activities.remove(activity_id);
            for wir_id in self.activity_wirs.remove(activity_id).unwrap_or_default() {
                self.wirs.remove(&wir_id);
            }
        }
        self.graphs.remove(&id);
        self.dependencies.remove(&id);

        let requirement_ids: Vec<BoxMaterialId> = self
            .box_materials
            .values()
            .filter(|bm| bm.box_id == id)
            .map(|bm| bm.id)
            .collect();
        for requirement_id in requirement_ids {
            if let Some(requirement) = self.box_materials.remove(&requirement_id) {
                self.box_material_index
                    .remove(&(requirement.box_id, requirement.material_id));
            }
        }

        Ok(activity_ids.len())
    }

    // ---- schedules ----

    /// Whether a schedule was already instantiated for the box.
    #[must_use]
    pub fn has_schedule(&self, box_id: BoxId) -> bool {
        self.schedules.contains_key(&box_id)
    }

    /// Commit a fully built schedule: activity rows, their order, the
    /// dependency graph, and the recorded edges.
    pub fn insert_schedule(
        &mut self,
        box_id: BoxId,
        activities: Vec<BoxActivity>,
        graph: DependencyGraph,
        edges: Vec<DependencyEdge>,
    ) {
        let order: Vec<BoxActivityId> = activities.iter().map(|a| a.id).collect();
        for activity in activities {
            self.activities.insert(activity.id, activity);
        }
        self.schedules.insert(box_id, order);
        self.graphs.insert(box_id, graph);
        self.dependencies.insert(box_id, edges);
    }

    /// Activity row by id.
    pub fn activity(&self, id: BoxActivityId) -> Result<&BoxActivity, ValidationError> {
        self.activities
            .get(&id)
            .ok_or_else(|| not_found("box activity", id))
    }

    /// Mutable activity row by id.
    pub fn activity_mut(&mut self, id: BoxActivityId) -> Result<&mut BoxActivity, ValidationError> {
        self.activities
            .get_mut(&id)
            .ok_or_else(|| not_found("box activity", id))
    }

    /// A box's activities in sequence order.
    #[must_use]
    pub fn activities_of(&self, box_id: BoxId) -> Vec<&BoxActivity> {
        self.schedules
            .get(&box_id)
            .map(|order| {
                order
                    .iter()
                    .filter_map(|id| self.activities.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cloned snapshot of a box's activities in sequence order.
    #[must_use]
    pub fn activities_of_cloned(&self, box_id: BoxId) -> Vec<BoxActivity> {
        self.activities_of(box_id).into_iter().cloned().collect()
    }

    /// Dependency graph of a box.
    pub fn graph(&self, box_id: BoxId) -> Result<&DependencyGraph, ValidationError> {
        self.graphs
            .get(&box_id)
            .ok_or_else(|| not_found("box schedule", box_id))
    }

    /// Recorded dependency edges of a box.
    #[must_use]
    pub fn dependencies_of(&self, box_id: BoxId) -> &[DependencyEdge] {
        self.dependencies
            .get(&box_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ---- materials ----

    /// Insert a material, enforcing code uniqueness.
    pub fn insert_material(&mut self, material: Material) -> Result<(), ValidationError> {
        if self.material_codes.contains_key(&material.code) {
            return Err(duplicate("material code", &material.code));
        }
        self.material_codes
            .insert(material.code.clone(), material.id);
        self.materials.insert(material.id, material);
        Ok(())
    }

    /// Material row by id.
    pub fn material(&self, id: MaterialId) -> Result<&Material, ValidationError> {
        self.materials
            .get(&id)
            .ok_or_else(|| not_found("material", id))
    }

    /// Mutable material row by id.
    pub fn material_mut(&mut self, id: MaterialId) -> Result<&mut Material, ValidationError> {
        self.materials
            .get_mut(&id)
            .ok_or_else(|| not_found("material", id))
    }

    /// Material row by code.
    pub fn material_by_code(&self, code: &MaterialCode) -> Result<&Material, ValidationError> {
        let id = self
            .material_codes
            .get(code)
            .ok_or_else(|| not_found("material", code))?;
        self.material(*id)
    }

    /// Insert a requirement row, one per `(box, material)`.
    pub fn insert_box_material(&mut self, requirement: BoxMaterial) -> Result<(), ValidationError> {
        self.box_unit(requirement.box_id)?;
        self.material(requirement.material_id)?;
        let key = (requirement.box_id, requirement.material_id);
        if self.box_material_index.contains_key(&key) {
            return Err(duplicate("box material requirement", requirement.id));
        }
        self.box_material_index.insert(key, requirement.id);
        self.box_materials.insert(requirement.id, requirement);
        Ok(())
    }

    /// Requirement row by id.
    pub fn box_material(&self, id: BoxMaterialId) -> Result<&BoxMaterial, ValidationError> {
        self.box_materials
            .get(&id)
            .ok_or_else(|| not_found("box material requirement", id))
    }

    /// Mutable requirement row by id.
    pub fn box_material_mut(
        &mut self,
        id: BoxMaterialId,
    ) -> Result<&mut BoxMaterial, ValidationError> {
        self.box_materials
            .get_mut(&id)
            .ok_or_else(|| not_found("box material requirement", id))
    }

    /// Requirement row for a `(box, material)` pair.
    pub fn box_material_for(
        &self,
        box_id: BoxId,
        material_id: MaterialId,
    ) -> Result<&BoxMaterial, ValidationError> {
        let id = self
            .box_material_index
            .get(&(box_id, material_id))
            .ok_or_else(|| not_found("box material requirement", box_id))?;
        self.box_material(*id)
    }

    /// All requirement rows of a box.
    #[must_use]
    pub fn box_materials_of(&self, box_id: BoxId) -> Vec<&BoxMaterial> {
        self.box_materials
            .values()
            .filter(|bm| bm.box_id == box_id)
            .collect()
    }

    // ---- ledger ----

    /// Append a ledger row.
    pub fn push_transaction(&mut self, transaction: MaterialTransaction) {
        self.transactions.push(transaction);
    }

    /// A material's ledger rows, oldest first.
    #[must_use]
    pub fn transactions_for(&self, material_id: MaterialId) -> Vec<&MaterialTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.material_id == material_id)
            .collect()
    }

    /// Total number of ledger rows.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    // ---- inspections ----

    /// Insert an inspection record.
    pub fn insert_wir(&mut self, record: WirRecord) {
        self.activity_wirs
            .entry(record.box_activity_id)
            .or_default()
            .push(record.id);
        self.wirs.insert(record.id, record);
    }

    /// Inspection record by id.
    pub fn wir(&self, id: WirId) -> Result<&WirRecord, ValidationError> {
        self.wirs
            .get(&id)
            .ok_or_else(|| not_found("inspection", id))
    }

    /// Mutable inspection record by id.
    pub fn wir_mut(&mut self, id: WirId) -> Result<&mut WirRecord, ValidationError> {
        self.wirs
            .get_mut(&id)
            .ok_or_else(|| not_found("inspection", id))
    }

    /// Inspection records of an activity, oldest first.
    #[must_use]
    pub fn wirs_of(&self, activity_id: BoxActivityId) -> Vec<&WirRecord> {
        self.activity_wirs
            .get(&activity_id)
            .map(|ids| ids.iter().filter_map(|id| self.wirs.get(id)).collect())
            .unwrap_or_default()
    }

    /// Most recent inspection record of an activity.
    #[must_use]
    pub fn latest_wir(&self, activity_id: BoxActivityId) -> Option<&WirRecord> {
        self.wirs_of(activity_id).into_iter().last()
    }

    /// Whether the activity has a non-terminal inspection open.
    #[must_use]
    pub fn open_wir_exists(&self, activity_id: BoxActivityId) -> bool {
        self.wirs_of(activity_id)
            .iter()
            .any(|w| !w.status.is_terminal())
    }
}

/// Lock wrapper handing out critical sections over [`StoreState`].
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
}

impl Store {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read()
    }

    /// Exclusive write access; the span of one logical transaction.
    pub fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_tags_unique_per_project() {
        let mut state = StoreState::default();
        let project = Project::new("PRJ-1", "Riverside");
        let project_id = project.id;
        state.insert_project(project).unwrap();

        state
            .insert_box(BoxUnit::new(project_id, "B-101", "Standard"))
            .unwrap();
        let err = state
            .insert_box(BoxUnit::new(project_id, "B-101", "Standard"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));

        // Same tag under a different project is fine.
        let other = Project::new("PRJ-2", "Hillside");
        let other_id = other.id;
        state.insert_project(other).unwrap();
        state
            .insert_box(BoxUnit::new(other_id, "B-101", "Standard"))
            .unwrap();
    }

    #[test]
    fn insert_box_counts_toward_project() {
        let mut state = StoreState::default();
        let project = Project::new("PRJ-1", "Riverside");
        let project_id = project.id;
        state.insert_project(project).unwrap();

        state
            .insert_box(BoxUnit::new(project_id, "B-101", "Standard"))
            .unwrap();
        state
            .insert_box(BoxUnit::new(project_id, "B-102", "Standard"))
            .unwrap();
        assert_eq!(state.project(project_id).unwrap().total_boxes, 2);
    }

    #[test]
    fn remove_box_cascades() {
        let mut state = StoreState::default();
        let project = Project::new("PRJ-1", "Riverside");
        let project_id = project.id;
        state.insert_project(project).unwrap();

        let unit = BoxUnit::new(project_id, "B-101", "Standard");
        let box_id = unit.id;
        state.insert_box(unit).unwrap();

        let template = boxtrack_core::ActivityTemplate::new("A", "Act", "Stage", 1, 1, 1);
        let activity = BoxActivity::from_template(box_id, &template, 1);
        let activity_id = activity.id;
        let mut graph = DependencyGraph::new();
        graph.add_activity(activity_id);
        state.insert_schedule(box_id, vec![activity], graph, Vec::new());

        let record = WirRecord::new(activity_id, None, boxtrack_core::MemberId::new());
        let wir_id = record.id;
        state.insert_wir(record);

        let removed = state.remove_box(box_id).unwrap();
        assert_eq!(removed, 1);
        assert!(state.box_unit(box_id).is_err());
        assert!(state.activity(activity_id).is_err());
        assert!(state.wir(wir_id).is_err());
        assert_eq!(state.project(project_id).unwrap().total_boxes, 0);
    }

    #[test]
    fn material_codes_unique() {
        let mut state = StoreState::default();
        state
            .insert_material(Material::new("M-CEMENT", "Cement", "kg"))
            .unwrap();
        let err = state
            .insert_material(Material::new("M-CEMENT", "Other cement", "kg"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
    }

    #[test]
    fn latest_wir_is_most_recent() {
        let mut state = StoreState::default();
        let activity_id = BoxActivityId::new();
        let first = WirRecord::new(activity_id, None, boxtrack_core::MemberId::new());
        let second = WirRecord::new(activity_id, None, boxtrack_core::MemberId::new());
        let second_id = second.id;
        state.insert_wir(first);
        state.insert_wir(second);

        assert_eq!(state.latest_wir(activity_id).unwrap().id, second_id);
        assert!(state.open_wir_exists(activity_id));
    }
}
