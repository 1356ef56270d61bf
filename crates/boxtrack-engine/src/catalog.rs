//! Activity catalog: immutable, ordered reference data.
//!
//! Templates are code-addressable and kept in `overall_sequence` order; a
//! box's schedule is the catalog filtered by the box's type.

use boxtrack_core::{duplicate, ActivityCode, ActivityTemplate, ScheduleError, ValidationError};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Validated, immutable set of activity templates.
#[derive(Debug, Clone)]
pub struct ActivityCatalog {
    templates: IndexMap<ActivityCode, ActivityTemplate>,
}

impl ActivityCatalog {
    /// Build a catalog from templates.
    ///
    /// Templates are sorted by `overall_sequence`. Construction validates
    /// that codes are non-blank and unique and that every prerequisite
    /// code resolves to some catalog entry. Whether a prerequisite is
    /// present for a *specific box type* is checked later, at schedule
    /// instantiation.
    ///
    /// # Errors
    /// - `ValidationError::Duplicate` on a reused code
    /// - `ValidationError::NotFound` on a blank code
    pub fn from_templates(
        mut templates: Vec<ActivityTemplate>,
    ) -> Result<Self, ValidationError> {
        templates.sort_by_key(|t| t.overall_sequence);

        let mut map = IndexMap::with_capacity(templates.len());
        for template in templates {
            if template.code.is_blank() {
                return Err(ValidationError::NotFound {
                    entity: "activity code",
                    key: String::from("<blank>"),
                });
            }
            if map.contains_key(&template.code) {
                return Err(duplicate("activity code", &template.code));
            }
            map.insert(template.code.clone(), template);
        }

        let catalog = Self { templates: map };
        catalog.check_prerequisites()?;
        Ok(catalog)
    }

    fn check_prerequisites(&self) -> Result<(), ValidationError> {
        for template in self.templates.values() {
            for prerequisite in &template.prerequisites {
                if !self.templates.contains_key(prerequisite) {
                    return Err(ValidationError::NotFound {
                        entity: "prerequisite activity",
                        key: prerequisite.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a template by code.
    #[inline]
    #[must_use]
    pub fn get(&self, code: &ActivityCode) -> Option<&ActivityTemplate> {
        self.templates.get(code)
    }

    /// All templates in pipeline order.
    pub fn templates(&self) -> impl Iterator<Item = &ActivityTemplate> {
        self.templates.values()
    }

    /// Templates applicable to the given box type, in pipeline order.
    #[must_use]
    pub fn applicable_for(&self, box_type: &str) -> Vec<&ActivityTemplate> {
        self.templates
            .values()
            .filter(|t| t.applies_to(box_type))
            .collect()
    }

    /// Number of templates.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Stage names in pipeline order, deduplicated.
    #[must_use]
    pub fn stages(&self) -> Vec<(u32, String)> {
        let mut stages: Vec<(u32, String)> = Vec::new();
        for template in self.templates.values() {
            if stages.last().map(|(n, _)| *n) != Some(template.stage_number) {
                stages.push((template.stage_number, template.stage_name.clone()));
            }
        }
        stages
    }

    /// Reject templates whose prerequisites can never resolve for any box
    /// type they apply to (a prerequisite restricted to a disjoint type
    /// set). Used by catalog tooling, not by instantiation.
    pub fn lint(&self) -> Vec<ScheduleError> {
        let mut findings = Vec::new();
        for template in self.templates.values() {
            for prerequisite in &template.prerequisites {
                if prerequisite == &template.code {
                    findings.push(ScheduleError::SelfDependency(template.code.clone()));
                }
            }
        }
        findings
    }
}

static STANDARD: Lazy<ActivityCatalog> = Lazy::new(|| {
    // Built-in reference pipeline for a precast box factory. Quality gates
    // close each stage and are inspection checkpoints.
    let templates = vec![
        ActivityTemplate::new("MLD-PREP", "Mould preparation", "Mould & Cage", 1, 1, 1)
            .with_duration_days(1),
        ActivityTemplate::new("CAGE-FAB", "Reinforcement cage fabrication", "Mould & Cage", 1, 2, 2)
            .with_duration_days(2),
        ActivityTemplate::new("CAGE-QC", "Cage inspection", "Mould & Cage", 1, 3, 3)
            .with_duration_days(1)
            .with_checkpoint("WIR-CAGE")
            .after(["MLD-PREP", "CAGE-FAB"]),
        ActivityTemplate::new("CAST-POUR", "Concrete pour", "Casting", 2, 1, 4)
            .with_duration_days(1)
            .after(["CAGE-QC"]),
        ActivityTemplate::new("CAST-CURE", "Curing", "Casting", 2, 2, 5)
            .with_duration_days(7)
            .after(["CAST-POUR"]),
        ActivityTemplate::new("CAST-QC", "Casting inspection", "Casting", 2, 3, 6)
            .with_duration_days(1)
            .with_checkpoint("WIR-CAST")
            .after(["CAST-CURE"]),
        ActivityTemplate::new("FIT-MEP", "MEP fit-out", "Fit-out & Finish", 3, 1, 7)
            .with_duration_days(4)
            .for_box_types(["Bathroom", "Plant"])
            .after(["CAST-QC"]),
        ActivityTemplate::new("FIT-JOIN", "Joinery and internal walls", "Fit-out & Finish", 3, 2, 8)
            .with_duration_days(3)
            .after(["CAST-QC"]),
        ActivityTemplate::new("FIN-PAINT", "Surface finish and paint", "Fit-out & Finish", 3, 3, 9)
            .with_duration_days(2)
            .after(["FIT-JOIN"]),
        ActivityTemplate::new("FIN-QC", "Final inspection", "Fit-out & Finish", 3, 4, 10)
            .with_duration_days(1)
            .with_checkpoint("WIR-FINAL")
            .after(["FIN-PAINT"]),
    ];
    ActivityCatalog::from_templates(templates).expect("built-in catalog is valid")
});

/// The built-in production pipeline.
#[must_use]
pub fn standard_catalog() -> &'static ActivityCatalog {
    &STANDARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_ordered() {
        let catalog = standard_catalog();
        let sequences: Vec<u32> = catalog.templates().map(|t| t.overall_sequence).collect();
        let mut sorted = sequences.clone();
        sorted.sort_unstable();
        assert_eq!(sequences, sorted);
        assert_eq!(catalog.len(), 10);
    }

    #[test]
    fn standard_catalog_filters_by_type() {
        let catalog = standard_catalog();
        let standard = catalog.applicable_for("Standard");
        let bathroom = catalog.applicable_for("Bathroom");

        // FIT-MEP only applies to Bathroom and Plant boxes.
        assert_eq!(standard.len(), 9);
        assert_eq!(bathroom.len(), 10);
    }

    #[test]
    fn rejects_duplicate_codes() {
        let templates = vec![
            ActivityTemplate::new("A", "First", "Stage", 1, 1, 1),
            ActivityTemplate::new("A", "Second", "Stage", 1, 2, 2),
        ];
        let err = ActivityCatalog::from_templates(templates).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
    }

    #[test]
    fn rejects_unresolved_prerequisite() {
        let templates = vec![
            ActivityTemplate::new("A", "First", "Stage", 1, 1, 1).after(["MISSING"])
        ];
        let err = ActivityCatalog::from_templates(templates).unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
    }

    #[test]
    fn stages_deduplicate_in_order() {
        let catalog = standard_catalog();
        let stages = catalog.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].1, "Mould & Cage");
        assert_eq!(stages[2].1, "Fit-out & Finish");
    }

    #[test]
    fn lint_flags_self_dependency() {
        let templates =
            vec![ActivityTemplate::new("A", "First", "Stage", 1, 1, 1).after(["A"])];
        let catalog = ActivityCatalog::from_templates(templates).unwrap();
        assert_eq!(catalog.lint().len(), 1);
    }
}
