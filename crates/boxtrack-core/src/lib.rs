//! Domain model for the boxtrack production workflow.
//!
//! This crate carries no engine logic: it defines the entities a precast
//! production tracker persists (projects, boxes, activities, materials,
//! inspection records), their status enums, and the error taxonomy shared
//! by every operation in the workspace.

pub mod activity;
pub mod error;
pub mod ids;
pub mod material;
pub mod project;
pub mod wir;

pub use activity::*;
pub use error::*;
pub use ids::*;
pub use material::*;
pub use project::*;
pub use wir::*;
