// Dashboard actions
pub mod notes;
pub mod projects;
pub mod tasks;

// Read views
pub mod dashboard;

// User accounts (seeding)
pub mod accounts;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::project;
use crate::errors::ServiceError;

pub const PROJECT_NOT_FOUND: &str = "Proyecto no encontrado";
pub const NOTE_NOT_FOUND: &str = "Nota no encontrada";
pub const TASK_NOT_FOUND: &str = "Tarea no encontrada";

/// Loads a project only if it belongs to `owner_id`.
///
/// Missing and foreign projects are indistinguishable to the caller.
pub(crate) async fn find_owned_project(
    db: &DatabaseConnection,
    project_id: Uuid,
    owner_id: Uuid,
) -> Result<project::Model, ServiceError> {
    project::Entity::find_by_id(project_id)
        .filter(project::Column::UserId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found(PROJECT_NOT_FOUND))
}
