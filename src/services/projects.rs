use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, Unchanged};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::find_owned_project;
use crate::{
    auth::Session,
    db::DbPool,
    dto::{ProjectDraft, ProjectInput},
    entities::{project, ProjectStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    timeline::Timeline,
    tracing::observe_action,
};

pub const ALREADY_FINISHED: &str = "El proyecto ya está finalizado";

/// Project lifecycle actions: create, edit and deliver.
#[derive(Clone)]
pub struct ProjectService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeline: Timeline,
}

impl ProjectService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeline: Timeline) -> Self {
        Self {
            db_pool,
            event_sender,
            timeline,
        }
    }

    /// Creates a project owned by the caller. Status always starts ACTIVE.
    #[instrument(skip(self, session, input))]
    pub async fn create_project(
        &self,
        session: &Session,
        input: ProjectInput,
    ) -> Result<project::Model, ServiceError> {
        observe_action("create_project", self.create(session, input)).await
    }

    /// Replaces the editable fields of an owned project. Status and delivery are untouched.
    #[instrument(skip(self, session, input), fields(project_id = %project_id))]
    pub async fn update_project(
        &self,
        session: &Session,
        project_id: Uuid,
        input: ProjectInput,
    ) -> Result<project::Model, ServiceError> {
        observe_action("update_project", self.update(session, project_id, input)).await
    }

    /// Marks an ACTIVE project as delivered now.
    #[instrument(skip(self, session), fields(project_id = %project_id))]
    pub async fn finish_project(
        &self,
        session: &Session,
        project_id: Uuid,
    ) -> Result<project::Model, ServiceError> {
        observe_action("finish_project", self.finish(session, project_id)).await
    }

    async fn create(
        &self,
        session: &Session,
        input: ProjectInput,
    ) -> Result<project::Model, ServiceError> {
        let caller = session.caller()?;
        let draft = input.into_draft(self.timeline.zone())?;
        let now = self.timeline.now();

        let model = project::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(caller.user_id),
            status: Set(ProjectStatus::Active),
            delivered_at: Set(None),
            created_at: Set(now),
            ..draft_fields(draft)
        };

        let saved = model.insert(&*self.db_pool).await?;

        self.event_sender
            .publish(Event::ProjectCreated {
                project_id: saved.id,
                owner_id: caller.user_id,
            })
            .await;

        info!(project_id = %saved.id, user_id = %caller.user_id, "Project created");
        Ok(saved)
    }

    async fn update(
        &self,
        session: &Session,
        project_id: Uuid,
        input: ProjectInput,
    ) -> Result<project::Model, ServiceError> {
        let caller = session.caller()?;
        let draft = input.into_draft(self.timeline.zone())?;
        let existing = find_owned_project(&self.db_pool, project_id, caller.user_id).await?;

        let model = project::ActiveModel {
            id: Unchanged(existing.id),
            ..draft_fields(draft)
        };
        let updated = model.update(&*self.db_pool).await?;

        self.event_sender
            .publish(Event::ProjectUpdated {
                project_id: updated.id,
            })
            .await;

        info!(project_id = %updated.id, "Project updated");
        Ok(updated)
    }

    async fn finish(
        &self,
        session: &Session,
        project_id: Uuid,
    ) -> Result<project::Model, ServiceError> {
        let caller = session.caller()?;
        let current = find_owned_project(&self.db_pool, project_id, caller.user_id).await?;
        if !current.status.can_transition_to(ProjectStatus::Finished) {
            return Err(ServiceError::InvalidOperation(ALREADY_FINISHED.to_string()));
        }
        let delivered_at = self.timeline.now();

        // The status filter makes the transition atomic: a concurrent call matches no row.
        let result = project::Entity::update_many()
            .set(project::ActiveModel {
                status: Set(ProjectStatus::Finished),
                delivered_at: Set(Some(delivered_at)),
                ..Default::default()
            })
            .filter(project::Column::Id.eq(project_id))
            .filter(project::Column::UserId.eq(caller.user_id))
            .filter(project::Column::Status.eq(current.status))
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidOperation(ALREADY_FINISHED.to_string()));
        }

        let project = project::Model {
            status: ProjectStatus::Finished,
            delivered_at: Some(delivered_at),
            ..current
        };

        self.event_sender
            .publish(Event::ProjectFinished {
                project_id,
                delivered_at,
            })
            .await;

        info!(project_id = %project_id, "Project finished");
        Ok(project)
    }
}

fn draft_fields(draft: ProjectDraft) -> project::ActiveModel {
    project::ActiveModel {
        name: Set(draft.name),
        client_name: Set(draft.client_name),
        client_whatsapp: Set(draft.client_whatsapp),
        project_type: Set(draft.project_type),
        custom_description: Set(draft.custom_description),
        start_date: Set(draft.start_date),
        deadline: Set(draft.deadline),
        ..Default::default()
    }
}
