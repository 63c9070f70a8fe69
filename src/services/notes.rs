use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, Unchanged};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{find_owned_project, NOTE_NOT_FOUND};
use crate::{
    auth::Session,
    db::DbPool,
    dto::NoteInput,
    entities::note,
    errors::ServiceError,
    events::{Event, EventSender},
    timeline::Timeline,
    tracing::observe_action,
};

/// Free-text notes attached to a project, visible only to their author.
#[derive(Clone)]
pub struct NoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeline: Timeline,
}

impl NoteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeline: Timeline) -> Self {
        Self {
            db_pool,
            event_sender,
            timeline,
        }
    }

    #[instrument(skip(self, session, input), fields(project_id = %project_id))]
    pub async fn create_note(
        &self,
        session: &Session,
        project_id: Uuid,
        input: NoteInput,
    ) -> Result<note::Model, ServiceError> {
        observe_action("create_note", self.create(session, project_id, input)).await
    }

    #[instrument(skip(self, session, input), fields(note_id = %note_id))]
    pub async fn update_note(
        &self,
        session: &Session,
        note_id: Uuid,
        input: NoteInput,
    ) -> Result<note::Model, ServiceError> {
        observe_action("update_note", self.update(session, note_id, input)).await
    }

    #[instrument(skip(self, session), fields(note_id = %note_id))]
    pub async fn delete_note(&self, session: &Session, note_id: Uuid) -> Result<(), ServiceError> {
        observe_action("delete_note", self.delete(session, note_id)).await
    }

    async fn create(
        &self,
        session: &Session,
        project_id: Uuid,
        input: NoteInput,
    ) -> Result<note::Model, ServiceError> {
        let caller = session.caller()?;
        input.validate()?;
        let project = find_owned_project(&self.db_pool, project_id, caller.user_id).await?;

        let saved = note::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project.id),
            user_id: Set(caller.user_id),
            content: Set(input.content),
            created_at: Set(self.timeline.now()),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::NoteCreated {
                note_id: saved.id,
                project_id: saved.project_id,
            })
            .await;

        info!(note_id = %saved.id, "Note created");
        Ok(saved)
    }

    async fn update(
        &self,
        session: &Session,
        note_id: Uuid,
        input: NoteInput,
    ) -> Result<note::Model, ServiceError> {
        let caller = session.caller()?;
        input.validate()?;
        let existing = self.find_owned_note(note_id, caller.user_id).await?;

        let updated = note::ActiveModel {
            id: Unchanged(existing.id),
            content: Set(input.content),
            ..Default::default()
        }
        .update(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::NoteUpdated {
                note_id: updated.id,
                project_id: updated.project_id,
            })
            .await;

        Ok(updated)
    }

    async fn delete(&self, session: &Session, note_id: Uuid) -> Result<(), ServiceError> {
        let caller = session.caller()?;
        let existing = self.find_owned_note(note_id, caller.user_id).await?;
        let project_id = existing.project_id;

        existing.delete(&*self.db_pool).await?;

        self.event_sender
            .publish(Event::NoteDeleted {
                note_id,
                project_id,
            })
            .await;

        info!(note_id = %note_id, "Note deleted");
        Ok(())
    }

    async fn find_owned_note(&self, note_id: Uuid, owner_id: Uuid) -> Result<note::Model, ServiceError> {
        note::Entity::find_by_id(note_id)
            .filter(note::Column::UserId.eq(owner_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(NOTE_NOT_FOUND))
    }
}
