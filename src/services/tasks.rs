use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, Unchanged};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{find_owned_project, TASK_NOT_FOUND};
use crate::{
    auth::Session,
    db::DbPool,
    dto::{CommentInput, TaskInput},
    entities::{task, task_comment, TaskStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    timeline::Timeline,
    tracing::observe_action,
};

/// Project checklist actions.
///
/// Every task operation is authorized through the parent project's owner, and
/// the task must belong to the project named in the request.
#[derive(Clone)]
pub struct TaskService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeline: Timeline,
}

impl TaskService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeline: Timeline) -> Self {
        Self {
            db_pool,
            event_sender,
            timeline,
        }
    }

    #[instrument(skip(self, session, input), fields(project_id = %project_id))]
    pub async fn create_task(
        &self,
        session: &Session,
        project_id: Uuid,
        input: TaskInput,
    ) -> Result<task::Model, ServiceError> {
        observe_action("create_task", self.create(session, project_id, input)).await
    }

    /// Flips the stored status between IN_PROGRESS and COMPLETED.
    #[instrument(skip(self, session), fields(project_id = %project_id, task_id = %task_id))]
    pub async fn toggle_task_status(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<task::Model, ServiceError> {
        observe_action("toggle_task_status", self.toggle(session, project_id, task_id)).await
    }

    /// Removes the task and, through the foreign key, its comments.
    #[instrument(skip(self, session), fields(project_id = %project_id, task_id = %task_id))]
    pub async fn delete_task_permanent(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<(), ServiceError> {
        observe_action("delete_task_permanent", self.delete(session, project_id, task_id)).await
    }

    #[instrument(skip(self, session, input), fields(project_id = %project_id, task_id = %task_id))]
    pub async fn add_task_comment(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
        input: CommentInput,
    ) -> Result<task_comment::Model, ServiceError> {
        observe_action(
            "add_task_comment",
            self.comment(session, project_id, task_id, input),
        )
        .await
    }

    async fn create(
        &self,
        session: &Session,
        project_id: Uuid,
        input: TaskInput,
    ) -> Result<task::Model, ServiceError> {
        let caller = session.caller()?;
        input.validate()?;
        let project = find_owned_project(&self.db_pool, project_id, caller.user_id).await?;

        let saved = task::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project.id),
            title: Set(input.title),
            status: Set(TaskStatus::InProgress),
            created_at: Set(self.timeline.now()),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::TaskCreated {
                task_id: saved.id,
                project_id: saved.project_id,
            })
            .await;

        info!(task_id = %saved.id, "Task created");
        Ok(saved)
    }

    async fn toggle(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<task::Model, ServiceError> {
        let caller = session.caller()?;
        let existing = self.find_task(caller.user_id, project_id, task_id).await?;

        let updated = task::ActiveModel {
            id: Unchanged(existing.id),
            status: Set(existing.status.toggled()),
            ..Default::default()
        }
        .update(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::TaskStatusToggled {
                task_id: updated.id,
                project_id,
                status: updated.status,
            })
            .await;

        info!(task_id = %updated.id, status = ?updated.status, "Task status toggled");
        Ok(updated)
    }

    async fn delete(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<(), ServiceError> {
        let caller = session.caller()?;
        find_owned_project(&self.db_pool, project_id, caller.user_id).await?;

        let result = task::Entity::delete_many()
            .filter(task::Column::Id.eq(task_id))
            .filter(task::Column::ProjectId.eq(project_id))
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(TASK_NOT_FOUND));
        }

        self.event_sender
            .publish(Event::TaskDeleted {
                task_id,
                project_id,
            })
            .await;

        info!(task_id = %task_id, "Task deleted");
        Ok(())
    }

    async fn comment(
        &self,
        session: &Session,
        project_id: Uuid,
        task_id: Uuid,
        input: CommentInput,
    ) -> Result<task_comment::Model, ServiceError> {
        let caller = session.caller()?;
        input.validate()?;
        let task = self.find_task(caller.user_id, project_id, task_id).await?;

        let saved = task_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_id: Set(task.id),
            content: Set(input.content),
            created_at: Set(self.timeline.now()),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .publish(Event::TaskCommentAdded {
                comment_id: saved.id,
                task_id: task.id,
                project_id,
            })
            .await;

        Ok(saved)
    }

    async fn find_task(
        &self,
        owner_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<task::Model, ServiceError> {
        find_owned_project(&self.db_pool, project_id, owner_id).await?;

        task::Entity::find_by_id(task_id)
            .filter(task::Column::ProjectId.eq(project_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found(TASK_NOT_FOUND))
    }
}
