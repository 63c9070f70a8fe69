use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ColumnTrait, Condition, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::find_owned_project;
use crate::{
    auth::Session,
    db::DbPool,
    entities::{note, project, task, task_comment, ProjectStatus, ProjectType, TaskStatus},
    errors::ServiceError,
    timeline::{self, Timeline},
};

const WHATSAPP_LINK_BASE: &str = "https://wa.me/";

/// `?q=` filter for the active project list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveProjectsQuery {
    #[serde(default)]
    pub q: Option<String>,
}

impl ActiveProjectsQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            q: Some(term.into()),
        }
    }

    fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// `%term%` with LIKE wildcards in `term` matched literally, lowercased.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match on `column`.
///
/// SQLite's `lower()` only folds ASCII, so non-ASCII uppercase letters stored
/// in a name only match an identically cased term there.
fn column_contains(column: project::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// A project plus every display-only value derived from the current time.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    pub id: Uuid,
    pub name: String,
    pub client_name: String,
    pub client_whatsapp: String,
    pub whatsapp_link: String,
    pub project_type: Option<ProjectType>,
    pub project_type_label: Option<&'static str>,
    pub custom_description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub progress_percent: f64,
    pub remaining: String,
    pub elapsed: String,
    /// Only ever true while the project is ACTIVE.
    pub overdue: bool,
    pub days_remaining: i64,
    pub start_label: String,
    pub deadline_label: String,
    pub delivered_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// The project deadline passed and the task is still open.
    pub late: bool,
    pub comments: Vec<task_comment::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: ProjectCard,
    pub notes: Vec<note::Model>,
    pub tasks: Vec<TaskView>,
    /// Share of COMPLETED tasks, 0 when there are none.
    pub task_progress: f64,
}

/// `https://wa.me/{number}` with `+` signs and whitespace removed.
pub fn whatsapp_link(handle: &str) -> String {
    let number: String = handle
        .chars()
        .filter(|c| *c != '+' && !c.is_whitespace())
        .collect();
    format!("{}{}", WHATSAPP_LINK_BASE, number)
}

pub fn task_progress(tasks: &[task::Model]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// Owner-scoped listings and the project detail page.
#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    timeline: Timeline,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, timeline: Timeline) -> Self {
        Self { db_pool, timeline }
    }

    /// ACTIVE projects, newest first, optionally filtered by project or client name.
    #[instrument(skip(self, session))]
    pub async fn active_projects(
        &self,
        session: &Session,
        query: &ActiveProjectsQuery,
    ) -> Result<Vec<ProjectCard>, ServiceError> {
        let caller = session.caller()?;

        let mut select = project::Entity::find()
            .filter(project::Column::UserId.eq(caller.user_id))
            .filter(project::Column::Status.eq(ProjectStatus::Active));

        if let Some(term) = query.term() {
            let pattern = contains_pattern(term);
            select = select.filter(
                Condition::any()
                    .add(column_contains(project::Column::Name, &pattern))
                    .add(column_contains(project::Column::ClientName, &pattern)),
            );
        }

        let projects = select
            .order_by_desc(project::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        projects.into_iter().map(|p| self.card(p)).collect()
    }

    /// FINISHED projects, most recently delivered first.
    #[instrument(skip(self, session))]
    pub async fn finished_projects(&self, session: &Session) -> Result<Vec<ProjectCard>, ServiceError> {
        let caller = session.caller()?;

        let projects = project::Entity::find()
            .filter(project::Column::UserId.eq(caller.user_id))
            .filter(project::Column::Status.eq(ProjectStatus::Finished))
            .order_by_desc(project::Column::DeliveredAt)
            .all(&*self.db_pool)
            .await?;

        projects.into_iter().map(|p| self.card(p)).collect()
    }

    #[instrument(skip(self, session), fields(project_id = %project_id))]
    pub async fn project_detail(
        &self,
        session: &Session,
        project_id: Uuid,
    ) -> Result<ProjectDetail, ServiceError> {
        let caller = session.caller()?;
        let project = find_owned_project(&self.db_pool, project_id, caller.user_id).await?;

        let notes = project
            .find_related(note::Entity)
            .filter(note::Column::UserId.eq(caller.user_id))
            .order_by_desc(note::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        let tasks = project
            .find_related(task::Entity)
            .order_by_desc(task::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let comments = if task_ids.is_empty() {
            Vec::new()
        } else {
            task_comment::Entity::find()
                .filter(task_comment::Column::TaskId.is_in(task_ids))
                .order_by_asc(task_comment::Column::CreatedAt)
                .all(&*self.db_pool)
                .await?
        };

        let deadline_passed = timeline::is_overdue_at(project.deadline, self.timeline.now());
        let progress = task_progress(&tasks);
        let tasks = tasks
            .into_iter()
            .map(|t| TaskView {
                late: deadline_passed && t.status != TaskStatus::Completed,
                comments: comments
                    .iter()
                    .filter(|c| c.task_id == t.id)
                    .cloned()
                    .collect(),
                id: t.id,
                title: t.title,
                status: t.status,
                created_at: t.created_at,
            })
            .collect();

        Ok(ProjectDetail {
            project: self.card(project)?,
            notes,
            tasks,
            task_progress: progress,
        })
    }

    fn card(&self, project: project::Model) -> Result<ProjectCard, ServiceError> {
        let now = self.timeline.now();
        let zone = self.timeline.zone();

        let delivered_label = project
            .delivered_at
            .map(|at| timeline::format_absolute(at, zone))
            .transpose()?;

        Ok(ProjectCard {
            whatsapp_link: whatsapp_link(&project.client_whatsapp),
            project_type_label: project.project_type.map(ProjectType::label),
            progress_percent: timeline::progress_percent_at(project.start_date, project.deadline, now),
            remaining: timeline::remaining_duration_at(project.deadline, now),
            elapsed: timeline::elapsed_duration_at(project.start_date, now),
            overdue: project.is_active() && timeline::is_overdue_at(project.deadline, now),
            days_remaining: timeline::days_remaining_at(project.deadline, now),
            start_label: timeline::format_absolute(project.start_date, zone)?,
            deadline_label: timeline::format_absolute(project.deadline, zone)?,
            delivered_label,
            id: project.id,
            name: project.name,
            client_name: project.client_name,
            client_whatsapp: project.client_whatsapp,
            project_type: project.project_type,
            custom_description: project.custom_description,
            status: project.status,
            start_date: project.start_date,
            deadline: project.deadline,
            delivered_at: project.delivered_at,
            created_at: project.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_like_wildcards() {
        assert_eq!(contains_pattern("Café"), "%café%");
        assert_eq!(contains_pattern("50%_OFF"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn whatsapp_link_strips_plus_and_spaces() {
        assert_eq!(whatsapp_link("+56 9 1234 5678"), "https://wa.me/56912345678");
        assert_eq!(whatsapp_link("56-9-1234"), "https://wa.me/56-9-1234");
    }

    #[test]
    fn task_progress_counts_completed_share() {
        let now = Utc::now();
        let make = |status| task::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            title: "x".into(),
            status,
            created_at: now,
        };
        assert_eq!(task_progress(&[]), 0.0);
        let tasks = vec![
            make(TaskStatus::Completed),
            make(TaskStatus::InProgress),
            make(TaskStatus::InProgress),
            make(TaskStatus::Completed),
        ];
        assert_eq!(task_progress(&tasks), 50.0);
    }
}
