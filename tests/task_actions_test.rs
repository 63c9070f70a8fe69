mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{project_input, TestApp};
use klyroframe::{
    auth::Session,
    dto::{
        task::{COMMENT_CONTENT_REQUIRED, TASK_TITLE_REQUIRED},
        CommentInput, TaskInput,
    },
    entities::{project, task, task_comment, TaskStatus},
    errors::ServiceError,
    events::Event,
    services::{PROJECT_NOT_FOUND, TASK_NOT_FOUND},
};

struct Fixture {
    app: TestApp,
    session: Session,
    project: project::Model,
}

async fn fixture() -> Fixture {
    let app = TestApp::new().await;
    let owner = app.create_user("ana@klyroframe.local").await;
    let session = app.session_for(&owner);
    let project = app
        .state
        .services
        .projects
        .create_project(&session, project_input("Landing", "Café Sur"))
        .await
        .unwrap();
    app.drain_events().await;
    Fixture {
        app,
        session,
        project,
    }
}

#[tokio::test]
async fn new_tasks_start_in_progress() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;

    let created = app
        .state
        .services
        .tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();

    assert_eq!(created.project_id, project.id);
    assert_eq!(created.status, TaskStatus::InProgress);
    assert_eq!(
        app.drain_events().await,
        vec![Event::TaskCreated {
            task_id: created.id,
            project_id: project.id,
        }]
    );

    let err = app
        .state
        .services
        .tasks
        .create_task(&session, project.id, TaskInput::new(""))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg == TASK_TITLE_REQUIRED);
}

#[tokio::test]
async fn toggle_flips_status_and_nothing_else() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let tasks = &app.state.services.tasks;

    let created = tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();
    app.clock.advance(Duration::hours(1));

    let toggled = tasks
        .toggle_task_status(&session, project.id, created.id)
        .await
        .unwrap();
    assert_eq!(toggled.status, TaskStatus::Completed);
    assert_eq!(toggled.title, created.title);
    assert_eq!(toggled.created_at, created.created_at);
    assert_eq!(toggled.project_id, created.project_id);

    let back = tasks
        .toggle_task_status(&session, project.id, created.id)
        .await
        .unwrap();
    assert_eq!(back, created);

    let events = app.drain_events().await;
    assert_eq!(
        events[1],
        Event::TaskStatusToggled {
            task_id: created.id,
            project_id: project.id,
            status: TaskStatus::Completed,
        }
    );
    assert_eq!(
        events[1].stale_views(),
        vec![format!("/projects/{}", project.id)]
    );
}

#[tokio::test]
async fn task_must_belong_to_the_named_project() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let services = &app.state.services;

    let other_project = services
        .projects
        .create_project(&session, project_input("Otro", "Cliente"))
        .await
        .unwrap();
    let created = services
        .tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();

    let err = services
        .tasks
        .toggle_task_status(&session, other_project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == TASK_NOT_FOUND);

    let err = services
        .tasks
        .delete_task_permanent(&session, other_project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == TASK_NOT_FOUND);

    let err = services
        .tasks
        .add_task_comment(
            &session,
            other_project.id,
            created.id,
            CommentInput::new("Listo"),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let stored = task::Entity::find_by_id(created.id)
        .one(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(stored, Some(created));
}

#[tokio::test]
async fn foreign_projects_hide_their_tasks() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let intruder = app.create_user("beto@klyroframe.local").await;
    let intruder_session = app.session_for(&intruder);
    let tasks = &app.state.services.tasks;

    let created = tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();

    let err = tasks
        .create_task(&intruder_session, project.id, TaskInput::new("Intruso"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == PROJECT_NOT_FOUND);

    let err = tasks
        .toggle_task_status(&intruder_session, project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == PROJECT_NOT_FOUND);

    let err = tasks
        .delete_task_permanent(&Session::anonymous(), project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));
}

#[tokio::test]
async fn anonymous_callers_cannot_touch_tasks() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let anonymous = Session::anonymous();
    let tasks = &app.state.services.tasks;

    let created = tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();
    app.drain_events().await;

    let err = tasks
        .create_task(&anonymous, project.id, TaskInput::new("Anónima"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let err = tasks
        .toggle_task_status(&anonymous, project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let err = tasks
        .add_task_comment(&anonymous, project.id, created.id, CommentInput::new("Hola"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    let db = &*app.state.db;
    assert_eq!(task::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(task_comment::Entity::find().count(db).await.unwrap(), 0);
    let stored = task::Entity::find_by_id(created.id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TaskStatus::InProgress);
    assert!(app.drain_events().await.is_empty());
}

#[tokio::test]
async fn deleting_a_task_removes_its_comments() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let tasks = &app.state.services.tasks;

    let created = tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();
    let kept = tasks
        .create_task(&session, project.id, TaskInput::new("Revisar textos"))
        .await
        .unwrap();
    for content in ["Faltan dos fotos", "Cliente envió el resto"] {
        tasks
            .add_task_comment(&session, project.id, created.id, CommentInput::new(content))
            .await
            .unwrap();
    }
    tasks
        .add_task_comment(&session, project.id, kept.id, CommentInput::new("Ok"))
        .await
        .unwrap();

    tasks
        .delete_task_permanent(&session, project.id, created.id)
        .await
        .unwrap();

    let db = &*app.state.db;
    assert_eq!(task::Entity::find_by_id(created.id).one(db).await.unwrap(), None);
    assert_eq!(task_comment::Entity::find().count(db).await.unwrap(), 1);

    let err = tasks
        .delete_task_permanent(&session, project.id, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(msg) if msg == TASK_NOT_FOUND);

    let last = app.drain_events().await.pop();
    assert_eq!(
        last,
        Some(Event::TaskDeleted {
            task_id: created.id,
            project_id: project.id,
        })
    );
}

#[tokio::test]
async fn empty_comments_are_rejected() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let tasks = &app.state.services.tasks;

    let created = tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();
    let err = tasks
        .add_task_comment(&session, project.id, created.id, CommentInput::new(""))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg == COMMENT_CONTENT_REQUIRED);

    let missing = tasks
        .add_task_comment(
            &session,
            project.id,
            Uuid::new_v4(),
            CommentInput::new("Hola"),
        )
        .await
        .unwrap_err();
    assert_matches!(missing, ServiceError::NotFound(msg) if msg == TASK_NOT_FOUND);

    assert_eq!(
        task_comment::Entity::find().count(&*app.state.db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn detail_groups_comments_and_flags_late_tasks() {
    let Fixture {
        app,
        session,
        project,
    } = fixture().await;
    let services = &app.state.services;

    let photos = services
        .tasks
        .create_task(&session, project.id, TaskInput::new("Subir fotos"))
        .await
        .unwrap();
    app.clock.advance(Duration::minutes(5));
    let copy = services
        .tasks
        .create_task(&session, project.id, TaskInput::new("Revisar textos"))
        .await
        .unwrap();

    for content in ["Primero", "Segundo"] {
        app.clock.advance(Duration::minutes(1));
        services
            .tasks
            .add_task_comment(&session, project.id, photos.id, CommentInput::new(content))
            .await
            .unwrap();
    }
    services
        .tasks
        .toggle_task_status(&session, project.id, copy.id)
        .await
        .unwrap();

    let detail = services
        .dashboard
        .project_detail(&session, project.id)
        .await
        .unwrap();
    assert_eq!(detail.task_progress, 50.0);
    let titles: Vec<_> = detail.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Revisar textos", "Subir fotos"]);
    let comments: Vec<_> = detail.tasks[1]
        .comments
        .iter()
        .map(|c| c.content.as_str())
        .collect();
    assert_eq!(comments, vec!["Primero", "Segundo"]);
    assert!(detail.tasks[0].comments.is_empty());
    assert!(detail.tasks.iter().all(|t| !t.late));

    // Past the deadline only the open task is late.
    app.clock.advance(Duration::days(10));
    let detail = services
        .dashboard
        .project_detail(&session, project.id)
        .await
        .unwrap();
    assert!(detail.project.overdue);
    assert!(!detail.tasks[0].late);
    assert!(detail.tasks[1].late);
}
