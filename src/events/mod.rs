use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::TaskStatus;

pub const DASHBOARD_VIEW: &str = "/";
pub const FINISHED_VIEW: &str = "/finished";

pub fn project_view(project_id: Uuid) -> String {
    format!("/projects/{}", project_id)
}

/// Wrapper around the event channel that actions publish into.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends `event`, logging instead of failing when the channel is closed.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            error!(event = name, "{}", e);
            counter!("klyroframe.events.dropped", 1, "event" => name);
        }
    }
}

/// Domain events emitted after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ProjectCreated {
        project_id: Uuid,
        owner_id: Uuid,
    },
    ProjectUpdated {
        project_id: Uuid,
    },
    ProjectFinished {
        project_id: Uuid,
        delivered_at: DateTime<Utc>,
    },
    NoteCreated {
        note_id: Uuid,
        project_id: Uuid,
    },
    NoteUpdated {
        note_id: Uuid,
        project_id: Uuid,
    },
    NoteDeleted {
        note_id: Uuid,
        project_id: Uuid,
    },
    TaskCreated {
        task_id: Uuid,
        project_id: Uuid,
    },
    TaskStatusToggled {
        task_id: Uuid,
        project_id: Uuid,
        status: TaskStatus,
    },
    TaskDeleted {
        task_id: Uuid,
        project_id: Uuid,
    },
    TaskCommentAdded {
        comment_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProjectCreated { .. } => "project_created",
            Event::ProjectUpdated { .. } => "project_updated",
            Event::ProjectFinished { .. } => "project_finished",
            Event::NoteCreated { .. } => "note_created",
            Event::NoteUpdated { .. } => "note_updated",
            Event::NoteDeleted { .. } => "note_deleted",
            Event::TaskCreated { .. } => "task_created",
            Event::TaskStatusToggled { .. } => "task_status_toggled",
            Event::TaskDeleted { .. } => "task_deleted",
            Event::TaskCommentAdded { .. } => "task_comment_added",
        }
    }

    /// View paths whose rendered data is out of date after this event.
    pub fn stale_views(&self) -> Vec<String> {
        match self {
            Event::ProjectCreated { .. } => vec![DASHBOARD_VIEW.to_string()],
            Event::ProjectUpdated { project_id } => {
                vec![DASHBOARD_VIEW.to_string(), project_view(*project_id)]
            }
            Event::ProjectFinished { project_id, .. } => vec![
                DASHBOARD_VIEW.to_string(),
                FINISHED_VIEW.to_string(),
                project_view(*project_id),
            ],
            Event::NoteCreated { project_id, .. }
            | Event::NoteUpdated { project_id, .. }
            | Event::NoteDeleted { project_id, .. }
            | Event::TaskCreated { project_id, .. }
            | Event::TaskStatusToggled { project_id, .. }
            | Event::TaskDeleted { project_id, .. }
            | Event::TaskCommentAdded { project_id, .. } => vec![project_view(*project_id)],
        }
    }
}

/// Drains the channel, logging each event with the views it invalidates.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let name = event.name();
        info!(event = name, stale_views = ?event.stale_views(), "Views invalidated");
        counter!("klyroframe.events.processed", 1, "event" => name);
    }

    info!("Event channel closed; stopping event processing loop");
}
