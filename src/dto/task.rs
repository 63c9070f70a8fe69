use serde::{Deserialize, Serialize};
use validator::Validate;

pub const TASK_TITLE_REQUIRED: &str = "El título de la tarea es obligatorio";
pub const COMMENT_CONTENT_REQUIRED: &str = "El comentario no puede estar vacío";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "El título de la tarea es obligatorio"))]
    pub title: String,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CommentInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "El comentario no puede estar vacío"))]
    pub content: String,
}

impl CommentInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
