use serde::{Deserialize, Serialize};
use validator::Validate;

pub const NOTE_CONTENT_REQUIRED: &str = "La nota no puede estar vacía";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NoteInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "La nota no puede estar vacía"))]
    pub content: String,
}

impl NoteInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
