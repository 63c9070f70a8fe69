pub mod note;
pub mod project;
pub mod task;
pub mod task_comment;
pub mod user;

pub use project::{ProjectStatus, ProjectType};
pub use task::TaskStatus;
