//! Validated input contracts for every mutable entity.
//!
//! Wire payloads keep the dashboard form field names; the Rust side uses
//! English names. A failed contract becomes `ServiceError::ValidationError`
//! with the human-readable messages joined in field order.

pub mod note;
pub mod project;
pub mod task;

pub use note::NoteInput;
pub use project::{ProjectDraft, ProjectInput};
pub use task::{CommentInput, TaskInput};

use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// Field display order; each entry lists the Rust name and the wire name.
const FIELD_ORDER: &[(&str, &str)] = &[
    ("project_name", "nombreProyecto"),
    ("client_name", "nombreCliente"),
    ("client_whatsapp", "whatsappCliente"),
    ("project_type", "tipoProyecto"),
    ("custom_description", "descripcionMedida"),
    ("start_date", "fechaInicio"),
    ("deadline", "fechaTermino"),
    ("content", "content"),
    ("title", "title"),
];

fn field_rank(field: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|(rust, wire)| *rust == field || *wire == field)
        .unwrap_or(FIELD_ORDER.len())
}

/// Flattens validator errors into their messages, ordered by form field.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| field_rank(a).cmp(&field_rank(b)).then(a.cmp(b)));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: {}", field, err.code))
            })
        })
        .collect()
}

pub(crate) fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}
