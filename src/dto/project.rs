use chrono::{DateTime, Utc};
use jiff::tz::TimeZone;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::error_with_message;
use crate::entities::ProjectType;
use crate::timeline;

pub const PROJECT_NAME_REQUIRED: &str = "El nombre del proyecto es obligatorio";
pub const CLIENT_NAME_REQUIRED: &str = "El nombre del cliente es obligatorio";
pub const WHATSAPP_REQUIRED: &str = "El WhatsApp es obligatorio";
pub const WHATSAPP_MALFORMED: &str = "El WhatsApp no tiene un formato válido";
pub const PROJECT_TYPE_INVALID: &str = "Tipo de proyecto inválido";
pub const DESCRIPTION_REQUIRED: &str = "La descripción es obligatoria para proyectos a medida";
pub const START_DATE_INVALID: &str = "Fecha de inicio inválida";
pub const DEADLINE_INVALID: &str = "Fecha de término inválida";
pub const DATE_RANGE_INVERTED: &str = "La fecha de término debe ser posterior a la fecha de inicio";

const MIN_PHONE_DIGITS: usize = 6;

static PHONE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9\s\-()]+$").unwrap());

/// Project form payload as submitted by the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProjectInput {
    #[serde(rename = "nombreProyecto", default)]
    #[validate(length(min = 1, message = "El nombre del proyecto es obligatorio"))]
    pub project_name: String,

    #[serde(rename = "nombreCliente", default)]
    #[validate(length(min = 1, message = "El nombre del cliente es obligatorio"))]
    pub client_name: String,

    #[serde(rename = "whatsappCliente", default)]
    #[validate(
        length(min = 1, message = "El WhatsApp es obligatorio"),
        custom = "validate_whatsapp"
    )]
    pub client_whatsapp: String,

    /// Empty string means "no type".
    #[serde(rename = "tipoProyecto", default)]
    #[validate(custom = "validate_project_type")]
    pub project_type: Option<String>,

    #[serde(rename = "descripcionMedida", default)]
    pub custom_description: Option<String>,

    /// Local civil time (`YYYY-MM-DDTHH:mm`) or RFC 3339.
    #[serde(rename = "fechaInicio", default)]
    pub start_date: String,

    #[serde(rename = "fechaTermino", default)]
    pub deadline: String,
}

/// A project payload that passed validation, with dates resolved to instants.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub client_name: String,
    pub client_whatsapp: String,
    pub project_type: Option<ProjectType>,
    pub custom_description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

fn validate_whatsapp(value: &str) -> Result<(), ValidationError> {
    // Emptiness is reported by the length rule.
    if value.is_empty() {
        return Ok(());
    }

    let digits = value.chars().filter(char::is_ascii_digit).count();
    if PHONE_SHAPE.is_match(value) && digits >= MIN_PHONE_DIGITS {
        Ok(())
    } else {
        Err(error_with_message("phone", WHATSAPP_MALFORMED))
    }
}

fn validate_project_type(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || ProjectType::from_tag(value.trim()).is_some() {
        Ok(())
    } else {
        Err(error_with_message("project_type", PROJECT_TYPE_INVALID))
    }
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ProjectInput {
    pub fn project_type(&self) -> Option<ProjectType> {
        self.project_type
            .as_deref()
            .map(str::trim)
            .and_then(ProjectType::from_tag)
    }

    /// Runs every field and cross-field rule, interpreting local dates in `zone`.
    ///
    /// All failures are collected, so the caller sees every message at once.
    pub fn into_draft(self, zone: &TimeZone) -> Result<ProjectDraft, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let project_type = self.project_type();
        let custom_description = blank_to_none(self.custom_description.as_deref());
        if project_type.map_or(false, ProjectType::requires_description)
            && custom_description.is_none()
        {
            errors.add(
                "custom_description",
                error_with_message("required", DESCRIPTION_REQUIRED),
            );
        }

        let start_date = timeline::parse_instant(&self.start_date, zone).ok();
        if start_date.is_none() {
            errors.add("start_date", error_with_message("date", START_DATE_INVALID));
        }
        let deadline = timeline::parse_instant(&self.deadline, zone).ok();
        if deadline.is_none() {
            errors.add("deadline", error_with_message("date", DEADLINE_INVALID));
        }

        if let (Some(start), Some(end)) = (start_date, deadline) {
            if start >= end {
                errors.add("deadline", error_with_message("range", DATE_RANGE_INVERTED));
            }
        }

        match (start_date, deadline) {
            (Some(start_date), Some(deadline)) if errors.errors().is_empty() => Ok(ProjectDraft {
                name: self.project_name,
                client_name: self.client_name,
                client_whatsapp: self.client_whatsapp,
                project_type,
                custom_description,
                start_date,
                deadline,
            }),
            _ => Err(errors),
        }
    }
}
