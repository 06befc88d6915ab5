use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::record::RESERVED_KEYS;
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::survey::SurveySpec;
use crate::template::TemplateEngine;

static SIMPLE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static identifier pattern")
});

/// Structural problems that make a survey spec unusable.
#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("survey '{0}' declares no sections")]
    NoSections(String),
    #[error("section '{0}' declares no fields")]
    EmptySection(String),
    #[error("identifier '{0}' is used more than once")]
    DuplicateId(String),
    #[error("identifier '{0}' must match [a-z_][a-z0-9_]*")]
    InvalidId(String),
    #[error("identifier '{0}' is reserved for record metadata")]
    ReservedId(String),
    #[error("field '{0}' needs at least one choice")]
    MissingChoices(String),
    #[error("field '{field}' has an invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },
    #[error("field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },
    #[error("completion message: {0}")]
    InvalidTemplate(String),
}

/// Rejects specs the sequencer or the record layout cannot work with.
pub fn check_spec(spec: &SurveySpec) -> Result<(), SpecError> {
    if spec.sections.is_empty() {
        return Err(SpecError::NoSections(spec.id.clone()));
    }

    let mut seen = BTreeSet::new();
    for section in &spec.sections {
        check_id(&section.id, &mut seen)?;
        if section.fields.is_empty() {
            return Err(SpecError::EmptySection(section.id.clone()));
        }
    }
    for field in spec.fields() {
        check_id(&field.id, &mut seen)?;
        check_field(field)?;
    }

    if let Some(template) = spec
        .presentation
        .as_ref()
        .and_then(|presentation| presentation.completion_message.as_deref())
    {
        TemplateEngine::check(template)
            .map_err(|err| SpecError::InvalidTemplate(err.to_string()))?;
    }

    Ok(())
}

fn check_id(id: &str, seen: &mut BTreeSet<String>) -> Result<(), SpecError> {
    if !SIMPLE_ID.is_match(id) {
        return Err(SpecError::InvalidId(id.to_string()));
    }
    if RESERVED_KEYS.contains(&id) {
        return Err(SpecError::ReservedId(id.to_string()));
    }
    if !seen.insert(id.to_string()) {
        return Err(SpecError::DuplicateId(id.to_string()));
    }
    Ok(())
}

fn check_field(field: &FieldSpec) -> Result<(), SpecError> {
    if field.kind.uses_choices() && field.choices().is_empty() {
        return Err(SpecError::MissingChoices(field.id.clone()));
    }

    if let Some(pattern) = field
        .constraint
        .as_ref()
        .and_then(|constraint| constraint.pattern.as_deref())
    {
        Regex::new(pattern).map_err(|err| SpecError::InvalidPattern {
            field: field.id.clone(),
            reason: err.to_string(),
        })?;
    }

    if let Some(default) = &field.default_value {
        check_default(field, default).map_err(|reason| SpecError::InvalidDefault {
            field: field.id.clone(),
            reason,
        })?;
    }

    Ok(())
}

fn check_default(field: &FieldSpec, raw: &str) -> Result<(), String> {
    match field.kind {
        FieldType::Text => Ok(()),
        FieldType::Integer => raw
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| "expected a whole number".to_string()),
        FieldType::Number => raw
            .parse::<f64>()
            .map_err(|_| "expected a number".to_string())
            .and_then(|value| {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err("number must be finite".to_string())
                }
            }),
        FieldType::Boolean => match raw.to_lowercase().as_str() {
            "true" | "false" | "yes" | "no" => Ok(()),
            _ => Err("expected true/false".to_string()),
        },
        FieldType::Select => {
            if field.choices().iter().any(|choice| choice == raw) {
                Ok(())
            } else {
                Err(format!("must be one of {}", field.choices().join(", ")))
            }
        }
        FieldType::MultiChoice => {
            let unknown = raw
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .find(|item| !field.choices().iter().any(|choice| choice == item));
            match unknown {
                Some(item) => Err(format!("'{}' is not a choice", item)),
                None => Ok(()),
            }
        }
    }
}
