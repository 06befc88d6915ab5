use std::collections::BTreeSet;

use regex::Regex;

use crate::answers::{ValidationError, ValidationResult};
use crate::spec::field::{Constraint, FieldSpec, FieldType};
use crate::spec::section::SectionSpec;
use crate::spec::survey::SurveySpec;
use crate::value::{FieldValue, Fields};

/// Validates the answers of one section.
///
/// Values belonging to other sections are ignored, so the whole session
/// mapping can be passed in.
pub fn validate_section(section: &SectionSpec, values: &Fields) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in &section.fields {
        match values.get(&field.id).filter(|value| !value.is_empty()) {
            None => {
                if field.required {
                    missing_required.push(field.id.clone());
                }
            }
            Some(value) => {
                if let Some(error) = validate_value(field, value) {
                    errors.push(error);
                }
            }
        }
    }

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
        unknown_fields: Vec::new(),
    }
}

/// Validates a complete answer document against every section.
pub fn validate_survey(spec: &SurveySpec, answers: &Fields) -> ValidationResult {
    let mut result = ValidationResult {
        valid: true,
        ..ValidationResult::default()
    };
    for section in &spec.sections {
        result.merge(validate_section(section, answers));
    }

    let all_ids: BTreeSet<&str> = spec.fields().map(|field| field.id.as_str()).collect();
    let unknown_fields = answers
        .keys()
        .filter(|key| !all_ids.contains(key.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    result.merge(ValidationResult {
        unknown_fields,
        ..ValidationResult::default()
    });
    result
}

fn validate_value(field: &FieldSpec, value: &FieldValue) -> Option<ValidationError> {
    if !matches_type(field, value) {
        return Some(base_error(field, "type mismatch", "type_mismatch"));
    }

    if let FieldValue::Double(number) = value
        && !number.is_finite()
    {
        return Some(base_error(field, "number must be finite", "not_finite"));
    }

    if field.kind.uses_choices()
        && let Some(error) = enforce_choices(field, value)
    {
        return Some(error);
    }

    if let Some(constraint) = &field.constraint
        && let Some(error) = enforce_constraint(field, value, constraint)
    {
        return Some(error);
    }

    None
}

fn matches_type(field: &FieldSpec, value: &FieldValue) -> bool {
    match field.kind {
        FieldType::Select | FieldType::Text => matches!(value, FieldValue::String(_)),
        FieldType::Integer => matches!(value, FieldValue::Integer(_)),
        FieldType::Number => matches!(value, FieldValue::Integer(_) | FieldValue::Double(_)),
        FieldType::Boolean => matches!(value, FieldValue::Boolean(_)),
        FieldType::MultiChoice => match value {
            FieldValue::Array(items) => items
                .iter()
                .all(|item| matches!(item, FieldValue::String(_))),
            _ => false,
        },
    }
}

fn enforce_choices(field: &FieldSpec, value: &FieldValue) -> Option<ValidationError> {
    let choices = field.choices();
    let is_choice = |candidate: &FieldValue| {
        candidate
            .as_str()
            .is_some_and(|text| choices.iter().any(|choice| choice == text))
    };
    let accepted = match value {
        FieldValue::Array(items) => items.iter().all(|item| is_choice(item)),
        other => is_choice(other),
    };
    if accepted {
        None
    } else {
        Some(base_error(field, "invalid choice", "choice_mismatch"))
    }
}

fn enforce_constraint(
    field: &FieldSpec,
    value: &FieldValue,
    constraint: &Constraint,
) -> Option<ValidationError> {
    if let Some(pattern) = &constraint.pattern
        && let Some(text) = value.as_str()
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(base_error(
            field,
            "value does not match pattern",
            "pattern_mismatch",
        ));
    }

    if let Some(min_len) = constraint.min_len
        && let Some(text) = value.as_str()
        && text.trim().chars().count() < min_len
    {
        return Some(base_error(
            field,
            "text shorter than min length",
            "min_length",
        ));
    }

    if let Some(max_len) = constraint.max_len
        && let Some(text) = value.as_str()
        && text.trim().chars().count() > max_len
    {
        return Some(base_error(field, "text longer than max length", "max_length"));
    }

    if let Some(min) = constraint.min
        && let Some(number) = value.as_f64()
        && number < min
    {
        return Some(base_error(field, "value below minimum", "min"));
    }

    if let Some(max) = constraint.max
        && let Some(number) = value.as_f64()
        && number > max
    {
        return Some(base_error(field, "value above maximum", "max"));
    }

    if let FieldValue::Array(items) = value {
        if let Some(min_items) = constraint.min_items
            && items.len() < min_items
        {
            return Some(base_error(field, "too few selections", "min_items"));
        }
        if let Some(max_items) = constraint.max_items
            && items.len() > max_items
        {
            return Some(base_error(field, "too many selections", "max_items"));
        }
    }

    None
}

fn base_error(field: &FieldSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: Some(field.id.clone()),
        path: Some(format!("/{}", field.id)),
        message: message.into(),
        code: Some(code.into()),
    }
}
