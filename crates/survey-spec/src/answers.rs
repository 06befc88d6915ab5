use serde::{Deserialize, Serialize};

/// A problem with a value that is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Outcome of validating one section (or a whole answer document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    /// Required fields that are unset or empty, in declaration order.
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub unknown_fields: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.missing_required.extend(other.missing_required);
        self.unknown_fields.extend(other.unknown_fields);
        self.valid = self.errors.is_empty()
            && self.missing_required.is_empty()
            && self.unknown_fields.is_empty();
    }
}
