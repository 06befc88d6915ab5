#![allow(missing_docs)]

pub mod answers;
pub mod check;
pub mod record;
pub mod render;
pub mod session;
pub mod spec;
pub mod template;
pub mod validate;
pub mod value;
pub mod wire;

pub use answers::{ValidationError, ValidationResult};
pub use check::{SpecError, check_spec};
pub use record::RecordStatus;
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderSection, RenderStatus,
    build_render_payload, render_json_ui, render_text,
};
pub use session::{Sequencer, Session};
pub use spec::{Constraint, FieldSpec, FieldType, Presentation, SectionSpec, SurveySpec};
pub use template::{TemplateEngine, TemplateError};
pub use validate::{validate_section, validate_survey};
pub use value::{FieldValue, Fields};
pub use wire::WireError;

/// JSON Schema describing the survey spec format.
pub fn survey_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(SurveySpec)).unwrap_or_default()
}
