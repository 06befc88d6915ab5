use serde_json::{Map, Value, json};

use crate::{
    session::Session,
    spec::{field::FieldType, survey::SurveySpec},
    template::{DEFAULT_COMPLETION_MESSAGE, TemplateEngine},
    value::FieldValue,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A section page is waiting for input.
    NeedInput,
    /// Every section was submitted; only the results view remains.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Position of the active section.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub current: usize,
    pub total: usize,
}

/// Describes a single input control.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub default: Option<String>,
    pub current_value: Option<FieldValue>,
    pub choices: Option<Vec<String>>,
}

/// The active section page.
#[derive(Debug, Clone)]
pub struct RenderSection {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub submit_label: String,
    pub fields: Vec<RenderField>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub survey_id: String,
    pub survey_title: String,
    pub survey_version: String,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub section: Option<RenderSection>,
    pub document_id: Option<String>,
    /// Results view text; only set once complete.
    pub acknowledgment: Option<String>,
}

/// Build the renderer payload for the session's current position.
pub fn build_render_payload(spec: &SurveySpec, session: &Session) -> RenderPayload {
    let sequencer = session.sequencer();
    let section = spec.section(sequencer.current()).map(|section| RenderSection {
        id: section.id.clone(),
        title: section.title.clone(),
        description: section.description.clone(),
        submit_label: section
            .submit_label
            .clone()
            .unwrap_or_else(|| format!("Submit section {}", sequencer.current())),
        fields: section
            .fields
            .iter()
            .map(|field| RenderField {
                id: field.id.clone(),
                title: field.title.clone(),
                description: field.description.clone(),
                kind: field.kind,
                required: field.required,
                default: field.default_value.clone(),
                current_value: session.value(&field.id).cloned(),
                choices: field.choices.clone(),
            })
            .collect(),
    });

    let help = spec
        .presentation
        .as_ref()
        .and_then(|presentation| presentation.intro.clone())
        .or_else(|| spec.description.clone());

    let (status, section, acknowledgment) = if session.is_done() {
        (
            RenderStatus::Complete,
            None,
            Some(acknowledgment(spec, session.document_id())),
        )
    } else {
        (RenderStatus::NeedInput, section, None)
    };

    RenderPayload {
        survey_id: spec.id.clone(),
        survey_title: spec.title.clone(),
        survey_version: spec.version.clone(),
        status,
        progress: RenderProgress {
            current: sequencer.current().min(sequencer.total()),
            total: sequencer.total(),
        },
        help,
        section,
        document_id: session.document_id().map(str::to_string),
        acknowledgment,
    }
}

fn acknowledgment(spec: &SurveySpec, document_id: Option<&str>) -> String {
    let ctx = json!({
        "survey_title": spec.title,
        "document_id": document_id.unwrap_or_default(),
    });
    let engine = TemplateEngine::new();
    spec.presentation
        .as_ref()
        .and_then(|presentation| presentation.completion_message.as_deref())
        .and_then(|template| engine.render(template, &ctx).ok())
        .or_else(|| engine.render(DEFAULT_COMPLETION_MESSAGE, &ctx).ok())
        .unwrap_or_else(|| format!("Saved under identifier {}", document_id.unwrap_or_default()))
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let section = payload.section.as_ref().map(|section| {
        let fields = section
            .fields
            .iter()
            .map(|field| {
                let mut map = Map::new();
                map.insert("id".into(), Value::String(field.id.clone()));
                map.insert("title".into(), Value::String(field.title.clone()));
                map.insert(
                    "description".into(),
                    field
                        .description
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                );
                map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
                map.insert("required".into(), Value::Bool(field.required));
                if let Some(default) = &field.default {
                    map.insert("default".into(), Value::String(default.clone()));
                }
                if let Some(current_value) = &field.current_value {
                    map.insert("current_value".into(), current_value.to_json());
                }
                if let Some(choices) = &field.choices {
                    map.insert(
                        "choices".into(),
                        Value::Array(choices.iter().cloned().map(Value::String).collect()),
                    );
                }
                Value::Object(map)
            })
            .collect::<Vec<_>>();
        json!({
            "id": section.id,
            "title": section.title,
            "description": section.description,
            "submit_label": section.submit_label,
            "fields": fields,
        })
    });

    json!({
        "survey_id": payload.survey_id,
        "survey_title": payload.survey_title,
        "survey_version": payload.survey_version,
        "status": payload.status.as_str(),
        "progress": {
            "current": payload.progress.current,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "section": section,
        "document_id": payload.document_id,
        "acknowledgment": payload.acknowledgment,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{} ({})", payload.survey_title, payload.survey_id));

    let Some(section) = &payload.section else {
        lines.push(format!("Status: {}", payload.status.as_str()));
        if let Some(acknowledgment) = &payload.acknowledgment {
            lines.push(acknowledgment.clone());
        }
        if let Some(document_id) = &payload.document_id {
            lines.push(format!("Identifier: {}", document_id));
        }
        return lines.join("\n");
    };

    lines.push(format!(
        "Section {}/{}: {}",
        payload.progress.current, payload.progress.total, section.title
    ));
    if let Some(description) = &section.description {
        lines.push(description.clone());
    }
    for field in &section.fields {
        let mut entry = format!(" - {} ({})", field.id, field.title);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(current_value) = &field.current_value {
            entry.push_str(&format!(" = {}", current_value));
        }
        lines.push(entry);
    }
    lines.push(format!("[{}]", section.submit_label));

    lines.join("\n")
}
