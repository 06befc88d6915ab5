pub mod credentials;
pub mod store;

use thiserror::Error;
use tracing::{debug, info, warn};

use survey_spec::{
    FieldValue, Fields, RenderPayload, SectionSpec, Session, SpecError, SurveySpec,
    ValidationResult, build_render_payload, check_spec, record, validate_section,
};

pub use credentials::{Credentials, CredentialsError};
pub use store::{DocumentStore, FirestoreStore, MemoryStore, StoreError};

const BUNDLED_SPEC: &str = include_str!("../../survey-spec/tests/fixtures/diagnostic_survey.json");

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse survey spec: {0}")]
    SpecParse(#[source] serde_json::Error),
    #[error("invalid survey spec: {0}")]
    Spec(#[from] SpecError),
    #[error("field '{field}' is not part of section '{section}'")]
    UnknownField { field: String, section: String },
    #[error("the survey is already complete")]
    Closed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a section submit did not advance the session.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{}", describe_invalid(.0))]
    Invalid(ValidationResult),
    #[error("the survey is already complete")]
    Closed,
    #[error("could not save the section: {0}")]
    Store(#[from] StoreError),
}

fn describe_invalid(result: &ValidationResult) -> String {
    let mut parts = Vec::new();
    if !result.missing_required.is_empty() {
        parts.push(format!(
            "missing required fields: {}",
            result.missing_required.join(", ")
        ));
    }
    for error in &result.errors {
        parts.push(format!(
            "{}: {}",
            error.field_id.as_deref().unwrap_or("<unknown>"),
            error.message
        ));
    }
    if parts.is_empty() {
        "section is invalid".to_string()
    } else {
        parts.join("; ")
    }
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The session moved on to `section`.
    Advanced { section: usize, document_id: String },
    /// The last section was saved; the results view is next.
    Completed { document_id: String },
}

impl SubmitOutcome {
    pub fn document_id(&self) -> &str {
        match self {
            SubmitOutcome::Advanced { document_id, .. } => document_id,
            SubmitOutcome::Completed { document_id } => document_id,
        }
    }
}

/// Parses the survey shipped with this crate.
pub fn bundled_spec() -> Result<SurveySpec, EngineError> {
    parse_spec(BUNDLED_SPEC)
}

pub fn parse_spec(json: &str) -> Result<SurveySpec, EngineError> {
    let spec: SurveySpec = serde_json::from_str(json).map_err(EngineError::SpecParse)?;
    check_spec(&spec)?;
    Ok(spec)
}

/// Drives sessions through a survey and persists their answers.
///
/// The engine holds no per-respondent state; every call receives the
/// session it acts on.
pub struct SurveyEngine<S> {
    spec: SurveySpec,
    store: S,
}

impl<S: DocumentStore> SurveyEngine<S> {
    pub fn new(spec: SurveySpec, store: S) -> Result<Self, EngineError> {
        check_spec(&spec)?;
        Ok(Self { spec, store })
    }

    pub fn spec(&self) -> &SurveySpec {
        &self.spec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn start_session(&self) -> Session {
        Session::new(self.spec.total_sections())
    }

    pub fn render(&self, session: &Session) -> RenderPayload {
        build_render_payload(&self.spec, session)
    }

    pub fn active_section(&self, session: &Session) -> Result<&SectionSpec, EngineError> {
        if session.is_done() {
            return Err(EngineError::Closed);
        }
        self.spec
            .section(session.current())
            .ok_or(EngineError::Closed)
    }

    /// Records a value for a field of the active section.
    pub fn set_value(
        &self,
        session: &mut Session,
        field_id: &str,
        value: FieldValue,
    ) -> Result<(), EngineError> {
        let section = self.active_section(session)?;
        if section.field(field_id).is_none() {
            return Err(EngineError::UnknownField {
                field: field_id.to_string(),
                section: section.id.clone(),
            });
        }
        session.set_value(field_id, value);
        Ok(())
    }

    pub fn clear_value(&self, session: &mut Session, field_id: &str) -> Result<(), EngineError> {
        let section = self.active_section(session)?;
        if section.field(field_id).is_none() {
            return Err(EngineError::UnknownField {
                field: field_id.to_string(),
                section: section.id.clone(),
            });
        }
        session.clear_value(field_id);
        Ok(())
    }

    /// Validates and persists the active section, then advances.
    ///
    /// The first section creates the record; every later write (including a
    /// resubmitted first section) is a merge update against the bound id. On
    /// any error the session stays on the same section.
    pub fn submit(&self, session: &mut Session) -> Result<SubmitOutcome, SubmitError> {
        if session.is_done() {
            return Err(SubmitError::Closed);
        }
        let index = session.current();
        let section = self.spec.section(index).ok_or(SubmitError::Closed)?;

        let validation = validate_section(section, session.values());
        if !validation.valid {
            info!(
                section = %section.id,
                missing = ?validation.missing_required,
                errors = validation.errors.len(),
                "section submit blocked by validation"
            );
            return Err(SubmitError::Invalid(validation));
        }

        let is_last = session.sequencer().is_last();
        // Only the first section can be active without a bound record.
        let document_id = match session.document_id().map(str::to_string) {
            None => {
                let mut payload = record::initial_record(
                    &self.spec,
                    section,
                    session.values(),
                    session.start_time(),
                );
                if is_last {
                    record::mark_completed(&mut payload, record::now());
                }
                let id = self
                    .store
                    .create(&self.spec.collection, &payload)
                    .inspect_err(|err| warn!(section = %section.id, error = %err, "create failed"))?;
                info!(collection = %self.spec.collection, document_id = %id, "record created");
                id
            }
            Some(id) => {
                let mut patch = record::section_patch(section, session.values());
                if is_last {
                    record::mark_completed(&mut patch, record::now());
                }
                self.store
                    .update(&self.spec.collection, &id, &patch)
                    .inspect_err(|err| {
                        warn!(section = %section.id, document_id = %id, error = %err, "update failed")
                    })?;
                info!(section = %section.id, document_id = %id, "section saved");
                id
            }
        };

        let advanced = session.section_saved(&document_id);
        debug_assert!(advanced, "record identifier changed within a session");
        if session.is_done() {
            info!(document_id = %document_id, "survey completed");
            Ok(SubmitOutcome::Completed { document_id })
        } else {
            Ok(SubmitOutcome::Advanced {
                section: session.current(),
                document_id,
            })
        }
    }

    /// Goes back one section; values already entered are kept.
    pub fn retreat(&self, session: &mut Session) {
        session.retreat();
        debug!(section = session.current(), "retreated");
    }

    pub fn fetch_record(&self, document_id: &str) -> Result<Fields, EngineError> {
        Ok(self.store.fetch(&self.spec.collection, document_id)?)
    }
}
