use chrono::{DateTime, SubsecRound, Utc};

use crate::spec::section::SectionSpec;
use crate::spec::survey::SurveySpec;
use crate::value::{FieldValue, Fields};

pub const STARTED_AT: &str = "started_at";
pub const COMPLETED_AT: &str = "completed_at";
pub const STATUS: &str = "status";
pub const SURVEY_ID: &str = "survey_id";
pub const SURVEY_VERSION: &str = "survey_version";

/// Top-level keys the record reserves for its own metadata.
pub const RESERVED_KEYS: [&str; 5] = [STARTED_AT, COMPLETED_AT, STATUS, SURVEY_ID, SURVEY_VERSION];

/// Current time at the precision the document store keeps (microseconds),
/// so a timestamp reads back exactly as it was written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    InProgress,
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::InProgress => "InProgress",
            RecordStatus::Completed => "Completed",
        }
    }
}

/// Collects the non-empty answers of one section into its record map.
pub fn section_map(section: &SectionSpec, values: &Fields) -> Fields {
    section
        .fields
        .iter()
        .filter_map(|field| {
            values
                .get(&field.id)
                .filter(|value| !value.is_empty())
                .map(|value| (field.id.clone(), value.clone()))
        })
        .collect()
}

/// Payload for the create call issued by the first section.
pub fn initial_record(
    spec: &SurveySpec,
    section: &SectionSpec,
    values: &Fields,
    started_at: DateTime<Utc>,
) -> Fields {
    let mut record = section_patch(section, values);
    record.insert(STARTED_AT.into(), FieldValue::Timestamp(started_at));
    record.insert(
        STATUS.into(),
        RecordStatus::InProgress.as_str().into(),
    );
    record.insert(SURVEY_ID.into(), spec.id.as_str().into());
    record.insert(SURVEY_VERSION.into(), spec.version.as_str().into());
    record
}

/// Partial record for a merge update: only this section's map.
pub fn section_patch(section: &SectionSpec, values: &Fields) -> Fields {
    let mut patch = Fields::new();
    patch.insert(
        section.id.clone(),
        FieldValue::Map(section_map(section, values)),
    );
    patch
}

/// Marks a payload as the final write of the respondent.
pub fn mark_completed(payload: &mut Fields, completed_at: DateTime<Utc>) {
    payload.insert(COMPLETED_AT.into(), FieldValue::Timestamp(completed_at));
    payload.insert(STATUS.into(), RecordStatus::Completed.as_str().into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::{FieldSpec, FieldType};

    fn section() -> SectionSpec {
        SectionSpec {
            id: "demographics".into(),
            title: "Demographics".into(),
            description: None,
            submit_label: None,
            fields: vec![
                FieldSpec {
                    id: "country".into(),
                    kind: FieldType::Text,
                    title: "Country".into(),
                    description: None,
                    required: true,
                    choices: None,
                    default_value: None,
                    constraint: None,
                },
                FieldSpec {
                    id: "notes".into(),
                    kind: FieldType::Text,
                    title: "Notes".into(),
                    description: None,
                    required: false,
                    choices: None,
                    default_value: None,
                    constraint: None,
                },
            ],
        }
    }

    #[test]
    fn patch_holds_only_the_section_and_skips_blank_answers() {
        let mut values = Fields::new();
        values.insert("country".into(), "Chile".into());
        values.insert("notes".into(), "  ".into());
        values.insert("other_section_field".into(), 3_i64.into());

        let patch = section_patch(&section(), &values);
        assert_eq!(patch.len(), 1);
        let FieldValue::Map(map) = &patch["demographics"] else {
            panic!("expected section map");
        };
        assert_eq!(map.len(), 1);
        assert_eq!(map["country"], FieldValue::from("Chile"));
    }

    #[test]
    fn record_times_keep_microsecond_precision() {
        let at = now();
        assert_eq!(at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(at.trunc_subsecs(6), at);
    }

    #[test]
    fn completion_overrides_status() {
        let mut payload = Fields::new();
        payload.insert(STATUS.into(), RecordStatus::InProgress.as_str().into());
        mark_completed(&mut payload, now());
        assert_eq!(payload[STATUS], FieldValue::from("Completed"));
        assert!(matches!(payload[COMPLETED_AT], FieldValue::Timestamp(_)));
    }
}
