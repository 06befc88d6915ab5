use survey_engine::{
    MemoryStore, SubmitError, SubmitOutcome, SurveyEngine, bundled_spec, parse_spec,
};
use survey_spec::{FieldValue, RenderStatus, Session};

fn engine() -> SurveyEngine<MemoryStore> {
    SurveyEngine::new(bundled_spec().expect("spec"), MemoryStore::new()).expect("engine")
}

fn demographics(engine: &SurveyEngine<MemoryStore>, session: &mut Session, community: &str) {
    engine
        .set_value(session, "country", "Chile".into())
        .expect("country");
    engine
        .set_value(session, "age", FieldValue::Integer(30))
        .expect("age");
    engine
        .set_value(session, "community", community.into())
        .expect("community");
}

#[test]
fn interleaved_sessions_keep_separate_records() {
    let engine = engine();
    let mut first = engine.start_session();
    let mut second = engine.start_session();

    demographics(&engine, &mut first, "Santiago");
    demographics(&engine, &mut second, "Lima");
    let first_id = engine
        .submit(&mut first)
        .expect("first")
        .document_id()
        .to_string();
    let second_id = engine
        .submit(&mut second)
        .expect("second")
        .document_id()
        .to_string();

    assert_ne!(first_id, second_id);
    assert_eq!(engine.store().document_count("diagnosticos"), 2);

    let stored = engine.fetch_record(&second_id).expect("fetch");
    let FieldValue::Map(section) = &stored["demographics"] else {
        panic!("demographics map");
    };
    assert_eq!(section["community"], FieldValue::from("Lima"));
    assert_eq!(stored["status"], FieldValue::from("InProgress"));
    assert!(matches!(stored["started_at"], FieldValue::Timestamp(_)));
}

#[test]
fn scenario_from_first_page_to_results() {
    let engine = engine();
    let mut session = engine.start_session();

    engine
        .set_value(&mut session, "country", "Chile".into())
        .expect("country");
    engine
        .set_value(&mut session, "age", FieldValue::Integer(30))
        .expect("age");
    match engine.submit(&mut session) {
        Err(SubmitError::Invalid(result)) => {
            assert_eq!(result.missing_required, vec!["community"])
        }
        other => panic!("expected missing community, got {other:?}"),
    }
    assert_eq!(session.current(), 1);

    engine
        .set_value(&mut session, "community", "X".into())
        .expect("community");
    let outcome = engine.submit(&mut session).expect("section 1");
    assert_eq!(session.current(), 2);
    let id = outcome.document_id().to_string();

    engine
        .set_value(
            &mut session,
            "main_problems",
            FieldValue::Array(vec!["Conectividad".into()]),
        )
        .expect("main_problems");
    engine
        .set_value(&mut session, "problem_description", "No hay señal en la escuela".into())
        .expect("problem_description");
    engine
        .set_value(&mut session, "urgency", FieldValue::Integer(5))
        .expect("urgency");
    engine.submit(&mut session).expect("section 2");

    engine
        .set_value(&mut session, "skill_level", FieldValue::Integer(2))
        .expect("skill_level");
    engine
        .set_value(&mut session, "wants_mentoring", FieldValue::Boolean(true))
        .expect("wants_mentoring");
    let outcome = engine.submit(&mut session).expect("section 3");
    assert_eq!(outcome, SubmitOutcome::Completed { document_id: id.clone() });

    let payload = engine.render(&session);
    assert_eq!(payload.status, RenderStatus::Complete);
    assert!(payload.section.is_none());
    assert_eq!(payload.document_id.as_deref(), Some(id.as_str()));
}

#[test]
fn non_finite_numbers_never_reach_the_store() {
    let spec = parse_spec(
        r#"{
            "id": "metrics",
            "title": "Metrics",
            "version": "1.0.0",
            "collection": "metrics",
            "sections": [
                {
                    "id": "ratios",
                    "title": "Ratios",
                    "fields": [
                        { "id": "ratio", "type": "number", "title": "Ratio", "required": true }
                    ]
                }
            ]
        }"#,
    )
    .expect("spec");
    let engine = SurveyEngine::new(spec, MemoryStore::new()).expect("engine");
    let mut session = engine.start_session();

    engine
        .set_value(&mut session, "ratio", FieldValue::Double(f64::INFINITY))
        .expect("ratio");
    match engine.submit(&mut session) {
        Err(SubmitError::Invalid(result)) => {
            assert_eq!(result.errors[0].code.as_deref(), Some("not_finite"))
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert_eq!(engine.store().document_count("metrics"), 0);

    engine
        .set_value(&mut session, "ratio", FieldValue::Double(0.5))
        .expect("ratio");
    let outcome = engine.submit(&mut session).expect("submit");
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
}

#[test]
fn record_timestamps_read_back_unchanged() {
    let engine = engine();
    let mut session = engine.start_session();
    demographics(&engine, &mut session, "Santiago");
    let id = engine
        .submit(&mut session)
        .expect("submit")
        .document_id()
        .to_string();

    let stored = engine.fetch_record(&id).expect("fetch");
    let FieldValue::Timestamp(started_at) = &stored["started_at"] else {
        panic!("started_at timestamp");
    };
    assert_eq!(*started_at, session.start_time());
    assert_eq!(started_at.timestamp_subsec_nanos() % 1_000, 0);
}
