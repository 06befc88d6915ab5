use survey_spec::{
    FieldValue, RenderStatus, Session, SurveySpec, build_render_payload, render_json_ui,
    render_text,
};

fn fixture() -> SurveySpec {
    serde_json::from_str(include_str!("fixtures/diagnostic_survey.json")).expect("deserialize")
}

#[test]
fn first_page_shows_demographics() {
    let spec = fixture();
    let session = Session::new(spec.total_sections());
    let payload = build_render_payload(&spec, &session);

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.progress.current, 1);
    assert_eq!(payload.progress.total, 3);
    let section = payload.section.as_ref().expect("active section");
    assert_eq!(section.id, "demographics");
    assert_eq!(section.submit_label, "Enviar sección 1");
    assert_eq!(section.fields.len(), 6);

    let text = render_text(&payload);
    assert!(text.contains("Section 1/3"));
    assert!(text.contains("community (Comunidad / ciudad) [required]"));
}

#[test]
fn json_ui_carries_current_values() {
    let spec = fixture();
    let mut session = Session::new(spec.total_sections());
    session.set_value("age", FieldValue::Integer(30));
    let payload = build_render_payload(&spec, &session);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["status"], "need_input");
    let fields = ui["section"]["fields"].as_array().expect("fields array");
    let age = fields
        .iter()
        .find(|field| field["id"] == "age")
        .expect("age field");
    assert_eq!(age["type"], "integer");
    assert_eq!(age["current_value"], 30);
    assert!(ui["acknowledgment"].is_null());
}

#[test]
fn results_view_shows_identifier_and_no_controls() {
    let spec = fixture();
    let mut session = Session::new(spec.total_sections());
    for _ in 0..spec.total_sections() {
        assert!(session.section_saved("doc-123"));
    }
    let payload = build_render_payload(&spec, &session);

    assert_eq!(payload.status, RenderStatus::Complete);
    assert!(payload.section.is_none());
    let acknowledgment = payload.acknowledgment.as_deref().expect("acknowledgment");
    assert!(acknowledgment.contains("doc-123"));
    assert!(acknowledgment.contains("Diagnóstico UniDigiHub"));

    let ui = render_json_ui(&payload);
    assert!(ui["section"].is_null());
    assert_eq!(ui["document_id"], "doc-123");

    let text = render_text(&payload);
    assert!(text.contains("Identifier: doc-123"));
    assert!(!text.contains("[required]"));
}
