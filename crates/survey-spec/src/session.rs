use chrono::{DateTime, Utc};

use crate::record;
use crate::value::{FieldValue, Fields};

/// Tracks the active section of a survey with `total` sections.
///
/// Positions are 1-based; `total + 1` is the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequencer {
    current: usize,
    total: usize,
}

impl Sequencer {
    pub fn new(total: usize) -> Self {
        Self { current: 1, total }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.current > self.total
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }

    /// Moves to the next section. Never skips and never moves past the terminal state.
    pub fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total + 1);
    }

    /// Moves back one section, never below the first. No-op once done.
    pub fn retreat(&mut self) {
        if self.is_done() {
            return;
        }
        self.current = self.current.saturating_sub(1).max(1);
    }
}

/// Per-respondent state, owned by whoever drives the page interaction.
#[derive(Debug, Clone)]
pub struct Session {
    sequencer: Sequencer,
    document_id: Option<String>,
    values: Fields,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(total_sections: usize) -> Self {
        Self::started_at(total_sections, record::now())
    }

    pub fn started_at(total_sections: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            sequencer: Sequencer::new(total_sections),
            document_id: None,
            values: Fields::new(),
            started_at,
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn current(&self) -> usize {
        self.sequencer.current()
    }

    pub fn is_done(&self) -> bool {
        self.sequencer.is_done()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Records a successful section write against `document_id` and moves
    /// on. The first write binds the identifier; a write reporting any other
    /// identifier is refused and the session stays put.
    pub fn section_saved(&mut self, document_id: &str) -> bool {
        match &self.document_id {
            Some(bound) if bound != document_id => return false,
            Some(_) => {}
            None => self.document_id = Some(document_id.to_string()),
        }
        self.sequencer.advance();
        true
    }

    /// Goes back one section; values already entered are kept.
    pub fn retreat(&mut self) {
        self.sequencer.retreat();
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    pub fn values(&self) -> &Fields {
        &self.values
    }

    pub fn set_value(&mut self, field_id: impl Into<String>, value: FieldValue) {
        self.values.insert(field_id.into(), value);
    }

    pub fn clear_value(&mut self, field_id: &str) -> Option<FieldValue> {
        self.values.remove(field_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retreat_floors_at_first_section() {
        let mut sequencer = Sequencer::new(3);
        sequencer.retreat();
        assert_eq!(sequencer.current(), 1);
        sequencer.advance();
        sequencer.retreat();
        sequencer.retreat();
        assert_eq!(sequencer.current(), 1);
    }

    #[test]
    fn advance_steps_one_section_and_stops_at_done() {
        let mut sequencer = Sequencer::new(2);
        sequencer.advance();
        assert_eq!(sequencer.current(), 2);
        assert!(sequencer.is_last());
        sequencer.advance();
        assert!(sequencer.is_done());
        sequencer.advance();
        assert_eq!(sequencer.current(), 3);
    }

    #[test]
    fn done_is_terminal() {
        let mut sequencer = Sequencer::new(1);
        sequencer.advance();
        sequencer.retreat();
        assert!(sequencer.is_done());
    }

    #[test]
    fn saving_binds_the_first_identifier_and_advances() {
        let mut session = Session::new(2);
        assert!(session.section_saved("abc"));
        assert_eq!(session.current(), 2);
        assert!(!session.section_saved("def"));
        assert_eq!(session.current(), 2);
        assert_eq!(session.document_id(), Some("abc"));
        assert!(session.section_saved("abc"));
        assert!(session.is_done());
    }

    #[test]
    fn retreat_keeps_values_and_identifier() {
        let mut session = Session::new(3);
        session.set_value("country", "Chile".into());
        session.section_saved("abc");
        session.retreat();
        assert_eq!(session.current(), 1);
        assert_eq!(session.document_id(), Some("abc"));
        assert_eq!(session.value("country"), Some(&FieldValue::from("Chile")));
    }
}
