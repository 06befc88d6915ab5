use serde_json::Value;
use survey_spec::{
    FieldType, RenderField, RenderPayload, RenderStatus, ValidationResult, render_json_ui,
    render_text,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: pages and prompts only.
    Clean,
    /// Verbose output: status, store target, parse expectations, stored record.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// How pages and the results view are printed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum RenderMode {
    Text,
    Json,
}

/// Prints pages, prompts and outcomes for one interactive run.
pub struct WizardPresenter {
    verbosity: Verbosity,
    mode: RenderMode,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, mode: RenderMode) -> Self {
        Self {
            verbosity,
            mode,
            header_printed: false,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn show_header(&mut self, payload: &RenderPayload, store: &str) {
        if self.header_printed {
            return;
        }
        println!("Survey: {} (v{})", payload.survey_title, payload.survey_version);
        if let Some(help) = &payload.help {
            println!("{}", help);
        }
        if self.verbosity.is_verbose() {
            println!("Store: {}", store);
        }
        println!("Commands: :back (previous section), :clear (unset), :exit (abort)");
        self.header_printed = true;
    }

    pub fn show_page(&self, payload: &RenderPayload) {
        println!();
        match self.mode {
            RenderMode::Text => println!("{}", render_text(payload)),
            RenderMode::Json => print_json(&render_json_ui(payload)),
        }
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.current,
                payload.progress.total
            );
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.title);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        } else if let Some(default) = &prompt.default {
            line.push_str(&format!(" [default: {}]", default));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            let numbered = prompt
                .choices
                .iter()
                .enumerate()
                .map(|(index, choice)| format!("{}) {}", index + 1, choice))
                .collect::<Vec<_>>();
            println!("Choices: {}", numbered.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_validation(&self, result: &ValidationResult) {
        println!("The section was not saved.");
        describe_validation(result);
    }

    pub fn show_store_error(&self, error: &dyn std::error::Error) {
        println!("The section was not saved: {}", error);
        println!("Your answers are kept; the section will be submitted again.");
    }

    pub fn show_saved(&self, section: usize, total: usize, document_id: &str) {
        if self.verbosity.is_verbose() {
            println!("Saved. Continuing with section {}/{} ({})", section, total, document_id);
        } else {
            println!("Saved.");
        }
    }

    pub fn show_results(&self, payload: &RenderPayload) {
        debug_assert_eq!(payload.status, RenderStatus::Complete);
        println!();
        match self.mode {
            RenderMode::Text => {
                println!("Done ✅");
                println!("{}", render_text(payload));
            }
            RenderMode::Json => print_json(&render_json_ui(payload)),
        }
    }

    pub fn show_record(&self, record: &Value) {
        print_json(record);
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{}", pretty),
        Err(err) => eprintln!("Failed to serialize output to JSON: {}", err),
    }
}

/// Prints the validation outcome the way both `run` and `validate` report it.
pub fn describe_validation(result: &ValidationResult) {
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
    pub default: Option<String>,
    pub choices: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &RenderField, index: usize, total: usize) -> Self {
        let choices = field.choices.clone().unwrap_or_default();
        Self {
            index,
            total,
            title: field.title.clone(),
            description: field.description.clone(),
            required: field.required,
            hint: hint(field.kind, &choices),
            current: field
                .current_value
                .as_ref()
                .filter(|value| !value.is_empty())
                .map(ToString::to_string),
            default: field.default.clone(),
            choices,
        }
    }
}

fn hint(kind: FieldType, choices: &[String]) -> Option<String> {
    match kind {
        FieldType::Boolean => Some("(yes/no, sí/no)".to_string()),
        FieldType::Integer => Some("(integer)".to_string()),
        FieldType::Number => Some("(number)".to_string()),
        FieldType::Select if !choices.is_empty() => Some(format!("({})", choices.join("/"))),
        FieldType::MultiChoice if !choices.is_empty() => {
            Some(format!("(comma-separated: {})", choices.join(", ")))
        }
        _ => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_spec::FieldValue;

    fn field(kind: FieldType, choices: Option<Vec<String>>) -> RenderField {
        RenderField {
            id: "country".into(),
            title: "País".into(),
            description: None,
            kind,
            required: true,
            default: None,
            current_value: None,
            choices,
        }
    }

    #[test]
    fn select_prompts_list_their_choices() {
        let prompt = PromptContext::new(
            &field(
                FieldType::Select,
                Some(vec!["México".into(), "Chile".into()]),
            ),
            1,
            6,
        );
        assert_eq!(prompt.hint.as_deref(), Some("(México/Chile)"));
        assert!(prompt.required);
        assert!(prompt.current.is_none());
    }

    #[test]
    fn current_values_are_shown_but_empty_ones_are_not() {
        let mut text = field(FieldType::Text, None);
        text.current_value = Some(FieldValue::from("Santiago"));
        assert_eq!(
            PromptContext::new(&text, 3, 6).current.as_deref(),
            Some("Santiago")
        );
        text.current_value = Some(FieldValue::from(""));
        assert!(PromptContext::new(&text, 3, 6).current.is_none());
        assert!(hint(FieldType::Text, &[]).is_none());
    }
}
