mod config;
mod wizard;

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::{StoreArgs, load_spec, resolve_target};
use survey_engine::{DocumentStore, SubmitError, SubmitOutcome, SurveyEngine};
use survey_spec::{
    FieldType, FieldValue, RenderField, RenderStatus, survey_schema, validate_survey,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wizard::{
    AnswerParseError, PromptContext, RenderMode, Verbosity, WizardPresenter, describe_validation,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Multi-section survey CLI",
    long_about = "Collects survey answers section by section and saves them to a single Firestore record"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through the survey one section at a time.
    Run {
        #[command(flatten)]
        store: StoreArgs,
        /// Show verbose output (status, store target, parse expectations, saved record).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Render output mode for pages and the results view.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate a complete answers document against the survey.
    Validate {
        /// Path to the survey spec JSON (defaults to SURVEY_SPEC or the bundled survey).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print the JSON Schema of the survey spec format.
    Schema,
    /// Print a saved record.
    Fetch {
        /// Document identifier returned when the first section was saved.
        #[arg(long, value_name = "ID")]
        id: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            store,
            verbose,
            format,
        } => {
            init_tracing(verbose);
            run_survey(store, verbose, format)
        }
        Command::Validate { spec, answers } => {
            init_tracing(false);
            run_validate(spec, answers)
        }
        Command::Schema => run_schema(),
        Command::Fetch { id, store } => {
            init_tracing(false);
            run_fetch(store, &id)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn run_survey(args: StoreArgs, verbose: bool, format: RenderMode) -> CliResult<()> {
    let spec = load_spec(&args, &env_lookup)?;
    let target = resolve_target(&args, &spec, &env_lookup)?;
    let store_label = target.describe();
    debug!(store = %store_label, collection = %spec.collection, "store resolved");
    let engine = SurveyEngine::new(spec, target.into_store())?;

    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), format);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let document_id = drive_session(&engine, &mut input, &mut presenter, &store_label)?;

    if presenter.verbosity().is_verbose() {
        let record = engine.fetch_record(&document_id)?;
        println!("Saved record:");
        presenter.show_record(&FieldValue::Map(record).to_json());
    }
    Ok(())
}

/// Runs one respondent session to completion and returns the record id.
fn drive_session<S: DocumentStore>(
    engine: &SurveyEngine<S>,
    input: &mut impl BufRead,
    presenter: &mut WizardPresenter,
    store_label: &str,
) -> CliResult<String> {
    let mut session = engine.start_session();

    'pages: loop {
        let payload = engine.render(&session);
        presenter.show_header(&payload, store_label);
        if payload.status == RenderStatus::Complete {
            presenter.show_results(&payload);
            return session
                .document_id()
                .map(str::to_string)
                .ok_or_else(|| "survey completed without a saved record".into());
        }
        let Some(section) = payload.section.clone() else {
            return Err("no section available to render".into());
        };
        presenter.show_page(&payload);

        let total = section.fields.len();
        for (position, field) in section.fields.iter().enumerate() {
            let prompt = PromptContext::new(field, position + 1, total);
            match prompt_field(input, presenter, &prompt, field)? {
                FieldInput::Set(value) => engine.set_value(&mut session, &field.id, value)?,
                FieldInput::Clear => engine.clear_value(&mut session, &field.id)?,
                FieldInput::Keep => {}
                FieldInput::Back => {
                    if session.sequencer().is_first() {
                        println!("Already at the first section.");
                    }
                    engine.retreat(&mut session);
                    continue 'pages;
                }
            }
        }

        match engine.submit(&mut session) {
            Ok(SubmitOutcome::Advanced {
                section,
                document_id,
            }) => presenter.show_saved(section, payload.progress.total, &document_id),
            Ok(SubmitOutcome::Completed { .. }) => {}
            Err(SubmitError::Invalid(result)) => presenter.show_validation(&result),
            Err(SubmitError::Store(err)) => presenter.show_store_error(&err),
            Err(err) => return Err(err.into()),
        }
    }
}

/// What the respondent asked for at a single prompt.
#[derive(Debug, PartialEq)]
enum FieldInput {
    Set(FieldValue),
    Keep,
    Clear,
    Back,
}

fn prompt_field(
    input: &mut impl BufRead,
    presenter: &WizardPresenter,
    prompt: &PromptContext,
    field: &RenderField,
) -> CliResult<FieldInput> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err("input ended before the survey was completed".into());
        }

        let trimmed = line.trim();
        match trimmed {
            ":exit" => return Err("survey aborted by user".into()),
            ":back" => return Ok(FieldInput::Back),
            ":clear" => return Ok(FieldInput::Clear),
            "" => return empty_answer(field),
            raw => match parse_answer(field, raw) {
                Ok(value) => return Ok(FieldInput::Set(value)),
                Err(err) => presenter.show_parse_error(&err),
            },
        }
    }
}

/// An empty line keeps the current value, falls back to the default, or leaves the field unset.
fn empty_answer(field: &RenderField) -> CliResult<FieldInput> {
    if field
        .current_value
        .as_ref()
        .is_some_and(|value| !value.is_empty())
    {
        return Ok(FieldInput::Keep);
    }
    match field.default.as_deref().map(str::trim) {
        Some(default) if !default.is_empty() => parse_answer(field, default)
            .map(FieldInput::Set)
            .map_err(|err| {
                format!(
                    "default for '{}' is not usable: {}",
                    field.id, err.user_message
                )
                .into()
            }),
        _ => Ok(FieldInput::Keep),
    }
}

fn parse_answer(field: &RenderField, raw: &str) -> Result<FieldValue, AnswerParseError> {
    let raw = raw.trim();
    let choices = field.choices.as_deref().unwrap_or_default();
    match field.kind {
        FieldType::Text => Ok(FieldValue::String(raw.to_string())),
        FieldType::Integer => parse_integer(raw),
        FieldType::Number => parse_number(raw),
        FieldType::Boolean => parse_boolean(raw),
        FieldType::Select => parse_choice(choices, raw).map(FieldValue::String),
        FieldType::MultiChoice => parse_multi_choice(choices, raw),
    }
}

fn parse_boolean(raw: &str) -> Result<FieldValue, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "sí" | "si" | "s" | "1" => Ok(FieldValue::Boolean(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(FieldValue::Boolean(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n, sí/no, true/false)".to_string()),
        )),
    }
}

fn parse_integer(raw: &str) -> Result<FieldValue, AnswerParseError> {
    raw.parse::<i64>().map(FieldValue::Integer).map_err(|_| {
        AnswerParseError::new(
            "Please enter a whole number.",
            Some("expected integer".to_string()),
        )
    })
}

fn parse_number(raw: &str) -> Result<FieldValue, AnswerParseError> {
    raw.parse::<f64>()
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected number".to_string()),
            )
        })
        .and_then(|value| {
            if value.is_finite() {
                Ok(FieldValue::Double(value))
            } else {
                Err(AnswerParseError::new(
                    "Please enter a finite number.",
                    Some("number must be finite".to_string()),
                ))
            }
        })
}

/// Matches a choice by label (case-insensitive) or by its 1-based position.
fn parse_choice(choices: &[String], raw: &str) -> Result<String, AnswerParseError> {
    if let Some(choice) = choices
        .iter()
        .find(|choice| choice.to_lowercase() == raw.to_lowercase())
    {
        return Ok(choice.clone());
    }
    if let Ok(position) = raw.parse::<usize>()
        && let Some(choice) = position.checked_sub(1).and_then(|index| choices.get(index))
    {
        return Ok(choice.clone());
    }
    Err(AnswerParseError::new(
        format!("Choose one of: {}.", choices.join(", ")),
        Some(format!(
            "allowed values: {} (or their number)",
            choices.join(", ")
        )),
    ))
}

fn parse_multi_choice(choices: &[String], raw: &str) -> Result<FieldValue, AnswerParseError> {
    let mut selected: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let choice = parse_choice(choices, part)?;
        if !selected.contains(&choice) {
            selected.push(choice);
        }
    }
    if selected.is_empty() {
        return Err(AnswerParseError::new(
            "Choose at least one option, separated by commas.",
            Some(format!("allowed values: {}", choices.join(", "))),
        ));
    }
    Ok(FieldValue::Array(
        selected.into_iter().map(FieldValue::String).collect(),
    ))
}

fn run_validate(spec_path: Option<PathBuf>, answers_path: PathBuf) -> CliResult<()> {
    let args = StoreArgs {
        spec: spec_path,
        ..StoreArgs::default()
    };
    let spec = load_spec(&args, &env_lookup)?;
    let answers_json = fs::read_to_string(&answers_path)?;
    let answers: serde_json::Value = serde_json::from_str(&answers_json)?;
    let FieldValue::Map(answers) = FieldValue::from_json(&answers) else {
        return Err("answers must be a JSON object keyed by field id".into());
    };

    let result = validate_survey(&spec, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_schema() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&survey_schema())?);
    Ok(())
}

fn run_fetch(args: StoreArgs, id: &str) -> CliResult<()> {
    let spec = load_spec(&args, &env_lookup)?;
    let target = resolve_target(&args, &spec, &env_lookup)?;
    let engine = SurveyEngine::new(spec, target.into_store())?;
    let record = engine.fetch_record(id)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&FieldValue::Map(record).to_json())?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use survey_engine::{MemoryStore, bundled_spec};

    fn field(kind: FieldType, choices: &[&str]) -> RenderField {
        RenderField {
            id: "field".into(),
            title: "Field".into(),
            description: None,
            kind,
            required: true,
            default: None,
            current_value: None,
            choices: (!choices.is_empty())
                .then(|| choices.iter().map(|choice| choice.to_string()).collect()),
        }
    }

    #[test]
    fn parse_answer_boolean_accepts_spanish() {
        let boolean = field(FieldType::Boolean, &[]);
        assert_eq!(
            parse_answer(&boolean, "Sí").expect("boolean"),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            parse_answer(&boolean, "no").expect("boolean"),
            FieldValue::Boolean(false)
        );
        assert!(parse_answer(&boolean, "maybe").is_err());
    }

    #[test]
    fn parse_answer_select_matches_label_or_position() {
        let select = field(FieldType::Select, &["México", "Guatemala", "Chile"]);
        assert_eq!(
            parse_answer(&select, "méxico").expect("label"),
            FieldValue::from("México")
        );
        assert_eq!(
            parse_answer(&select, "3").expect("position"),
            FieldValue::from("Chile")
        );
        assert!(parse_answer(&select, "0").is_err());
        assert!(parse_answer(&select, "Perú").is_err());
    }

    #[test]
    fn parse_answer_multi_choice_splits_and_dedupes() {
        let multi = field(FieldType::MultiChoice, &["Empleo", "Educación", "Salud"]);
        assert_eq!(
            parse_answer(&multi, "empleo, 3, Empleo").expect("multi"),
            FieldValue::Array(vec!["Empleo".into(), "Salud".into()])
        );
        assert!(parse_answer(&multi, " , ").is_err());
    }

    #[test]
    fn parse_answer_numbers() {
        assert_eq!(
            parse_answer(&field(FieldType::Integer, &[]), "42").expect("integer"),
            FieldValue::Integer(42)
        );
        assert!(parse_answer(&field(FieldType::Integer, &[]), "4.5").is_err());
        assert_eq!(
            parse_answer(&field(FieldType::Number, &[]), "4.5").expect("number"),
            FieldValue::Double(4.5)
        );
        assert!(parse_answer(&field(FieldType::Number, &[]), "inf").is_err());
    }

    #[test]
    fn empty_answer_keeps_current_then_uses_default() {
        let mut urgency = field(FieldType::Integer, &[]);
        urgency.default = Some("3".into());
        assert_eq!(
            empty_answer(&urgency).expect("default"),
            FieldInput::Set(FieldValue::Integer(3))
        );
        urgency.current_value = Some(FieldValue::Integer(5));
        assert_eq!(empty_answer(&urgency).expect("keep"), FieldInput::Keep);
        assert_eq!(
            empty_answer(&field(FieldType::Text, &[])).expect("unset"),
            FieldInput::Keep
        );
    }

    fn presenter() -> WizardPresenter {
        WizardPresenter::new(Verbosity::Clean, RenderMode::Text)
    }

    #[test]
    fn session_completes_from_scripted_input() {
        let engine =
            SurveyEngine::new(bundled_spec().expect("spec"), MemoryStore::new()).expect("engine");
        let script = "Chile\n30\nX\n\n\n\nEmpleo,Salud\nFalta de empleo juvenil\n\n7\n\nyes\n";
        let mut input = Cursor::new(script);
        let id = drive_session(&engine, &mut input, &mut presenter(), "memory").expect("complete");

        let record = engine.fetch_record(&id).expect("record");
        assert_eq!(record["status"], FieldValue::from("Completed"));
        let FieldValue::Map(problems) = &record["local_problems"] else {
            panic!("local_problems map");
        };
        assert_eq!(problems["urgency"], FieldValue::Integer(3));
        assert_eq!(engine.store().document_count("diagnosticos"), 1);
    }

    #[test]
    fn back_revisits_the_previous_section_without_a_second_record() {
        let engine =
            SurveyEngine::new(bundled_spec().expect("spec"), MemoryStore::new()).expect("engine");
        let script = concat!(
            "Chile\n30\nX\n\n\n\n",
            ":back\n",
            "\n\nValparaíso\n\n\n\n",
            "Empleo\nFalta de empleo juvenil\n4\n",
            "7\n\nno\n"
        );
        let mut input = Cursor::new(script);
        let id = drive_session(&engine, &mut input, &mut presenter(), "memory").expect("complete");

        assert_eq!(engine.store().document_count("diagnosticos"), 1);
        let record = engine.fetch_record(&id).expect("record");
        let FieldValue::Map(demographics) = &record["demographics"] else {
            panic!("demographics map");
        };
        assert_eq!(demographics["community"], FieldValue::from("Valparaíso"));
        assert_eq!(demographics["country"], FieldValue::from("Chile"));
    }

    #[test]
    fn missing_required_field_repeats_the_page() {
        let engine =
            SurveyEngine::new(bundled_spec().expect("spec"), MemoryStore::new()).expect("engine");
        let mut input = Cursor::new("Chile\n30\n\n\n\n\n:exit\n");
        let error = drive_session(&engine, &mut input, &mut presenter(), "memory").unwrap_err();
        assert_eq!(error.to_string(), "survey aborted by user");
        assert_eq!(engine.store().document_count("diagnosticos"), 0);
    }

    #[test]
    fn closed_input_is_an_error() {
        let engine =
            SurveyEngine::new(bundled_spec().expect("spec"), MemoryStore::new()).expect("engine");
        let mut input = Cursor::new("Chile\n");
        let error = drive_session(&engine, &mut input, &mut presenter(), "memory").unwrap_err();
        assert!(error.to_string().contains("input ended"));
    }
}
