use std::fs;
use std::path::PathBuf;

use clap::Args;
use survey_engine::{Credentials, DocumentStore, FirestoreStore, MemoryStore, parse_spec};
use survey_spec::SurveySpec;

use crate::CliResult;

pub const SPEC_ENV: &str = "SURVEY_SPEC";
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const PROJECT_ENV: &str = "SURVEY_PROJECT_ID";
pub const COLLECTION_ENV: &str = "SURVEY_COLLECTION";
pub const EMULATOR_ENV: &str = "FIRESTORE_EMULATOR_HOST";
pub const TOKEN_ENV: &str = "SURVEY_ACCESS_TOKEN";

/// Options shared by every command that talks to the document store.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Path to the survey spec JSON (defaults to SURVEY_SPEC or the bundled survey).
    #[arg(long, value_name = "SPEC")]
    pub spec: Option<PathBuf>,
    /// Service-account credentials JSON (defaults to GOOGLE_APPLICATION_CREDENTIALS).
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,
    /// Project id override (defaults to SURVEY_PROJECT_ID, then the credentials).
    #[arg(long, value_name = "PROJECT")]
    pub project: Option<String>,
    /// Collection override (defaults to SURVEY_COLLECTION, then the survey spec).
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,
    /// Firestore emulator host, e.g. localhost:8080 (defaults to FIRESTORE_EMULATOR_HOST).
    #[arg(long, value_name = "HOST")]
    pub emulator: Option<String>,
    /// Keep records in memory for this run only.
    #[arg(long)]
    pub offline: bool,
}

/// Where records are written, resolved once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Offline,
    Emulator { host: String, project: String },
    Firestore { project: String, token: String },
}

impl StoreTarget {
    pub fn describe(&self) -> String {
        match self {
            StoreTarget::Offline => "in-memory store (offline)".to_string(),
            StoreTarget::Emulator { host, project } => {
                format!("Firestore emulator at {} (project {})", host, project)
            }
            StoreTarget::Firestore { project, .. } => format!("Firestore project {}", project),
        }
    }

    pub fn into_store(self) -> Box<dyn DocumentStore> {
        match self {
            StoreTarget::Offline => Box::new(MemoryStore::new()),
            StoreTarget::Emulator { host, project } => {
                Box::new(FirestoreStore::emulator(&host, &project))
            }
            StoreTarget::Firestore { project, token } => {
                Box::new(FirestoreStore::new(&project, token))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Loads the survey spec: flag, then environment, then the bundled survey.
pub fn load_spec(
    args: &StoreArgs,
    env: &impl Fn(&str) -> Option<String>,
) -> CliResult<SurveySpec> {
    let path = args
        .spec
        .clone()
        .or_else(|| non_empty(env(SPEC_ENV)).map(PathBuf::from));
    let mut spec = match path {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .map_err(|err| format!("failed to read spec {}: {}", path.display(), err))?;
            parse_spec(&contents)?
        }
        None => survey_engine::bundled_spec()?,
    };
    let collection =
        non_empty(args.collection.clone()).or_else(|| non_empty(env(COLLECTION_ENV)));
    if let Some(collection) = collection {
        spec.collection = collection;
    }
    Ok(spec)
}

/// Resolves the store target; credential problems are fatal here, before any page is shown.
pub fn resolve_target(
    args: &StoreArgs,
    spec: &SurveySpec,
    env: &impl Fn(&str) -> Option<String>,
) -> CliResult<StoreTarget> {
    if args.offline {
        return Ok(StoreTarget::Offline);
    }

    let project_override =
        non_empty(args.project.clone()).or_else(|| non_empty(env(PROJECT_ENV)));
    let credentials_path = args
        .credentials
        .clone()
        .or_else(|| non_empty(env(CREDENTIALS_ENV)).map(PathBuf::from));
    let credentials = credentials_path
        .as_deref()
        .map(Credentials::from_file)
        .transpose()?;

    let emulator = non_empty(args.emulator.clone()).or_else(|| non_empty(env(EMULATOR_ENV)));
    if let Some(host) = emulator {
        let project = match &credentials {
            Some(credentials) => credentials.resolve_project(project_override.as_deref())?,
            None => project_override.unwrap_or_else(|| spec.id.clone()),
        };
        return Ok(StoreTarget::Emulator { host, project });
    }

    let credentials = credentials.ok_or_else(|| {
        format!(
            "no credentials configured; pass --credentials, set {}, or use --offline",
            CREDENTIALS_ENV
        )
    })?;
    let credentials = match non_empty(env(TOKEN_ENV)) {
        Some(token) => credentials.with_access_token(token),
        None => credentials,
    };
    let project = credentials.resolve_project(project_override.as_deref())?;
    let token = credentials.require_token()?.to_string();
    Ok(StoreTarget::Firestore { project, token })
}
