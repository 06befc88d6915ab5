use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse credentials from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credentials do not name a project; set project_id or pass a project override")]
    MissingProject,
    #[error(
        "no access token available; add access_token to the credentials or set SURVEY_ACCESS_TOKEN"
    )]
    MissingToken,
}

/// Service-account style credentials.
///
/// Only the fields needed to address the project and authorize requests are
/// read; key material in the file is ignored.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let contents = fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Replaces the token, e.g. with one minted outside the process.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Project to address; an explicit override wins over the file.
    pub fn resolve_project(
        &self,
        project_override: Option<&str>,
    ) -> Result<String, CredentialsError> {
        project_override
            .or(self.project_id.as_deref())
            .map(str::trim)
            .filter(|project| !project.is_empty())
            .map(str::to_string)
            .ok_or(CredentialsError::MissingProject)
    }

    pub fn require_token(&self) -> Result<&str, CredentialsError> {
        self.access_token().ok_or(CredentialsError::MissingToken)
    }
}
