use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{SyncConfig, find_project_config};
use crate::storage::{CredentialStorage, StorageError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read project config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("project config {path} is malformed: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no credentials found for project {project}")]
    CredentialsNotFound { project: String },
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of the project context and credentials for one sync run.
pub trait SessionProvider {
    /// `Ok(None)` means the tool runs outside a configured project.
    fn project_config(&self) -> Result<Option<ProjectConfig>, SessionError>;

    fn credentials(&self, project: &ProjectConfig) -> Result<Credentials, SessionError>;
}

pub struct ProjectSession {
    config_path: Option<PathBuf>,
    working_dir: PathBuf,
}

impl ProjectSession {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config_path: config.project_config_path.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    pub fn load_project_config(path: &Path) -> Result<ProjectConfig, SessionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SessionError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SessionError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SessionProvider for ProjectSession {
    fn project_config(&self) -> Result<Option<ProjectConfig>, SessionError> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => match find_project_config(&self.working_dir) {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        debug!("loading project config from {}", path.display());
        Self::load_project_config(&path).map(Some)
    }

    fn credentials(&self, project: &ProjectConfig) -> Result<Credentials, SessionError> {
        if let Some(credentials) = credentials_from_vars(
            project,
            std::env::var("DAVSYNC_USERNAME").ok(),
            std::env::var("DAVSYNC_PASSWORD").ok(),
        ) {
            debug!("using credentials from environment for {}", project.name);
            return Ok(credentials);
        }

        match CredentialStorage::for_project(&project.name)?.load() {
            Ok(credentials) => Ok(credentials),
            Err(StorageError::CredentialsNotFound) => Err(SessionError::CredentialsNotFound {
                project: project.name.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Environment credentials need a password; the username may come from the project.
pub fn credentials_from_vars(
    project: &ProjectConfig,
    username: Option<String>,
    password: Option<String>,
) -> Option<Credentials> {
    let password = password?;
    let username = username
        .filter(|value| !value.is_empty())
        .or_else(|| project.username.clone())?;
    Some(Credentials { username, password })
}
