use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use davsync_core::{AuthHeader, CreateOutcome, DavClient, DavError, RemoteDir};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DEFAULT_SYSTEM_PATH, DEFAULT_TIMEOUT_SECS, SyncConfig};
use crate::report::{Reporter, format_elapsed};
use crate::session::{SessionError, SessionProvider};

const CREDENTIALS_HINT: &str =
    "Please verify your authentication credentials and connectivity, then try again.";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("session error: {0}")]
    Session(#[source] SessionError),
    #[error("invalid remote target: {0}")]
    Target(#[source] DavError),
    #[error("failed to create directory {url} on server: {status}")]
    DirectoryReconcile { url: Url, status: StatusCode },
    #[error("failed to read {path}: {source}")]
    LocalRead { path: PathBuf, source: io::Error },
    #[error("server answered {status}")]
    Upload { status: StatusCode },
    #[error("{0}")]
    Transport(#[source] DavError),
}

impl SyncError {
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            SyncError::DirectoryReconcile { status, .. } | SyncError::Upload { status } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::Session(
                SessionError::CredentialsNotFound { .. } | SessionError::Storage(_),
            )
            | SyncError::Transport(_) => Some(CREDENTIALS_HINT),
            SyncError::Upload { status }
                if matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
            {
                Some(CREDENTIALS_HINT)
            }
            _ => None,
        }
    }
}

impl From<DavError> for SyncError {
    fn from(err: DavError) -> Self {
        match err {
            DavError::DirectoryCreation { url, status } => {
                SyncError::DirectoryReconcile { url, status }
            }
            DavError::Request(_) => SyncError::Transport(err),
            DavError::Url(_) | DavError::InvalidTarget(_) | DavError::InvalidMethod(_) => {
                SyncError::Target(err)
            }
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// No project configuration; nothing was attempted.
    Skipped,
    Success { remote_url: Url, elapsed: Duration },
    Failure(SyncError),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }

    /// Exit status for a parent process: 1 on any failure, 0 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncOutcome::Failure(_) => 1,
            SyncOutcome::Skipped | SyncOutcome::Success { .. } => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub suppress_interactive_output: bool,
    pub system_path: String,
    pub request_timeout: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            suppress_interactive_output: config.child_process,
            system_path: config.system_path.clone(),
            request_timeout: config.request_timeout,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            suppress_interactive_output: false,
            system_path: DEFAULT_SYSTEM_PATH.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct FileSync<S> {
    session: S,
    options: SyncOptions,
    reporter: Reporter,
}

impl<S: SessionProvider> FileSync<S> {
    pub fn new(session: S, options: SyncOptions) -> Self {
        let reporter = Reporter::new(options.suppress_interactive_output);
        Self::with_reporter(session, options, reporter)
    }

    /// Uses `reporter` for console lines instead of one derived from `options`.
    pub fn with_reporter(session: S, options: SyncOptions, reporter: Reporter) -> Self {
        Self {
            session,
            options,
            reporter,
        }
    }

    /// Pushes `local_path` into the project's remote directory.
    ///
    /// Runs the existence check, create, read and upload strictly in sequence. The first failure
    /// ends the run; nothing is retried.
    pub async fn sync_file(&self, local_path: &Path, remote_sub_path: Option<&str>) -> SyncOutcome {
        let outcome = match self.run(local_path, remote_sub_path).await {
            Ok(Some((remote_url, elapsed))) => SyncOutcome::Success {
                remote_url,
                elapsed,
            },
            Ok(None) => SyncOutcome::Skipped,
            Err(err) => SyncOutcome::Failure(err),
        };
        self.report(local_path, &outcome);
        outcome
    }

    async fn run(
        &self,
        local_path: &Path,
        remote_sub_path: Option<&str>,
    ) -> Result<Option<(Url, Duration)>, SyncError> {
        let Some(project) = self.session.project_config().map_err(SyncError::Session)? else {
            debug!("no project configuration found, skipping sync");
            return Ok(None);
        };
        let remote_dir = RemoteDir::new(
            &project.host,
            &self.options.system_path,
            remote_sub_path.filter(|path| !path.trim().is_empty()),
        )?;
        let auth = {
            let credentials = self
                .session
                .credentials(&project)
                .map_err(SyncError::Session)?;
            AuthHeader::basic(&credentials.username, &credentials.password)
        };
        let client = DavClient::with_timeout(auth, self.options.request_timeout)?;

        let started = Instant::now();
        self.reconcile_directory(&client, &remote_dir).await?;

        let content = tokio::fs::read(local_path)
            .await
            .map_err(|source| SyncError::LocalRead {
                path: local_path.to_path_buf(),
                source,
            })?;
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SyncError::LocalRead {
                path: local_path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            })?;
        let file_url = remote_dir.file_url(&file_name);

        self.reporter.info(format!("Syncing file: {file_name}"));
        info!("uploading {} ({} bytes) to {file_url}", local_path.display(), content.len());
        let response = client.upload(&file_url, content).await?;
        let elapsed = started.elapsed();

        if !response.is_success() {
            return Err(SyncError::Upload {
                status: response.status,
            });
        }
        Ok(Some((response.url, elapsed)))
    }

    async fn reconcile_directory(
        &self,
        client: &DavClient,
        remote_dir: &RemoteDir,
    ) -> Result<(), SyncError> {
        let dir_url = remote_dir.url();
        if client.exists(&dir_url).await? {
            debug!("remote directory {dir_url} already exists");
            return Ok(());
        }

        self.reporter.info(format!(
            "Remote directory '{dir_url}' does not exist. Creating..."
        ));
        match client.create_recursive(remote_dir).await? {
            CreateOutcome::Complete => {
                self.reporter.info("Directory created successfully!");
                Ok(())
            }
            CreateOutcome::Aborted { url, status } => {
                Err(SyncError::DirectoryReconcile { url, status })
            }
        }
    }

    fn report(&self, local_path: &Path, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Skipped => {}
            SyncOutcome::Success {
                remote_url,
                elapsed,
            } => {
                info!("synced {} to {remote_url}", local_path.display());
                self.reporter.info(format!(
                    "Successfully synced file: {} ({})",
                    local_path.display(),
                    format_elapsed(*elapsed)
                ));
            }
            SyncOutcome::Failure(err) => {
                warn!("sync of {} failed: {err}", local_path.display());
                match err {
                    SyncError::Upload { status } => self.reporter.error(format!(
                        "Failed to sync file: {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("")
                    )),
                    other => self.reporter.error(format!(
                        "An error occurred during file synchronization: {other}"
                    )),
                }
                if let Some(hint) = err.suggestion() {
                    self.reporter.hint(hint);
                }
            }
        }
    }
}
