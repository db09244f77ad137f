use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{AuthHeader, RemoteDir};

const PROPFIND_DEPTH: &str = "1";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum DavError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid remote target: {0}")]
    InvalidTarget(String),
    #[error("unsupported http method: {0}")]
    InvalidMethod(&'static str),
    #[error("failed to create directory {url} on server: {status}")]
    DirectoryCreation { url: Url, status: StatusCode },
}

/// Server answer to a single-level collection create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Created,
    AlreadyExists,
    MissingAncestor,
    Rejected(StatusCode),
}

impl CollectionStatus {
    fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            CollectionStatus::Created
        } else if status == StatusCode::METHOD_NOT_ALLOWED {
            CollectionStatus::AlreadyExists
        } else if status == StatusCode::CONFLICT {
            CollectionStatus::MissingAncestor
        } else {
            CollectionStatus::Rejected(status)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Complete,
    Aborted { url: Url, status: StatusCode },
}

impl CreateOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, CreateOutcome::Complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    AlreadyPresent,
    Created,
}

#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub url: Url,
    pub status: StatusCode,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }
}

#[derive(Clone)]
pub struct DavClient {
    http: Client,
    auth: AuthHeader,
}

impl DavClient {
    pub fn new(auth: AuthHeader) -> Self {
        Self::with_http(Client::new(), auth)
    }

    pub fn with_timeout(auth: AuthHeader, timeout: Duration) -> Result<Self, DavError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, auth))
    }

    pub fn with_http(http: Client, auth: AuthHeader) -> Self {
        Self { http, auth }
    }

    /// PROPFIND existence check. Anything but 2xx, auth failures included, reads as absent.
    pub async fn exists(&self, url: &Url) -> Result<bool, DavError> {
        let response = self
            .http
            .request(dav_method("PROPFIND")?, url.clone())
            .header("Authorization", self.auth.as_str())
            .header("Depth", PROPFIND_DEPTH)
            .send()
            .await?;
        let status = response.status();
        debug!("PROPFIND {url} -> {status}");
        Ok(status.is_success())
    }

    pub async fn create(&self, url: &Url) -> Result<bool, DavError> {
        Ok(self.create_collection(url).await? == CollectionStatus::Created)
    }

    pub async fn create_collection(&self, url: &Url) -> Result<CollectionStatus, DavError> {
        let response = self
            .http
            .request(dav_method("MKCOL")?, url.clone())
            .header("Authorization", self.auth.as_str())
            .send()
            .await?;
        let status = response.status();
        debug!("MKCOL {url} -> {status}");
        Ok(CollectionStatus::from_status(status))
    }

    /// Creates every collection below the mount of `dir`, one level per request.
    ///
    /// 405 counts as already present. The walk stops at the first 409 or any other
    /// non-2xx answer and never retries. With no segments below the mount, the
    /// mount collection itself is the only level created.
    pub async fn create_recursive(&self, dir: &RemoteDir) -> Result<CreateOutcome, DavError> {
        let mut levels = dir.ancestor_urls();
        if levels.is_empty() {
            levels.push(dir.mount_url().clone());
        }

        for url in levels {
            match self.create_collection(&url).await? {
                CollectionStatus::Created => debug!("created collection {url}"),
                CollectionStatus::AlreadyExists => debug!("collection {url} already exists"),
                CollectionStatus::MissingAncestor => {
                    warn!("parent of {url} is missing, aborting directory creation");
                    return Ok(CreateOutcome::Aborted {
                        url,
                        status: StatusCode::CONFLICT,
                    });
                }
                CollectionStatus::Rejected(status) => {
                    warn!("server rejected creation of {url}: {status}");
                    return Ok(CreateOutcome::Aborted { url, status });
                }
            }
        }
        Ok(CreateOutcome::Complete)
    }

    pub async fn ensure_directory_exists(&self, dir: &RemoteDir) -> Result<Reconciled, DavError> {
        let url = dir.url();
        if self.exists(&url).await? {
            debug!("remote directory {url} already exists");
            return Ok(Reconciled::AlreadyPresent);
        }

        info!("remote directory {url} does not exist, creating");
        match self.create_recursive(dir).await? {
            CreateOutcome::Complete => Ok(Reconciled::Created),
            CreateOutcome::Aborted { url, status } => {
                Err(DavError::DirectoryCreation { url, status })
            }
        }
    }

    /// Single PUT of the whole payload; the remote resource is overwritten.
    pub async fn upload(&self, file_url: &Url, content: Vec<u8>) -> Result<UploadResponse, DavError> {
        let response = self
            .http
            .put(file_url.clone())
            .header("Authorization", self.auth.as_str())
            .header("Content-Type", OCTET_STREAM)
            .body(content)
            .send()
            .await?;
        let status = response.status();
        debug!("PUT {file_url} -> {status}");
        Ok(UploadResponse {
            url: file_url.clone(),
            status,
        })
    }
}

fn dav_method(name: &'static str) -> Result<Method, DavError> {
    Method::from_bytes(name.as_bytes()).map_err(|_| DavError::InvalidMethod(name))
}
