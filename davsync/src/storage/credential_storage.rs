use keyring::Entry;
use thiserror::Error;

use crate::session::Credentials;

pub const KEYRING_SERVICE: &str = "io.davsync";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
    #[error("credentials not found")]
    CredentialsNotFound,
    #[error("stored credentials are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Keyring entry holding the credentials of one project.
pub struct CredentialStorage {
    entry: Entry,
}

impl CredentialStorage {
    pub fn for_project(project: &str) -> Result<Self, StorageError> {
        Ok(Self {
            entry: Entry::new(KEYRING_SERVICE, project)?,
        })
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let secret = serde_json::to_string(credentials)?;
        self.entry.set_password(&secret)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Credentials, StorageError> {
        match self.entry.get_password() {
            Ok(secret) => Ok(serde_json::from_str(&secret)?),
            Err(keyring::Error::NoEntry) => Err(StorageError::CredentialsNotFound),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }

    pub fn delete(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }
}
