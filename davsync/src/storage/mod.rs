mod credential_storage;

pub use credential_storage::{CredentialStorage, StorageError};
