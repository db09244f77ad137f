mod auth;
mod client;
mod target;

pub use auth::AuthHeader;
pub use client::{CollectionStatus, CreateOutcome, DavClient, DavError, Reconciled, UploadResponse};
pub use target::RemoteDir;
