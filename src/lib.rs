//! Convenience layer over Google Drive v3 and Gmail v1.
//!
//! Operations take an optional service handle. When it is left out, the
//! handle is built on first use from credentials that are themselves
//! authorized once per configuration and reused.

pub mod auth;
pub mod config;
pub mod defaults;
pub mod drive_api;
pub mod error;
pub mod gmail_api;
pub mod http;
pub mod logging;
pub mod memo;
pub mod pagination;
pub mod services;
pub mod types;

pub use auth::{AuthFlow, CredentialProvider, Credentials, InstalledFlow, TokenSource};
pub use config::{ApiOptions, Config, RetryPolicy};
pub use defaults::DeferredDefault;
pub use drive_api::{Drive, DriveApi, DriveHandle, DriveService};
pub use error::{Error, RemoteApiError, RemoteErrorKind, Result};
pub use gmail_api::{Gmail, GmailApi, GmailHandle, GmailService};
pub use memo::{Lazy, Memo};
pub use services::GoogleServices;
