//! Gmail API module split into logical submodules
//!
//! This module provides all Gmail API functionality organized into:
//! - service: the Gmail v1 endpoints behind the `GmailApi` trait
//! - labels: label listing, creation and deletion
//! - messages: message actions (send, list, archive, trash)

pub mod labels;
pub mod messages;
pub mod service;

use std::sync::Arc;

use crate::defaults::DeferredDefault;

pub use messages::{document_url, ARCHIVE_REMOVED_LABELS, DEFAULT_FILE_SENDER, TRASH_LABEL};
pub use service::{GmailApi, GmailService, ME};

// Re-export mocks for testing
#[cfg(test)]
pub use service::MockGmailApi;

pub type GmailHandle = Arc<dyn GmailApi>;

/// Gmail operations. Each takes an optional service handle and falls back to
/// the default one, built on first use.
#[derive(Clone)]
pub struct Gmail {
    service: DeferredDefault<GmailHandle>,
}

impl Gmail {
    pub fn new(service: DeferredDefault<GmailHandle>) -> Self {
        Self { service }
    }

    pub fn with_service(service: GmailHandle) -> Self {
        Self::new(DeferredDefault::value("service", service))
    }
}
