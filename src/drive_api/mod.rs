//! Google Drive API module split into logical submodules
//!
//! - service: the Drive v3 endpoints behind the `DriveApi` trait
//! - files: file operations with a lazily built default service

pub mod files;
pub mod service;

pub use files::{Drive, DriveHandle};
pub use service::{DriveApi, DriveService};

// Re-export mocks for testing
#[cfg(test)]
pub use service::MockDriveApi;
