//! Common test utilities for end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;
use studio_client::services::{FileCreditStore, LogNavigator};
use studio_client::SubmissionController;
use tempfile::TempDir;
use workflow_tests::RelayHandle;

/// A studio session persisting to a throwaway directory.
pub struct Device {
    pub controller: SubmissionController,
    pub store: Arc<FileCreditStore>,
    pub navigator: Arc<LogNavigator>,
    pub dir: TempDir,
}

pub fn device(relay: &RelayHandle) -> Device {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    reopen(relay, dir)
}

/// Start a new session on an existing device directory, as after a restart.
pub fn reopen(relay: &RelayHandle, dir: TempDir) -> Device {
    let store = Arc::new(FileCreditStore::new(dir.path().join("local_storage.json")));
    let (controller, navigator) = relay
        .studio(store.clone())
        .expect("Failed to build studio controller");
    Device {
        controller,
        store,
        navigator,
        dir,
    }
}
