//! Persisted state across application runs

mod common;

use common::{CountingRemote, ROOT, StaticVault};
use std::sync::Arc;
use tempfile::TempDir;
use vaultmirror::{MirrorApp, exit_code, read_status};
use vaultmirror_core::{MirrorConfig, RetryConfig, SyncMode, SyncSettings};

fn config(temp: &TempDir) -> MirrorConfig {
    let vault = temp.path().join("vault");
    std::fs::create_dir_all(&vault).unwrap();
    MirrorConfig::builder(&vault, ROOT)
        .api_token("secret_test")
        .state_dir(temp.path().join("state"))
        .sync_settings(SyncSettings {
            request_delay_ms: 0,
            ..SyncSettings::default()
        })
        .retry(RetryConfig::immediate())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_state_is_saved_after_pass_and_reused() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let vault = Arc::new(StaticVault::new(&[("Inbox.md", "hello"), ("Work/Plan.md", "plan")]));
    let remote = Arc::new(CountingRemote::default());

    let app = MirrorApp::with_parts(config.clone(), vault.clone(), remote.clone())
        .await
        .unwrap();
    let report = app.run(SyncMode::Incremental).await;
    assert_eq!(exit_code(&report), 0);
    assert_eq!(report.counts.created, 2);
    assert!(app.store().state_file().exists());

    let status = read_status(&config).await.unwrap();
    assert_eq!(status.tracked_documents, 2);
    // Two documents plus the "Work" folder
    assert_eq!(status.cached_nodes, 3);
    assert!(status.last_pass_at.is_some());
    assert_eq!(status.root_page_id, ROOT);

    // A fresh process picks up where the last one stopped
    let app = MirrorApp::with_parts(config, vault, remote.clone())
        .await
        .unwrap();
    let report = app.run(SyncMode::Incremental).await;
    assert_eq!(report.counts.skipped, 2);
    assert_eq!(remote.created().len(), 3);
}

#[tokio::test]
async fn test_fatal_pass_does_not_save_state() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let vault = Arc::new(StaticVault::new(&[("Inbox.md", "hello")]));
    let remote = Arc::new(CountingRemote::default());
    remote.set_offline(true);

    let app = MirrorApp::with_parts(config, vault, remote.clone())
        .await
        .unwrap();
    let report = app.run(SyncMode::Incremental).await;

    assert!(report.is_fatal());
    assert_eq!(exit_code(&report), 2);
    assert!(!app.store().state_file().exists());
    assert!(remote.created().is_empty());
}

#[tokio::test]
async fn test_try_run_when_idle_runs_pass() {
    let temp = TempDir::new().unwrap();
    let vault = Arc::new(StaticVault::new(&[("Inbox.md", "hello")]));
    let remote = Arc::new(CountingRemote::default());
    let app = MirrorApp::with_parts(config(&temp), vault, remote)
        .await
        .unwrap();

    let report = app.try_run(SyncMode::Incremental).await;
    assert!(report.is_some_and(|r| r.is_success()));
}

#[tokio::test]
async fn test_concurrent_passes_are_serialized() {
    let temp = TempDir::new().unwrap();
    let vault = Arc::new(StaticVault::new(&[("Inbox.md", "hello")]));
    let remote = Arc::new(CountingRemote::default());
    let app = MirrorApp::with_parts(config(&temp), vault, remote.clone())
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        app.run(SyncMode::Incremental),
        app.run(SyncMode::Incremental)
    );

    // Whichever ran second saw the first pass's cache
    assert_eq!(first.counts.created + second.counts.created, 1);
    assert_eq!(remote.created(), vec!["Inbox"]);
}

#[tokio::test]
async fn test_corrupt_state_file_is_ignored() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let vault = Arc::new(StaticVault::new(&[("Inbox.md", "hello")]));
    let remote = Arc::new(CountingRemote::default());

    let app = MirrorApp::with_parts(config.clone(), vault.clone(), remote.clone())
        .await
        .unwrap();
    std::fs::write(app.store().state_file(), "not json at all").unwrap();

    let app = MirrorApp::with_parts(config, vault, remote)
        .await
        .unwrap();
    let report = app.run(SyncMode::Incremental).await;
    assert_eq!(report.counts.created, 1);
}
