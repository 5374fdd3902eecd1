//! Reconciliation passes against a real directory and an in-memory VFS.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sync_core::{
    LocalDirectory, MemoryRuntime, PathPolicy, SyncEngine, SyncSnapshot, VfsStore,
};
use sync_test_utils::{FaultyLocalStore, FaultyRuntime, TestProject, rel};

struct Fixture {
    project: TestProject,
    runtime: Arc<MemoryRuntime>,
    vfs: Arc<FaultyRuntime>,
    local: Arc<FaultyLocalStore>,
    engine: SyncEngine,
}

fn fixture(project: TestProject) -> Fixture {
    let runtime = Arc::new(MemoryRuntime::new());
    let vfs = Arc::new(FaultyRuntime::new(runtime.clone()));
    let dir = LocalDirectory::open(project.root()).unwrap();
    let local = Arc::new(FaultyLocalStore::new(Arc::new(dir)));
    let engine = SyncEngine::new(
        local.clone(),
        VfsStore::new(vfs.clone(), "/"),
        PathPolicy::default(),
    );
    Fixture {
        project,
        runtime,
        vfs,
        local,
        engine,
    }
}

async fn connected(project: TestProject) -> (Fixture, SyncSnapshot) {
    let fx = fixture(project);
    let mut snapshot = SyncSnapshot::new();
    fx.engine
        .initial_reconcile(&mut snapshot, |_| {})
        .await
        .unwrap();
    (fx, snapshot)
}

#[tokio::test]
async fn local_copy_wins_initial_merge() {
    let fx = fixture(TestProject::new().with_file("a.txt", "local"));
    fx.runtime.put("/a.txt", "vfs");
    fx.runtime.put("/only/in_vfs.txt", "v");

    let mut snapshot = SyncSnapshot::new();
    let report = fx
        .engine
        .initial_reconcile(&mut snapshot, |_| {})
        .await
        .unwrap();

    assert_eq!(fx.runtime.file("/a.txt").unwrap(), b"local");
    assert_eq!(fx.project.read("a.txt"), "local");
    assert_eq!(fx.project.read("only/in_vfs.txt"), "v");
    assert_eq!(report.written_vfs, vec![rel("a.txt")]);
    assert_eq!(report.written_local, vec![rel("only/in_vfs.txt")]);
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn initial_progress_is_monotonic_and_completes() {
    let project = TestProject::new()
        .with_file("a.txt", "a")
        .with_file("b.txt", "b");
    let fx = fixture(project);
    fx.runtime.put("/c.txt", "c");

    let mut fractions = Vec::new();
    let mut snapshot = SyncSnapshot::new();
    fx.engine
        .initial_reconcile(&mut snapshot, |f| fractions.push(f))
        .await
        .unwrap();

    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(fractions.last(), Some(&1.0));
}

#[tokio::test]
async fn initial_merge_of_empty_stores_reports_completion() {
    let fx = fixture(TestProject::new());
    let mut fractions = Vec::new();
    let mut snapshot = SyncSnapshot::new();

    let report = fx
        .engine
        .initial_reconcile(&mut snapshot, |f| fractions.push(f))
        .await
        .unwrap();

    assert!(report.is_quiet());
    assert!(snapshot.is_empty());
    assert_eq!(fractions, vec![1.0]);
}

#[tokio::test]
async fn repeated_passes_without_changes_write_nothing() {
    let project = TestProject::new()
        .with_file("index.php", "<?php")
        .with_file("src/App.php", "<?php class App {}");
    let (fx, mut snapshot) = connected(project).await;
    fx.runtime.put("/src/New.php", "<?php");

    let first = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();
    assert_eq!(first.written_local, vec![rel("src/New.php")]);

    for _ in 0..2 {
        let vfs_pass = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();
        let local_pass = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();
        assert_eq!(vfs_pass.writes(), 0);
        assert_eq!(local_pass.writes(), 0);
    }
}

#[tokio::test]
async fn local_poll_does_not_echo_vfs_writes() {
    let (fx, mut snapshot) = connected(TestProject::new().with_file("a.txt", "one")).await;
    let vfs_writes = fx.vfs.write_count();

    fx.runtime.put("/a.txt", "two");
    let pushed = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();
    assert_eq!(pushed.written_local, vec![rel("a.txt")]);

    // Poller picks up the engine's own write with a new timestamp
    fx.project.edit("a.txt", "two");
    let polled = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();

    assert_eq!(polled.writes(), 0);
    assert_eq!(polled.unchanged, 1);
    assert_eq!(fx.vfs.write_count(), vfs_writes);

    // The refreshed timestamp short-circuits the next poll before any read
    fx.local.fail_reads_of(rel("a.txt"));
    let again = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();
    assert!(again.is_quiet());
}

#[tokio::test]
async fn local_edits_reach_the_vfs() {
    let (fx, mut snapshot) = connected(TestProject::new().with_file("a.txt", "one")).await;

    fx.project.edit("a.txt", "changed");
    fx.project.write("new/b.txt", "b");
    let report = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();

    assert_eq!(report.written_vfs, vec![rel("a.txt"), rel("new/b.txt")]);
    assert_eq!(fx.runtime.file("/a.txt").unwrap(), b"changed");
    assert_eq!(fx.runtime.file("/new/b.txt").unwrap(), b"b");

    // Round trip back through the VFS side is suppressed by fingerprint
    let back = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();
    assert_eq!(back.writes(), 0);
}

#[tokio::test]
async fn excluded_directories_are_never_synchronized() {
    let project = TestProject::new()
        .with_file("index.php", "<?php")
        .with_file("vendor/pkg/x.php", "local vendor");
    let fx = fixture(project);
    fx.runtime.put("/node_modules/lib/index.js", "js");
    fx.runtime.put("/vendor/pkg/y.php", "vfs vendor");

    let mut snapshot = SyncSnapshot::new();
    fx.engine
        .initial_reconcile(&mut snapshot, |_| {})
        .await
        .unwrap();

    fx.project.edit("vendor/pkg/x.php", "edited");
    fx.runtime.put("/vendor/pkg/y.php", "edited");
    fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();
    fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();

    assert_eq!(fx.runtime.file("/vendor/pkg/x.php"), None);
    fx.project.assert_file_not_exists("vendor/pkg/y.php");
    fx.project.assert_file_not_exists("node_modules");
    assert_eq!(snapshot.vfs_paths(), vec![rel("index.php")]);
}

#[tokio::test]
async fn vfs_deletion_removes_local_file() {
    let project = TestProject::new()
        .with_file("b.txt", "b")
        .with_file("keep.txt", "k");
    let (fx, mut snapshot) = connected(project).await;

    assert!(fx.runtime.remove("/b.txt"));
    let report = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();

    assert_eq!(report.removed_local, vec![rel("b.txt")]);
    fx.project.assert_file_not_exists("b.txt");
    fx.project.assert_file_exists("keep.txt");
    assert_eq!(snapshot.fingerprint(&rel("b.txt")), None);
    assert_eq!(snapshot.timestamp(&rel("b.txt")), None);
}

#[tokio::test]
async fn local_deletion_is_not_propagated() {
    let (fx, mut snapshot) = connected(TestProject::new().with_file("b.txt", "b")).await;

    fx.project.remove("b.txt");
    let report = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();

    assert!(report.is_quiet());
    assert_eq!(fx.runtime.file("/b.txt").unwrap(), b"b");
}

#[tokio::test]
async fn unreadable_vfs_directory_does_not_delete_local_files() {
    let project = TestProject::new()
        .with_file("src/a.php", "a")
        .with_file("src/lib/b.php", "b")
        .with_file("top.txt", "t");
    let (fx, mut snapshot) = connected(project).await;

    fx.vfs.deny_listing("/src");
    let report = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap();

    assert!(report.removed_local.is_empty());
    fx.project.assert_file_exists("src/a.php");
    fx.project.assert_file_exists("src/lib/b.php");
    assert_eq!(fx.local.removal_count(), 0);
}

#[tokio::test]
async fn single_unreadable_file_is_skipped_not_fatal() {
    let project = TestProject::new()
        .with_file("a.txt", "a")
        .with_file("b.txt", "b");
    let (fx, mut snapshot) = connected(project).await;

    fx.project.edit("a.txt", "a2");
    fx.project.edit("b.txt", "b2");
    fx.local.fail_reads_of(rel("a.txt"));
    let report = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap();

    assert_eq!(report.written_vfs, vec![rel("b.txt")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, rel("a.txt"));
    assert_eq!(fx.runtime.file("/a.txt").unwrap(), b"a");
    assert_eq!(fx.runtime.file("/b.txt").unwrap(), b"b2");
}

#[tokio::test]
async fn revoked_permission_is_fatal_in_both_directions() {
    let (fx, mut snapshot) = connected(TestProject::new().with_file("a.txt", "a")).await;
    fx.runtime.put("/a.txt", "changed");
    fx.local.revoke();

    let err = fx.engine.sync_vfs_to_local(&mut snapshot).await.unwrap_err();
    assert!(err.is_fatal(), "{err}");

    let err = fx.engine.sync_local_to_vfs(&mut snapshot).await.unwrap_err();
    assert!(err.is_fatal(), "{err}");
}

#[tokio::test]
async fn initial_merge_aborts_on_revoked_permission() {
    let fx = fixture(TestProject::new().with_file("a.txt", "a"));
    fx.local.revoke();

    let mut snapshot = SyncSnapshot::new();
    let err = fx
        .engine
        .initial_reconcile(&mut snapshot, |_| {})
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(fx.runtime.file("/a.txt"), None);
}

#[tokio::test]
async fn initial_merge_aborts_on_read_failure() {
    let fx = fixture(
        TestProject::new()
            .with_file("a.txt", "a")
            .with_file("b.txt", "b"),
    );
    fx.local.fail_reads_of(rel("b.txt"));

    let mut snapshot = SyncSnapshot::new();
    let err = fx
        .engine
        .initial_reconcile(&mut snapshot, |_| {})
        .await
        .unwrap_err();

    assert!(!err.is_fatal());
    assert!(matches!(err, sync_core::Error::ReadFailure { .. }));
}
