//! Scoped facade behavior: grants enforced before the filesystem is
//! touched.

use std::sync::{Arc, Mutex};

use nestfs::testing::new_fs;
use nestfs::{ChangeEvent, WatchCallback};
use warden::{AccessMode, Error, Grant, PermissionChecker, ScopedFs};

async fn documents_editor() -> (ScopedFs, nestfs::Fs) {
    let fs = new_fs().await;
    let checker = Arc::new(PermissionChecker::new());
    checker
        .register_caller(
            "editor",
            vec![Grant::readwrite("/Users/default/Documents")],
            vec!["clipboard".into()],
        )
        .unwrap();
    (ScopedFs::new(fs.clone(), checker, "editor"), fs)
}

fn collector() -> (Arc<Mutex<Vec<ChangeEvent>>>, WatchCallback) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: WatchCallback = Arc::new(move |event: &ChangeEvent| {
        sink.lock().expect("collector poisoned").push(event.clone());
    });
    (events, callback)
}

#[tokio::test]
async fn test_in_scope_operations_pass_through() {
    let (scoped, _fs) = documents_editor().await;

    scoped
        .write_text_file("/Users/default/Documents/a.txt", "hello")
        .await
        .unwrap();
    assert_eq!(
        scoped
            .read_text_file("/Users/default/Documents/a.txt")
            .await
            .unwrap(),
        "hello"
    );

    scoped.mkdir("/Users/default/Documents/work").await.unwrap();
    let names: Vec<String> = scoped
        .readdir("/Users/default/Documents")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a.txt", "work"]);
}

#[tokio::test]
async fn test_out_of_scope_reads_are_denied() {
    let (scoped, _fs) = documents_editor().await;

    let err = scoped.readdir("/System").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Denied {
            mode: AccessMode::Read,
            ..
        }
    ));
    assert!(scoped.stat("/System").await.is_err());
    // Denied existence checks report false rather than erroring.
    assert!(!scoped.exists("/System").await);
}

#[tokio::test]
async fn test_denied_write_has_no_side_effects() {
    let (scoped, fs) = documents_editor().await;

    let (events, cb) = collector();
    fs.watch("/", cb).unwrap();

    let err = scoped.write_file("/System/evil.txt", b"x").await.unwrap_err();
    assert!(err.is_denied());

    // The underlying facade was never invoked: no node, no event.
    assert!(!fs.exists("/System/evil.txt").await);
    assert!(events.lock().expect("collector poisoned").is_empty());
}

#[tokio::test]
async fn test_rename_needs_write_on_both_endpoints() {
    let (scoped, fs) = documents_editor().await;
    fs.write_file("/Users/default/Documents/a.txt", b"1")
        .await
        .unwrap();

    let err = scoped
        .rename("/Users/default/Documents/a.txt", "/Users/default/a.txt")
        .await
        .unwrap_err();
    assert!(err.is_denied());

    scoped
        .rename(
            "/Users/default/Documents/a.txt",
            "/Users/default/Documents/b.txt",
        )
        .await
        .unwrap();
    assert!(fs.exists("/Users/default/Documents/b.txt").await);
}

#[tokio::test]
async fn test_copy_needs_read_source_and_write_dest() {
    let fs = new_fs().await;
    fs.write_file("/System/template.txt", b"tpl").await.unwrap();

    let checker = Arc::new(PermissionChecker::new());
    checker
        .register_caller(
            "installer",
            vec![
                Grant::read("/System"),
                Grant::write("/Users/default/Documents"),
            ],
            vec![],
        )
        .unwrap();
    let scoped = ScopedFs::new(fs.clone(), checker, "installer");

    scoped
        .copy("/System/template.txt", "/Users/default/Documents/copy.txt")
        .await
        .unwrap();
    assert_eq!(
        fs.read_file("/Users/default/Documents/copy.txt").await.unwrap(),
        b"tpl"
    );

    // Write-only destination grant does not allow copying out of it.
    let err = scoped
        .copy("/Users/default/Documents/copy.txt", "/Users/default/Documents/again.txt")
        .await
        .unwrap_err();
    assert!(err.is_denied());
}

#[tokio::test]
async fn test_watch_requires_read_on_prefix() {
    let (scoped, fs) = documents_editor().await;

    let (_, cb) = collector();
    assert!(scoped.watch("/System", cb).is_err());

    let (events, cb) = collector();
    scoped.watch("/Users/default/Documents", cb).unwrap();
    fs.write_file("/Users/default/Documents/seen.txt", b"1")
        .await
        .unwrap();
    assert_eq!(events.lock().expect("collector poisoned").len(), 1);
}

#[tokio::test]
async fn test_unregistered_caller_has_no_access() {
    let fs = new_fs().await;
    let checker = Arc::new(PermissionChecker::new());
    checker
        .register_caller("app", vec![Grant::readwrite("/Users/default")], vec![])
        .unwrap();
    let scoped = ScopedFs::new(fs, checker.clone(), "app");

    scoped
        .write_file("/Users/default/f.txt", b"1")
        .await
        .unwrap();

    checker.unregister_caller("app");
    assert!(scoped.read_file("/Users/default/f.txt").await.is_err());
    assert!(!scoped.exists("/Users/default/f.txt").await);
}

#[tokio::test]
async fn test_vfs_errors_keep_their_codes_through_the_wrapper() {
    let (scoped, _fs) = documents_editor().await;

    let err = scoped
        .read_file("/Users/default/Documents/missing.txt")
        .await
        .unwrap_err();
    match err {
        Error::Fs(inner) => assert_eq!(inner.code(), "ENOENT"),
        other => panic!("expected Fs error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_checks() {
    let (scoped, _fs) = documents_editor().await;

    assert!(scoped.can_use_service("clipboard"));
    scoped.require_service("clipboard").unwrap();

    assert!(!scoped.can_use_service("network"));
    assert!(matches!(
        scoped.require_service("network").unwrap_err(),
        Error::ServiceDenied { .. }
    ));
}
