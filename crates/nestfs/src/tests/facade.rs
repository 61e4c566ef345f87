use crate::testing::new_fs;

#[tokio::test]
async fn test_write_read_round_trip() {
    let fs = new_fs().await;

    fs.write_file("/Users/default/Documents/a.txt", b"hello")
        .await
        .unwrap();
    let content = fs.read_file("/Users/default/Documents/a.txt").await.unwrap();

    assert_eq!(content, b"hello");
}

#[tokio::test]
async fn test_text_round_trip() {
    let fs = new_fs().await;

    fs.write_text_file("/note.txt", "text payload").await.unwrap();
    assert_eq!(fs.read_text_file("/note.txt").await.unwrap(), "text payload");
}

#[tokio::test]
async fn test_read_rejects_bad_utf8() {
    let fs = new_fs().await;

    fs.write_file("/blob", &[0xff, 0xfe, 0x01]).await.unwrap();
    assert_eq!(
        fs.read_text_file("/blob").await.unwrap_err().code(),
        "EINVAL"
    );
}

#[tokio::test]
async fn test_initial_skeleton_is_seeded() {
    let fs = new_fs().await;

    for path in [
        "/System",
        "/Applications",
        "/Users/default/Desktop",
        "/Users/default/Documents",
    ] {
        assert!(fs.exists(path).await, "missing seeded path {}", path);
        assert!(fs.stat(path).await.unwrap().is_directory);
    }
}

#[tokio::test]
async fn test_mkdir_is_unique_and_failure_changes_nothing() {
    let fs = new_fs().await;

    fs.mkdir("/a/b").await.unwrap();
    let before = fs.readdir("/a").await.unwrap();

    let err = fs.mkdir("/a/b").await.unwrap_err();
    assert_eq!(err.code(), "EEXIST");
    assert_eq!(fs.readdir("/a").await.unwrap(), before);
}

#[tokio::test]
async fn test_mkdir_creates_missing_parents() {
    let fs = new_fs().await;

    fs.mkdir("/deep/nested/dir").await.unwrap();

    assert!(fs.stat("/deep").await.unwrap().is_directory);
    assert!(fs.stat("/deep/nested").await.unwrap().is_directory);
    assert!(fs.stat("/deep/nested/dir").await.unwrap().is_directory);
}

#[tokio::test]
async fn test_mkdir_over_file_fails() {
    let fs = new_fs().await;

    fs.write_file("/f.txt", b"1").await.unwrap();
    assert_eq!(fs.mkdir("/f.txt").await.unwrap_err().code(), "EEXIST");
    assert_eq!(fs.mkdir("/f.txt/sub").await.unwrap_err().code(), "ENOTDIR");
}

#[tokio::test]
async fn test_readdir_is_sorted_by_name() {
    let fs = new_fs().await;

    fs.mkdir("/dir").await.unwrap();
    fs.write_file("/dir/zebra", b"z").await.unwrap();
    fs.write_file("/dir/apple", b"a").await.unwrap();
    fs.mkdir("/dir/middle").await.unwrap();

    let names: Vec<String> = fs
        .readdir("/dir")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["apple", "middle", "zebra"]);
}

#[tokio::test]
async fn test_readdir_failures() {
    let fs = new_fs().await;

    fs.write_file("/f.txt", b"1").await.unwrap();
    assert_eq!(fs.readdir("/missing").await.unwrap_err().code(), "ENOENT");
    assert_eq!(fs.readdir("/f.txt").await.unwrap_err().code(), "ENOTDIR");
}

#[tokio::test]
async fn test_delete_is_not_recursive() {
    let fs = new_fs().await;

    fs.mkdir("/x").await.unwrap();
    fs.write_file("/x/f.txt", b"1").await.unwrap();

    assert_eq!(fs.rmdir("/x").await.unwrap_err().code(), "ENOTEMPTY");

    fs.delete_file("/x/f.txt").await.unwrap();
    fs.rmdir("/x").await.unwrap();
    assert!(!fs.exists("/x").await);
}

#[tokio::test]
async fn test_delete_file_type_errors() {
    let fs = new_fs().await;

    fs.mkdir("/d").await.unwrap();
    assert_eq!(fs.delete_file("/d").await.unwrap_err().code(), "EISDIR");
    assert_eq!(fs.delete_file("/gone").await.unwrap_err().code(), "ENOENT");
    assert_eq!(fs.rmdir("/System2").await.unwrap_err().code(), "ENOENT");
}

#[tokio::test]
async fn test_read_type_errors() {
    let fs = new_fs().await;

    fs.mkdir("/d").await.unwrap();
    fs.write_file("/plain.txt", b"1").await.unwrap();

    assert_eq!(fs.read_file("/d").await.unwrap_err().code(), "EISDIR");
    assert_eq!(fs.read_file("/gone").await.unwrap_err().code(), "ENOENT");
    // A file in a non-terminal position breaks the walk.
    assert_eq!(
        fs.read_file("/plain.txt/inner").await.unwrap_err().code(),
        "ENOTDIR"
    );
}

#[tokio::test]
async fn test_write_over_directory_fails() {
    let fs = new_fs().await;

    fs.mkdir("/d").await.unwrap();
    assert_eq!(fs.write_file("/d", b"1").await.unwrap_err().code(), "EISDIR");
    assert_eq!(fs.write_file("/", b"1").await.unwrap_err().code(), "EISDIR");
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let fs = new_fs().await;

    fs.write_file("/f.txt", b"first").await.unwrap();
    fs.write_file("/f.txt", b"second, longer").await.unwrap();

    assert_eq!(fs.read_file("/f.txt").await.unwrap(), b"second, longer");
    assert_eq!(fs.stat("/f.txt").await.unwrap().size, 14);
}

#[tokio::test]
async fn test_rename_rewrites_descendant_paths() {
    let fs = new_fs().await;

    fs.mkdir("/a").await.unwrap();
    fs.mkdir("/a/b").await.unwrap();
    fs.write_file("/a/b/f.txt", b"1").await.unwrap();

    fs.rename("/a", "/z").await.unwrap();

    assert_eq!(fs.read_file("/z/b/f.txt").await.unwrap(), b"1");
    assert_eq!(fs.stat("/z/b/f.txt").await.unwrap().path, "/z/b/f.txt");
    assert!(!fs.exists("/a").await);
}

#[tokio::test]
async fn test_rename_preconditions() {
    let fs = new_fs().await;

    fs.write_file("/src.txt", b"1").await.unwrap();
    fs.write_file("/taken.txt", b"2").await.unwrap();
    fs.mkdir("/dir").await.unwrap();

    assert_eq!(
        fs.rename("/gone", "/dest").await.unwrap_err().code(),
        "ENOENT"
    );
    // Destination parents are not auto-created.
    assert_eq!(
        fs.rename("/src.txt", "/nodir/dest").await.unwrap_err().code(),
        "ENOENT"
    );
    assert_eq!(
        fs.rename("/src.txt", "/taken.txt").await.unwrap_err().code(),
        "EEXIST"
    );
    assert_eq!(fs.rename("/", "/r").await.unwrap_err().code(), "EINVAL");
    assert_eq!(
        fs.rename("/dir", "/dir/inside").await.unwrap_err().code(),
        "EINVAL"
    );

    // The failed renames changed nothing.
    assert_eq!(fs.read_file("/src.txt").await.unwrap(), b"1");
    assert_eq!(fs.read_file("/taken.txt").await.unwrap(), b"2");
}

#[tokio::test]
async fn test_copy_is_a_value_copy() {
    let fs = new_fs().await;

    fs.write_file("/s.txt", b"orig").await.unwrap();
    fs.copy("/s.txt", "/d.txt").await.unwrap();
    fs.write_file("/d.txt", b"changed").await.unwrap();

    assert_eq!(fs.read_file("/s.txt").await.unwrap(), b"orig");
    assert_eq!(fs.read_file("/d.txt").await.unwrap(), b"changed");
}

#[tokio::test]
async fn test_copy_directory_is_deep() {
    let fs = new_fs().await;

    fs.mkdir("/src/sub").await.unwrap();
    fs.write_file("/src/top.txt", b"top").await.unwrap();
    fs.write_file("/src/sub/deep.txt", b"deep").await.unwrap();

    fs.copy("/src", "/dup").await.unwrap();

    assert_eq!(fs.read_file("/dup/top.txt").await.unwrap(), b"top");
    assert_eq!(fs.read_file("/dup/sub/deep.txt").await.unwrap(), b"deep");

    // The copies are independent of the originals.
    fs.write_file("/dup/sub/deep.txt", b"changed").await.unwrap();
    assert_eq!(fs.read_file("/src/sub/deep.txt").await.unwrap(), b"deep");
}

#[tokio::test]
async fn test_copy_preconditions() {
    let fs = new_fs().await;

    fs.mkdir("/dir").await.unwrap();
    fs.write_file("/f.txt", b"1").await.unwrap();

    assert_eq!(fs.copy("/gone", "/d").await.unwrap_err().code(), "ENOENT");
    assert_eq!(fs.copy("/f.txt", "/dir").await.unwrap_err().code(), "EEXIST");
    assert_eq!(
        fs.copy("/f.txt", "/nodir/d").await.unwrap_err().code(),
        "ENOENT"
    );
    assert_eq!(
        fs.copy("/dir", "/dir/inner").await.unwrap_err().code(),
        "EINVAL"
    );
}

#[tokio::test]
async fn test_stat_reports_metadata() {
    let fs = new_fs().await;

    fs.write_file("/doc.txt", b"12345").await.unwrap();
    let stat = fs.stat("/doc.txt").await.unwrap();

    assert_eq!(stat.path, "/doc.txt");
    assert_eq!(stat.name, "doc.txt");
    assert!(!stat.is_directory);
    assert_eq!(stat.size, 5);
    assert_eq!(stat.mime_type.as_deref(), Some("text/plain"));
    assert!(stat.updated_at >= stat.created_at);

    let root = fs.stat("/").await.unwrap();
    assert!(root.is_directory);
    assert_eq!(root.path, "/");
}

#[tokio::test]
async fn test_exists_never_errors() {
    let fs = new_fs().await;

    assert!(fs.exists("/System").await);
    assert!(!fs.exists("/nope").await);
    assert!(!fs.exists("relative").await);
    assert!(!fs.exists("/a/../b").await);
}

#[tokio::test]
async fn test_paths_are_normalized() {
    let fs = new_fs().await;

    fs.mkdir("/a//b/").await.unwrap();
    assert!(fs.exists("/a/b").await);
    assert_eq!(fs.stat("//a//b").await.unwrap().path, "/a/b");

    assert_eq!(fs.mkdir("x/y").await.unwrap_err().code(), "EINVAL");
    assert_eq!(fs.stat("/a/./b").await.unwrap_err().code(), "EINVAL");
}
