use crate::common::{cancel, Fixture};
use fs_warden::engine::ReadMode;

#[tokio::test]
async fn paths_outside_the_roots_are_denied_for_every_operation() {
    let fixture = Fixture::new();
    let outside = tempfile::TempDir::new().expect("create outside dir");
    let secret = outside.path().join("secret.txt");
    std::fs::write(&secret, "classified").expect("seed outside file");
    let raw = secret.to_string_lossy().into_owned();

    let read_err = fixture
        .engine
        .read_file(&raw, None, ReadMode::All, &cancel())
        .await
        .expect_err("read denied");
    assert_eq!(read_err.kind(), "path_error");

    let write_err = fixture
        .engine
        .write_file(&raw, "overwrite", &cancel())
        .await
        .expect_err("write denied");
    assert_eq!(write_err.kind(), "path_error");

    let delete_err = fixture
        .engine
        .delete_file(&raw, true, &cancel())
        .await
        .expect_err("delete denied");
    assert_eq!(delete_err.kind(), "path_error");

    let info_err = fixture.engine.get_file_info(&raw).await.expect_err("stat denied");
    assert_eq!(info_err.kind(), "path_error");

    // Nothing moved: the denied operations had no side effects.
    assert_eq!(std::fs::read_to_string(&secret).expect("unchanged"), "classified");
}

#[tokio::test]
async fn batch_with_one_denied_path_does_nothing() {
    let fixture = Fixture::new();
    let outside = tempfile::TempDir::new().expect("create outside dir");
    let ops = vec![
        fs_warden::engine::BatchOperation::WriteFile {
            path: fixture.raw("inside.txt"),
            content: "in".to_owned(),
        },
        fs_warden::engine::BatchOperation::WriteFile {
            path: outside.path().join("out.txt").to_string_lossy().into_owned(),
            content: "out".to_owned(),
        },
    ];

    let err = fixture
        .engine
        .batch_operations(&ops, true, true, false, false, &cancel())
        .await
        .expect_err("denied before any side effect");
    assert_eq!(err.kind(), "path_error");
    assert!(!fixture.path("inside.txt").exists());
    assert!(!outside.path().join("out.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escape_is_denied_at_the_gate() {
    let fixture = Fixture::new();
    let outside = tempfile::TempDir::new().expect("create outside dir");
    std::fs::write(outside.path().join("target.txt"), "outside bytes").expect("seed");
    std::os::unix::fs::symlink(outside.path(), fixture.path("link")).expect("create symlink");

    let err = fixture
        .engine
        .read_file(&fixture.raw("link/target.txt"), None, ReadMode::All, &cancel())
        .await
        .expect_err("escape denied");
    assert_eq!(err.kind(), "path_error");
}

#[tokio::test]
async fn unrestricted_engine_accepts_any_path() {
    let fixture = Fixture::with_config_tweak(|config| {
        config.allowed_paths.clear();
    });
    let anywhere = tempfile::TempDir::new().expect("create dir");
    let raw = anywhere.path().join("free.txt").to_string_lossy().into_owned();

    fixture.engine.write_file(&raw, "no policy", &cancel()).await.expect("write allowed");
    let read =
        fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("read");
    assert_eq!(read.content, "no policy");
}
