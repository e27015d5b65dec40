use crate::common::{cancel, Fixture};
use fs_warden::engine::ReadMode;

#[tokio::test]
async fn edit_backup_restore_round_trip() {
    let fixture = Fixture::new();
    let raw = fixture.raw("x.txt");

    fixture.engine.write_file(&raw, "version: v1\n", &cancel()).await.expect("write v1");
    let edit = fixture
        .engine
        .edit_file(&raw, "v1", "v2", false, &cancel())
        .await
        .expect("edit to v2");
    let backup_id = edit.backup_id.expect("edit produced a backup");
    assert_eq!(fixture.read(&fixture.path("x.txt")), "version: v2\n");

    let restore = fixture
        .engine
        .restore_backup(&backup_id, Some(&raw), false)
        .await
        .expect("restore succeeds");
    assert_eq!(fixture.read(&fixture.path("x.txt")), "version: v1\n");

    // The restore itself snapshotted the v2 state first.
    let safety_id = restore.safety_backup_id.expect("safety backup taken");
    let safety = fixture.engine.get_backup_info(&safety_id).await.expect("safety record");
    assert_eq!(safety.operation_kind, "restore");

    // And a subsequent read observes the restored bytes.
    let read = fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("read");
    assert_eq!(read.content, "version: v1\n");
}

#[tokio::test]
async fn backup_bytes_match_pre_mutation_state() {
    let fixture = Fixture::new();
    let raw = fixture.raw("pre.txt");
    fixture.engine.write_file(&raw, "the original bytes\n", &cancel()).await.expect("write");
    let edit = fixture
        .engine
        .edit_file(&raw, "original", "mutated", false, &cancel())
        .await
        .expect("edit");
    let backup_id = edit.backup_id.expect("backup id");

    let record = fixture.engine.get_backup_info(&backup_id).await.expect("record");
    assert_eq!(record.files.len(), 1);
    assert_eq!(record.operation_kind, "edit");

    // compare_with_backup shows the divergence after the edit...
    let diff = fixture
        .engine
        .compare_with_backup(&backup_id, &raw)
        .await
        .expect("compare");
    assert!(!diff.identical);

    // ...and an empty diff exactly when the file is restored byte-for-byte.
    fixture.engine.restore_backup(&backup_id, None, false).await.expect("restore");
    let diff = fixture
        .engine
        .compare_with_backup(&backup_id, &raw)
        .await
        .expect("compare after restore");
    assert!(diff.identical);
    assert_eq!(diff.changed_lines, 0);
}

#[tokio::test]
async fn malformed_backup_ids_are_rejected_without_filesystem_access() {
    let fixture = Fixture::new();
    for bad in ["../../etc/passwd", "20250101-120000-bad/../id", "junk", ""] {
        let err = fixture.engine.get_backup_info(bad).await.expect_err("rejected");
        assert_eq!(err.kind(), "validation_error", "accepted {bad:?}");

        let err = fixture
            .engine
            .restore_backup(bad, None, false)
            .await
            .expect_err("rejected");
        assert_eq!(err.kind(), "validation_error");
    }
}

#[tokio::test]
async fn list_backups_filters_by_operation() {
    let fixture = Fixture::new();
    let raw = fixture.raw("f.txt");
    fixture.engine.write_file(&raw, "alpha beta gamma\n", &cancel()).await.expect("write");
    fixture.engine.edit_file(&raw, "alpha", "omega", false, &cancel()).await.expect("edit");
    fixture.engine.delete_file(&raw, false, &cancel()).await.expect("delete");

    let edits = fixture
        .engine
        .list_backups(Some("edit".to_owned()), None, None, None)
        .await
        .expect("list edits");
    assert_eq!(edits.len(), 1);

    let deletes = fixture
        .engine
        .list_backups(Some("delete".to_owned()), None, None, None)
        .await
        .expect("list deletes");
    assert_eq!(deletes.len(), 1);

    let all = fixture.engine.list_backups(None, None, None, None).await.expect("list all");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn restore_preview_reports_diffs_without_writing() {
    let fixture = Fixture::new();
    let raw = fixture.raw("p.txt");
    fixture.engine.write_file(&raw, "before the dawn\n", &cancel()).await.expect("write");
    let edit =
        fixture.engine.edit_file(&raw, "before", "after", false, &cancel()).await.expect("edit");
    let backup_id = edit.backup_id.expect("backup id");

    let preview = fixture
        .engine
        .restore_backup(&backup_id, None, true)
        .await
        .expect("preview");
    assert!(preview.preview);
    assert!(preview.restored.is_empty());
    assert_eq!(preview.diffs.len(), 1);
    assert!(!preview.diffs[0].identical);
    assert_eq!(fixture.read(&fixture.path("p.txt")), "after the dawn\n");
}

#[tokio::test]
async fn cleanup_dry_run_then_sweep() {
    let fixture = Fixture::new();
    let raw = fixture.raw("c.txt");
    fixture.engine.write_file(&raw, "alpha beta gamma\n", &cancel()).await.expect("write");
    fixture.engine.edit_file(&raw, "alpha", "omega", false, &cancel()).await.expect("edit");

    let dry = fixture.engine.cleanup_backups(Some(0), true).await.expect("dry run");
    assert!(dry.dry_run);
    assert_eq!(dry.count, 1);
    assert_eq!(fixture.engine.list_backups(None, None, None, None).await.expect("list").len(), 1);

    let swept = fixture.engine.cleanup_backups(Some(0), false).await.expect("sweep");
    assert_eq!(swept.count, 1);
    assert!(fixture.engine.list_backups(None, None, None, None).await.expect("list").is_empty());
}

#[tokio::test]
async fn deleted_file_is_recoverable_from_its_backup() {
    let fixture = Fixture::new();
    let raw = fixture.raw("gone.txt");
    fixture.engine.write_file(&raw, "precious data\n", &cancel()).await.expect("write");

    let deleted = fixture.engine.delete_file(&raw, false, &cancel()).await.expect("delete");
    assert!(!fixture.path("gone.txt").exists());

    fixture
        .engine
        .restore_backup(&deleted.backup_id, None, false)
        .await
        .expect("restore from delete backup");
    assert_eq!(fixture.read(&fixture.path("gone.txt")), "precious data\n");
}
