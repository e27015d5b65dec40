use crate::common::{cancel, Fixture};
use fs_warden::engine::BatchOperation;

fn write_op(path: String, content: &str) -> BatchOperation {
    BatchOperation::WriteFile { path, content: content.to_owned() }
}

fn edit_op(path: String, old: &str, new: &str) -> BatchOperation {
    BatchOperation::EditFile {
        path,
        old_text: old.to_owned(),
        new_text: new.to_owned(),
    }
}

#[tokio::test]
async fn atomic_batch_applies_all_or_nothing() {
    let fixture = Fixture::new();
    fixture.write_file("c.txt", "no marker here\n");

    // The edit cannot match, so the whole batch must unwind.
    let ops = vec![
        write_op(fixture.raw("a.txt"), "A"),
        write_op(fixture.raw("b.txt"), "B"),
        edit_op(fixture.raw("c.txt"), "x", "y"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, true, true, false, false, &cancel())
        .await
        .expect("batch returns a result document");

    assert!(!result.success);
    assert!(result.error.is_some());
    assert!(result.rollback_errors.is_empty());
    // The writes were rolled back: the created files are gone.
    assert!(!fixture.path("a.txt").exists());
    assert!(!fixture.path("b.txt").exists());
    assert_eq!(fixture.read(&fixture.path("c.txt")), "no marker here\n");

    // One group record captured the pre-state of the affected paths.
    let backup_id = result.backup_id.expect("group backup taken");
    let record = fixture.engine.get_backup_info(&backup_id).await.expect("record");
    assert_eq!(record.operation_kind, "batch");
    assert_eq!(record.files.len(), 1); // only c.txt existed beforehand
}

#[tokio::test]
async fn atomic_batch_success_applies_everything() {
    let fixture = Fixture::new();
    fixture.write_file("base.txt", "counter = 0\nretries = 3\ntimeout = 30\nverbose = false\n");

    let ops = vec![
        write_op(fixture.raw("one.txt"), "1"),
        edit_op(fixture.raw("base.txt"), "counter = 0", "counter = 1"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, true, true, false, false, &cancel())
        .await
        .expect("batch succeeds");

    assert!(result.success);
    assert_eq!(result.completed, 2);
    assert_eq!(fixture.read(&fixture.path("one.txt")), "1");
    assert_eq!(
        fixture.read(&fixture.path("base.txt")),
        "counter = 1\nretries = 3\ntimeout = 30\nverbose = false\n"
    );
}

#[tokio::test]
async fn atomic_rollback_restores_prior_file_content() {
    let fixture = Fixture::new();
    fixture.write_file("k.txt", "keep me\n");
    fixture.write_file("c.txt", "stable\n");

    let ops = vec![
        write_op(fixture.raw("k.txt"), "overwritten"),
        edit_op(fixture.raw("c.txt"), "does not exist", "y"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, true, true, false, false, &cancel())
        .await
        .expect("batch returns a result document");

    assert!(!result.success);
    // The overwritten file is rolled back to its exact pre-state.
    assert_eq!(fixture.read(&fixture.path("k.txt")), "keep me\n");
}

#[tokio::test]
async fn non_atomic_batch_keeps_independent_results() {
    let fixture = Fixture::new();
    fixture.write_file("good.txt", "target\n");

    let ops = vec![
        edit_op(fixture.raw("good.txt"), "target", "hit"),
        edit_op(fixture.raw("good.txt"), "absent", "never"),
        write_op(fixture.raw("new.txt"), "fresh"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, false, true, false, false, &cancel())
        .await
        .expect("batch finishes");

    assert!(!result.success);
    assert_eq!(result.completed, 2);
    assert_eq!(result.outcomes.len(), 3);
    assert!(result.outcomes[0].ok);
    assert!(!result.outcomes[1].ok);
    assert!(result.outcomes[2].ok);
    // Successes stuck; only the failed sub-operation had no effect.
    assert_eq!(fixture.read(&fixture.path("good.txt")), "hit\n");
    assert_eq!(fixture.read(&fixture.path("new.txt")), "fresh");
}

#[tokio::test]
async fn validate_only_mode_mutates_nothing() {
    let fixture = Fixture::new();
    fixture.write_file("v.txt", "validate me\n");

    let ops = vec![
        edit_op(fixture.raw("v.txt"), "validate", "checked"),
        write_op(fixture.raw("w.txt"), "would be created"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, false, true, true, false, &cancel())
        .await
        .expect("validation runs");

    assert!(result.validate_only);
    assert!(result.success);
    assert!(result.max_risk.is_some());
    assert_eq!(fixture.read(&fixture.path("v.txt")), "validate me\n");
    assert!(!fixture.path("w.txt").exists());
    assert!(result.backup_id.is_none());
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
    let fixture = Fixture::new();
    let err = fixture
        .engine
        .batch_operations(&[], true, true, false, false, &cancel())
        .await
        .expect_err("nothing to do");
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn batch_delete_is_rolled_back_with_the_group() {
    let fixture = Fixture::new();
    fixture.write_file("victim.txt", "bytes to keep\n");
    fixture.write_file("c.txt", "anchor\n");

    let ops = vec![
        BatchOperation::DeleteFile { path: fixture.raw("victim.txt") },
        edit_op(fixture.raw("c.txt"), "missing", "y"),
    ];
    let result = fixture
        .engine
        .batch_operations(&ops, true, true, false, false, &cancel())
        .await
        .expect("batch returns a result document");

    assert!(!result.success);
    // The deleted file came back from the group backup.
    assert_eq!(fixture.read(&fixture.path("victim.txt")), "bytes to keep\n");
}
