use crate::common::{cancel, Fixture};
use fs_warden::engine::ReadMode;

#[tokio::test]
async fn targeted_edit_end_to_end() {
    let fixture = Fixture::new();
    let path = fixture.write_file("t.txt", "hello world\n");
    let raw = fixture.raw("t.txt");

    let result = fixture
        .engine
        .edit_file(&raw, "world", "there", false, &cancel())
        .await
        .expect("edit succeeds");
    assert!(result.success);
    assert_eq!(result.replacement_count, 1);
    assert_eq!(fixture.read(&path), "hello there\n");

    // A follow-up read observes the new content (single-writer visibility).
    let read = fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("read");
    assert_eq!(read.content, "hello there\n");
}

#[tokio::test]
async fn analyze_edit_agrees_with_edit_on_replacement_count() {
    let fixture = Fixture::new();
    fixture.write_file("agree.txt", "x y x y x\n");
    let raw = fixture.raw("agree.txt");

    let analysis = fixture.engine.analyze_edit(&raw, "x", "z").await.expect("analyze");
    let edit = fixture
        .engine
        .edit_file(&raw, "x", "z", false, &cancel())
        .await
        .expect("edit succeeds");
    assert_eq!(analysis.impact.occurrences, edit.replacement_count);
    assert_eq!(edit.replacement_count, 3);
}

#[tokio::test]
async fn risky_edit_reports_and_preserves_the_file() {
    let fixture = Fixture::new();
    let content = format!("{}{}", "a".repeat(50), "\n".repeat(50));
    let path = fixture.write_file("risky.txt", &content);
    let raw = fixture.raw("risky.txt");

    let err = fixture
        .engine
        .edit_file(&raw, "a", "bb", false, &cancel())
        .await
        .expect_err("risk gate refuses");
    let doc = err.to_document();
    assert_eq!(doc["kind"], "validation_error");
    assert_eq!(doc["impact"]["occurrences"], 50);
    assert!(doc["impact"]["is_risky"].as_bool().expect("flag present"));
    assert_eq!(fixture.read(&path), content);

    // Force flips the outcome; the backup still happens.
    let forced = fixture
        .engine
        .edit_file(&raw, "a", "bb", true, &cancel())
        .await
        .expect("forced edit succeeds");
    assert_eq!(forced.replacement_count, 50);
    assert!(forced.backup_id.is_some());
    assert_eq!(std::fs::metadata(&path).expect("stat").len(), 150);
}

#[tokio::test]
async fn external_drift_fails_even_with_a_warm_cache() {
    let fixture = Fixture::new();
    let path = fixture.write_file("drifting.txt", "config = old\nend\n");
    let raw = fixture.raw("drifting.txt");

    // Warm the cache with the original state.
    fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("warm read");

    // An external process rewrites the file behind the server's back.
    std::fs::write(&path, "config = new\nend\n").expect("external write");

    let err = fixture
        .engine
        .edit_file(&raw, "config = old\nend", "config = patched\nend", false, &cancel())
        .await
        .expect_err("stale edit fails");
    assert_eq!(err.kind(), "edit_error");
    assert_eq!(fixture.read(&path), "config = new\nend\n");
}

#[tokio::test]
async fn cache_bypass_retry_saves_a_valid_edit() {
    let fixture = Fixture::new();
    let path = fixture.write_file("bypass.txt", "value = 1\nother settings stay\n");
    let raw = fixture.raw("bypass.txt");

    fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("warm read");
    // External change the cached copy does not reflect; the requested edit
    // is valid against the *disk* state.
    std::fs::write(&path, "value = 2\nother settings stay\n").expect("external write");

    let result = fixture
        .engine
        .edit_file(&raw, "value = 2", "value = 3", false, &cancel())
        .await
        .expect("edit succeeds after cache bypass");
    assert_eq!(result.replacement_count, 1);
    assert_eq!(fixture.read(&path), "value = 3\nother settings stay\n");
}

#[tokio::test]
async fn replace_nth_matches_the_disk_state_not_the_cache() {
    let fixture = Fixture::new();
    let path = fixture.write_file("nth_bypass.txt", "status = pending\nother settings stay\n");
    let raw = fixture.raw("nth_bypass.txt");

    fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("warm read");
    // External rewrite the cached copy does not reflect; the pattern only
    // exists in the disk state.
    std::fs::write(&path, "status = active\nother settings stay\n").expect("external write");

    let result = fixture
        .engine
        .replace_nth_occurrence(&raw, "active", "done", 1, false, false, &cancel())
        .await
        .expect("replacement matches the disk state");
    assert_eq!(result.replacement_count, 1);
    assert_eq!(fixture.read(&path), "status = done\nother settings stay\n");
}

#[tokio::test]
async fn replace_last_occurrence_with_zero_matches_fails() {
    let fixture = Fixture::new();
    fixture.write_file("zero.txt", "no matches here\n");

    let err = fixture
        .engine
        .replace_nth_occurrence(
            &fixture.raw("zero.txt"),
            "missing",
            "x",
            -1,
            false,
            false,
            &cancel(),
        )
        .await
        .expect_err("nothing to replace");
    assert_eq!(err.kind(), "edit_error");
}

#[tokio::test]
async fn replace_nth_rejects_invalid_selectors() {
    let fixture = Fixture::new();
    fixture.write_file("sel.txt", "a b c\n");

    for bad in [0, -2] {
        let err = fixture
            .engine
            .replace_nth_occurrence(&fixture.raw("sel.txt"), "a", "x", bad, false, false, &cancel())
            .await
            .expect_err("invalid selector");
        assert_eq!(err.kind(), "validation_error");
    }
}

#[tokio::test]
async fn multi_edit_is_one_mutation() {
    let fixture = Fixture::new();
    let path = fixture.write_file("combo.txt", "alpha beta gamma\n");
    let raw = fixture.raw("combo.txt");

    let edits = vec![
        fs_warden::edit::Replacement { old_text: "alpha".into(), new_text: "A".into() },
        fs_warden::edit::Replacement { old_text: "gamma".into(), new_text: "G".into() },
    ];
    let result = fixture
        .engine
        .multi_edit(&raw, &edits, false, &cancel())
        .await
        .expect("multi edit succeeds");
    assert_eq!(result.replacement_count, 2);
    assert_eq!(fixture.read(&path), "A beta G\n");

    let backups = fixture.engine.list_backups(None, None, None, None).await.expect("list");
    assert_eq!(backups.len(), 1);
}

#[tokio::test]
async fn over_limit_files_refuse_edits() {
    // Shrink every boundary so the test file counts as over-limit.
    let fixture = Fixture::with_config_tweak(|config| {
        config.sizing.small_max_bytes = 1;
        config.sizing.medium_max_bytes = 2;
        config.sizing.large_max_bytes = 4;
        config.sizing.very_large_max_bytes = 8;
    });
    fixture.write_file("big.txt", "0123456789abcdef");

    let err = fixture
        .engine
        .edit_file(&fixture.raw("big.txt"), "0123", "x", false, &cancel())
        .await
        .expect_err("over-limit edit refused");
    assert_eq!(err.kind(), "validation_error");

    // Reads still work through the chunked route.
    let read = fixture
        .engine
        .read_file(&fixture.raw("big.txt"), None, ReadMode::All, &cancel())
        .await
        .expect("read still allowed");
    assert_eq!(read.content, "0123456789abcdef");
}

#[tokio::test]
async fn telemetry_counts_edit_classes() {
    let fixture = Fixture::new();
    fixture.write_file("tele.txt", "aaa bbb ccc\n");
    let raw = fixture.raw("tele.txt");

    fixture.engine.edit_file(&raw, "aaa", "x", false, &cancel()).await.expect("targeted edit");
    let big_replacement = "y".repeat(1500);
    fixture
        .engine
        .edit_file(&raw, "bbb", &big_replacement, true, &cancel())
        .await
        .expect("full rewrite edit");

    let summary = fixture.engine.telemetry_summary();
    assert_eq!(summary.edits.targeted, 1);
    assert_eq!(summary.edits.full_rewrite, 1);
    assert_eq!(summary.edits.total_edits, 2);
    assert!(summary.edits.average_bytes_per_edit > 0.0);
}
