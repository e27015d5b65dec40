use crate::common::{cancel, Fixture};

#[tokio::test]
async fn listing_is_rendered_sorted_and_cached() {
    let fixture = Fixture::new();
    fixture.write_file("b.txt", "2");
    fixture.write_file("a.txt", "1");
    std::fs::create_dir(fixture.path("sub")).expect("mkdir");

    let first = fixture.engine.list_directory(&fixture.raw("")).await.expect("list");
    assert!(!first.cached);
    let lines: Vec<&str> = first.listing.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("a.txt"));
    assert!(lines[1].ends_with("b.txt"));
    assert!(lines[2].starts_with('d'));

    let second = fixture.engine.list_directory(&fixture.raw("")).await.expect("list");
    assert!(second.cached);
    assert_eq!(second.listing, first.listing);
}

#[tokio::test]
async fn listing_cache_misses_after_external_change() {
    let fixture = Fixture::new();
    fixture.write_file("one.txt", "1");
    fixture.engine.list_directory(&fixture.raw("")).await.expect("warm listing");

    // Sleep past mtime granularity, then mutate the directory externally.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    fixture.write_file("two.txt", "2");

    let listing = fixture.engine.list_directory(&fixture.raw("")).await.expect("list");
    assert!(!listing.cached);
    assert!(listing.listing.contains("two.txt"));
}

#[tokio::test]
async fn create_directory_reports_idempotently() {
    let fixture = Fixture::new();
    let created = fixture
        .engine
        .create_directory(&fixture.raw("fresh/nested"))
        .await
        .expect("create");
    assert_eq!(created["created"], true);

    let again = fixture
        .engine
        .create_directory(&fixture.raw("fresh/nested"))
        .await
        .expect("create again");
    assert_eq!(again["created"], false);
}

#[tokio::test]
async fn rename_and_move_preserve_content() {
    let fixture = Fixture::new();
    fixture.write_file("old_name.txt", "payload\n");

    fixture
        .engine
        .rename_file(&fixture.raw("old_name.txt"), &fixture.raw("new_name.txt"), &cancel())
        .await
        .expect("rename");
    assert!(!fixture.path("old_name.txt").exists());
    assert_eq!(fixture.read(&fixture.path("new_name.txt")), "payload\n");

    std::fs::create_dir(fixture.path("moved")).expect("mkdir");
    let result = fixture
        .engine
        .move_file(&fixture.raw("new_name.txt"), &fixture.raw("moved/final.txt"), &cancel())
        .await
        .expect("move");
    assert!(result.backup_id.is_some());
    assert_eq!(fixture.read(&fixture.path("moved/final.txt")), "payload\n");
}

#[tokio::test]
async fn copy_backs_up_an_existing_destination() {
    let fixture = Fixture::new();
    fixture.write_file("src.txt", "new content");
    fixture.write_file("dst.txt", "old content");

    let result = fixture
        .engine
        .copy_file(&fixture.raw("src.txt"), &fixture.raw("dst.txt"), &cancel())
        .await
        .expect("copy");
    assert_eq!(fixture.read(&fixture.path("dst.txt")), "new content");

    // The destination's pre-state is in the backup.
    let backup_id = result.backup_id.expect("backup taken");
    let record = fixture.engine.get_backup_info(&backup_id).await.expect("record");
    assert_eq!(record.files.len(), 1);

    // Copying to a fresh destination takes no backup.
    let fresh = fixture
        .engine
        .copy_file(&fixture.raw("src.txt"), &fixture.raw("fresh.txt"), &cancel())
        .await
        .expect("copy to new path");
    assert!(fresh.backup_id.is_none());
}

#[tokio::test]
async fn directory_delete_requires_force() {
    let fixture = Fixture::new();
    std::fs::create_dir(fixture.path("tree")).expect("mkdir");
    fixture.write_file("tree/leaf.txt", "leaf");

    let err = fixture
        .engine
        .delete_file(&fixture.raw("tree"), false, &cancel())
        .await
        .expect_err("unforced directory delete");
    assert_eq!(err.kind(), "validation_error");
    assert!(fixture.path("tree/leaf.txt").exists());

    let deleted = fixture
        .engine
        .delete_file(&fixture.raw("tree"), true, &cancel())
        .await
        .expect("forced directory delete");
    assert!(deleted.was_directory);
    assert!(!fixture.path("tree").exists());
}

#[tokio::test]
async fn soft_delete_moves_into_the_trash() {
    let fixture = Fixture::new();
    fixture.write_file("junk.txt", "still recoverable\n");

    let result = fixture
        .engine
        .soft_delete_file(&fixture.raw("junk.txt"), &cancel())
        .await
        .expect("soft delete");
    assert!(!fixture.path("junk.txt").exists());
    assert!(result.trashed_to.contains(".trash"));
    let trashed = std::path::PathBuf::from(&result.trashed_to);
    assert_eq!(fixture.read(&trashed), "still recoverable\n");

    // Reversible: renaming back restores the file.
    std::fs::rename(&trashed, fixture.path("junk.txt")).expect("rename back");
    assert_eq!(fixture.read(&fixture.path("junk.txt")), "still recoverable\n");
}
