use crate::common::{cancel, Fixture};
use fs_warden::engine::ReadMode;

#[tokio::test]
async fn write_then_read_round_trips() {
    let fixture = Fixture::new();
    let raw = fixture.raw("round.txt");

    fixture.engine.write_file(&raw, "alpha\nbeta\ngamma\n", &cancel()).await.expect("write");
    let content = fixture
        .engine
        .read_file(&raw, None, ReadMode::All, &cancel())
        .await
        .expect("read");
    assert_eq!(content.content, "alpha\nbeta\ngamma\n");
    assert_eq!(content.total_lines, 3);
    assert!(!content.truncated);
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let fixture = Fixture::new();
    let raw = fixture.raw("cached.txt");
    fixture.engine.write_file(&raw, "cache me\n", &cancel()).await.expect("write");

    let first = fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("read");
    let second =
        fixture.engine.read_file(&raw, None, ReadMode::All, &cancel()).await.expect("read");
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.content, "cache me\n");
}

#[tokio::test]
async fn head_and_tail_modes_select_lines() {
    let fixture = Fixture::new();
    let raw = fixture.raw("modes.txt");
    fixture
        .engine
        .write_file(&raw, "one\ntwo\nthree\nfour\nfive\n", &cancel())
        .await
        .expect("write");

    let head = fixture
        .engine
        .read_file(&raw, Some(2), ReadMode::Head, &cancel())
        .await
        .expect("head read");
    assert_eq!(head.content, "one\ntwo");
    assert!(head.truncated);

    let tail = fixture
        .engine
        .read_file(&raw, Some(2), ReadMode::Tail, &cancel())
        .await
        .expect("tail read");
    assert_eq!(tail.content, "four\nfive");
    assert_eq!(tail.returned_lines, 2);
}

#[tokio::test]
async fn read_file_range_boundaries() {
    let fixture = Fixture::new();
    let raw = fixture.raw("range.txt");
    fixture.engine.write_file(&raw, "l1\nl2\nl3\n", &cancel()).await.expect("write");

    // start == end == 1 returns exactly the first line.
    let first = fixture.engine.read_file_range(&raw, 1, 1, &cancel()).await.expect("range read");
    assert_eq!(first.lines, vec!["l1"]);

    let err = fixture
        .engine
        .read_file_range(&raw, 3, 2, &cancel())
        .await
        .expect_err("end before start");
    assert_eq!(err.kind(), "validation_error");

    let err = fixture
        .engine
        .read_file_range(&raw, 0, 2, &cancel())
        .await
        .expect_err("zero start is invalid");
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn chunked_read_honors_offset_and_reports_eof() {
    let fixture = Fixture::new();
    let raw = fixture.raw("chunk.bin");
    fixture.engine.write_file(&raw, "0123456789", &cancel()).await.expect("write");

    let middle = fixture
        .engine
        .chunked_read_file(&raw, 2, Some(4), &cancel())
        .await
        .expect("chunk read");
    assert_eq!(middle.content, "2345");
    assert!(!middle.eof);

    let tail = fixture
        .engine
        .chunked_read_file(&raw, 8, Some(16), &cancel())
        .await
        .expect("tail read");
    assert_eq!(tail.content, "89");
    assert!(tail.eof);
}

#[tokio::test]
async fn get_file_info_reports_size_and_class() {
    let fixture = Fixture::new();
    let raw = fixture.raw("info.txt");
    fixture.engine.write_file(&raw, "abcdef", &cancel()).await.expect("write");

    let info = fixture.engine.get_file_info(&raw).await.expect("info");
    assert_eq!(info.size, 6);
    assert!(info.is_file);
    assert!(!info.is_dir);
    assert!(!info.readonly);
}

#[tokio::test]
async fn missing_file_is_a_path_error() {
    let fixture = Fixture::new();
    let err = fixture
        .engine
        .read_file(&fixture.raw("ghost.txt"), None, ReadMode::All, &cancel())
        .await
        .expect_err("missing file");
    assert_eq!(err.kind(), "path_error");
}

#[tokio::test]
async fn streaming_write_matches_content_exactly() {
    let fixture = Fixture::new();
    let raw = fixture.raw("streamed.txt");
    let payload = "line\n".repeat(100_000);

    let result =
        fixture.engine.streaming_write_file(&raw, &payload, &cancel()).await.expect("write");
    assert_eq!(result.bytes_written, payload.len() as u64);
    assert_eq!(std::fs::metadata(fixture.path("streamed.txt")).expect("stat").len(),
        payload.len() as u64);
}
