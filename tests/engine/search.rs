use crate::common::{cancel, Fixture};

#[tokio::test]
async fn advanced_search_walks_the_tree_with_coordinates() {
    let fixture = Fixture::new();
    fixture.write_file("src/one.rs", "fn main() {\n    needle();\n}\n");
    fixture.write_file("src/two.rs", "// no match\n");
    fixture.write_file("docs/notes.md", "the needle again: needle\n");

    let outcome = fixture
        .engine
        .advanced_text_search(
            &fixture.raw(""),
            "needle",
            true,
            false,
            false,
            0,
            &cancel(),
        )
        .await
        .expect("search succeeds");

    assert_eq!(outcome.matches.len(), 3);
    let in_rs = outcome
        .matches
        .iter()
        .find(|m| m.file.ends_with("one.rs"))
        .expect("match in one.rs");
    assert_eq!(in_rs.line_number, 2);
    assert_eq!(in_rs.match_start, 4);
    assert_eq!(in_rs.match_end, 10);
}

#[tokio::test]
async fn advanced_search_context_and_whole_word() {
    let fixture = Fixture::new();
    fixture.write_file("ctx.txt", "before\nthe word here\nafter\nwordy stuff\n");

    let outcome = fixture
        .engine
        .advanced_text_search(&fixture.raw("ctx.txt"), "word", true, true, true, 1, &cancel())
        .await
        .expect("search succeeds");

    // `wordy` is excluded by whole-word matching.
    assert_eq!(outcome.matches.len(), 1);
    let hit = &outcome.matches[0];
    assert_eq!(hit.line_number, 2);
    assert_eq!(
        hit.context_lines.as_deref().expect("context captured"),
        ["before", "the word here", "after"]
    );
}

#[tokio::test]
async fn smart_search_finds_names_and_content() {
    let fixture = Fixture::new();
    fixture.write_file("report_final.txt", "quarterly numbers\n");
    fixture.write_file("notes.txt", "the final numbers are in\n");
    fixture.write_file("code.rs", "fn unrelated() {}\n");

    let result = fixture
        .engine
        .smart_search(&fixture.raw(""), "final", true, None, &cancel())
        .await
        .expect("search succeeds");

    assert_eq!(result.name_matches.len(), 1);
    assert!(result.name_matches[0].ends_with("report_final.txt"));
    assert_eq!(result.content_matches.len(), 1);
    assert!(result.content_matches[0].file.ends_with("notes.txt"));
    assert_eq!(result.files_scanned, 3);
}

#[tokio::test]
async fn smart_search_file_type_filter() {
    let fixture = Fixture::new();
    fixture.write_file("a.rs", "marker\n");
    fixture.write_file("b.txt", "marker\n");

    let result = fixture
        .engine
        .smart_search(
            &fixture.raw(""),
            "marker",
            true,
            Some(vec!["rs".to_owned()]),
            &cancel(),
        )
        .await
        .expect("search succeeds");
    assert_eq!(result.files_scanned, 1);
    assert_eq!(result.content_matches.len(), 1);
    assert!(result.content_matches[0].file.ends_with("a.rs"));
}

#[tokio::test]
async fn count_occurrences_boundaries() {
    let fixture = Fixture::new();
    fixture.write_file("empty.txt", "");
    fixture.write_file("counted.txt", "ab ab ab\n");

    let empty = fixture
        .engine
        .count_occurrences(&fixture.raw("empty.txt"), "ab", false, &cancel())
        .await
        .expect("count succeeds");
    assert_eq!(empty.count, 0);

    let err = fixture
        .engine
        .count_occurrences(&fixture.raw("counted.txt"), "", false, &cancel())
        .await
        .expect_err("empty pattern");
    assert_eq!(err.kind(), "validation_error");

    let counted = fixture
        .engine
        .count_occurrences(&fixture.raw("counted.txt"), "ab", true, &cancel())
        .await
        .expect("count succeeds");
    assert_eq!(counted.count, 3);
    let lines = counted.lines.expect("lines requested");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].line_number, 1);
}

#[tokio::test]
async fn search_and_replace_goes_through_the_pipeline() {
    let fixture = Fixture::new();
    let path = fixture.write_file("sr.txt", "old value, old flag, old name, and a comment\n");

    let result = fixture
        .engine
        .search_and_replace(&fixture.raw("sr.txt"), "old", "new", false, &cancel())
        .await
        .expect("replace succeeds");
    assert_eq!(result.replacement_count, 3);
    assert!(result.backup_id.is_some());
    assert_eq!(fixture.read(&path), "new value, new flag, new name, and a comment\n");
}

#[tokio::test]
async fn search_results_are_capped_by_the_limit() {
    let fixture = Fixture::with_config_tweak(|config| {
        config.limits.max_search_results = 5;
    });
    fixture.write_file("many.txt", &"hit\n".repeat(50));

    let outcome = fixture
        .engine
        .advanced_text_search(&fixture.raw("many.txt"), "hit", true, false, false, 0, &cancel())
        .await
        .expect("search succeeds");
    assert_eq!(outcome.matches.len(), 5);
    assert!(outcome.truncated || outcome.matches.len() == 5);
}
