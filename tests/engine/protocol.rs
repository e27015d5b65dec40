use serde_json::json;

use crate::common::{cancel, Fixture};
use fs_warden::rpc;

#[tokio::test]
async fn dispatch_round_trips_a_write_and_read() {
    let fixture = Fixture::new();
    let raw = fixture.raw("wire.txt");

    let write = rpc::dispatch(
        &fixture.engine,
        "write_file",
        json!({ "path": raw, "content": "over the wire\n" }),
        &cancel(),
    )
    .await
    .expect("write dispatches");
    assert_eq!(write["bytes_written"], 14);

    let read = rpc::dispatch(
        &fixture.engine,
        "read_file",
        json!({ "path": raw }),
        &cancel(),
    )
    .await
    .expect("read dispatches");
    assert_eq!(read["content"], "over the wire\n");
}

#[tokio::test]
async fn unknown_operations_and_bad_params_are_validation_errors() {
    let fixture = Fixture::new();

    let err = rpc::dispatch(&fixture.engine, "no_such_op", json!({}), &cancel())
        .await
        .expect_err("unknown op");
    assert_eq!(err.kind(), "validation_error");

    let err = rpc::dispatch(
        &fixture.engine,
        "read_file",
        json!({ "not_path": true }),
        &cancel(),
    )
    .await
    .expect_err("missing parameter");
    assert_eq!(err.kind(), "validation_error");

    let err = rpc::dispatch(
        &fixture.engine,
        "read_file",
        json!({ "path": fixture.raw("x"), "mode": "sideways" }),
        &cancel(),
    )
    .await
    .expect_err("unknown mode");
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn error_documents_carry_kind_and_impact() {
    let fixture = Fixture::new();
    let content = format!("{}{}", "a".repeat(50), "\n".repeat(50));
    fixture.write_file("gated.txt", &content);

    let err = rpc::dispatch(
        &fixture.engine,
        "edit_file",
        json!({ "path": fixture.raw("gated.txt"), "old_text": "a", "new_text": "bb" }),
        &cancel(),
    )
    .await
    .expect_err("risk gate");

    let doc = rpc::failure(json!(7), &err);
    assert_eq!(doc["id"], 7);
    assert_eq!(doc["ok"], false);
    assert_eq!(doc["error"]["kind"], "validation_error");
    assert_eq!(doc["error"]["impact"]["occurrences"], 50);
}

#[tokio::test]
async fn success_documents_echo_the_request_id() {
    let doc = rpc::success(json!("req-9"), json!({ "fine": true }));
    assert_eq!(doc["id"], "req-9");
    assert_eq!(doc["ok"], true);
    assert_eq!(doc["result"]["fine"], true);
}

#[tokio::test]
async fn compact_mode_strips_verbose_fields_only() {
    let fixture = Fixture::with_config_tweak(|config| {
        config.compact_responses = true;
    });
    let content = format!("{}{}", "a".repeat(50), "\n".repeat(50));
    fixture.write_file("compact.txt", &content);

    // Force the risky edit through and inspect the (compacted) result.
    let result = rpc::dispatch(
        &fixture.engine,
        "edit_file",
        json!({
            "path": fixture.raw("compact.txt"),
            "old_text": "a",
            "new_text": "bb",
            "force": true,
        }),
        &cancel(),
    )
    .await
    .expect("forced edit dispatches");
    // Semantics intact.
    assert_eq!(result["replacement_count"], 50);
    assert!(result["backup_id"].is_string());
}

#[tokio::test]
async fn oversized_content_is_truncated_to_the_response_budget() {
    let fixture = Fixture::with_config_tweak(|config| {
        config.limits.max_response_bytes = 64;
    });
    fixture.write_file("huge.txt", &"z".repeat(1000));

    let result = rpc::dispatch(
        &fixture.engine,
        "read_file",
        json!({ "path": fixture.raw("huge.txt") }),
        &cancel(),
    )
    .await
    .expect("read dispatches");
    assert_eq!(result["content"].as_str().expect("content present").len(), 64);
    assert_eq!(result["truncated"], true);
}
