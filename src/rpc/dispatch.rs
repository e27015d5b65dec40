//! Operation dispatch: parameter structs, one engine call per operation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::edit::pipeline::Replacement;
use crate::engine::{BatchOperation, Engine, ReadMode};
use crate::error::{OpError, OpResult};

fn params<T: DeserializeOwned>(raw: Value) -> OpResult<T> {
    serde_json::from_value(raw)
        .map_err(|err| OpError::validation(format!("invalid parameters: {err}")))
}

fn to_value<T: Serialize>(value: T) -> OpResult<Value> {
    serde_json::to_value(value).map_err(|err| {
        OpError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    })
}

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

#[derive(Deserialize)]
struct ReadFileParams {
    path: String,
    max_lines: Option<usize>,
    #[serde(default)]
    mode: ReadMode,
}

#[derive(Deserialize)]
struct WriteFileParams {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct ChunkedReadParams {
    path: String,
    #[serde(default)]
    offset: u64,
    max_bytes: Option<usize>,
}

#[derive(Deserialize)]
struct RangeParams {
    path: String,
    start_line: usize,
    end_line: usize,
}

#[derive(Deserialize)]
struct EditFileParams {
    path: String,
    old_text: String,
    new_text: String,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct MultiEditParams {
    path: String,
    edits: Vec<Replacement>,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct ReplaceNthParams {
    path: String,
    pattern: String,
    replacement: String,
    occurrence: i64,
    #[serde(default)]
    whole_word: bool,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct SmartSearchParams {
    path: String,
    pattern: String,
    #[serde(default)]
    include_content: bool,
    file_types: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AdvancedSearchParams {
    path: String,
    pattern: String,
    #[serde(default = "default_true")]
    case_sensitive: bool,
    #[serde(default)]
    whole_word: bool,
    #[serde(default)]
    include_context: bool,
    #[serde(default = "default_context_lines")]
    context_lines: usize,
}

fn default_true() -> bool {
    true
}

fn default_context_lines() -> usize {
    2
}

#[derive(Deserialize)]
struct SearchReplaceParams {
    path: String,
    pattern: String,
    replacement: String,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct CountParams {
    path: String,
    pattern: String,
    #[serde(default)]
    return_lines: bool,
}

#[derive(Deserialize)]
struct TransferParams {
    from: String,
    to: String,
}

#[derive(Deserialize)]
struct DeleteParams {
    path: String,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct ListBackupsParams {
    operation: Option<String>,
    path_contains: Option<String>,
    max_age_days: Option<u64>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct RestoreParams {
    backup_id: String,
    file_path: Option<String>,
    #[serde(default)]
    preview: bool,
}

#[derive(Deserialize)]
struct CompareParams {
    backup_id: String,
    file_path: String,
}

#[derive(Deserialize)]
struct CleanupParams {
    older_than_days: Option<u64>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Deserialize)]
struct BackupIdParams {
    backup_id: String,
}

#[derive(Deserialize)]
struct BatchParams {
    operations: Vec<BatchOperation>,
    #[serde(default)]
    atomic: bool,
    #[serde(default = "default_true")]
    create_backup: bool,
    #[serde(default)]
    validate_only: bool,
    #[serde(default)]
    force: bool,
}

/// Routes one operation to the engine and serializes its result document,
/// then applies the configured output bounds.
pub async fn dispatch(
    engine: &Engine,
    op: &str,
    raw_params: Value,
    cancel: &CancelToken,
) -> OpResult<Value> {
    let mut result = route(engine, op, raw_params, cancel).await?;
    enforce_content_budget(&mut result, engine.config().limits.max_response_bytes);
    if engine.config().compact_responses {
        compact(&mut result);
    }
    Ok(result)
}

/// Fields stripped in compact mode. Verbosity only; never semantics.
const COMPACT_STRIPPED: [&str; 4] = ["factors", "sample", "context_lines", "from_cache"];

fn compact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in COMPACT_STRIPPED {
                map.remove(key);
            }
            for child in map.values_mut() {
                compact(child);
            }
        }
        Value::Array(items) => {
            for child in items {
                compact(child);
            }
        }
        _ => {}
    }
}

/// Truncates a result's `content` string to the response budget.
fn enforce_content_budget(value: &mut Value, max_bytes: usize) {
    let Some(content) = value.get_mut("content").and_then(|c| c.as_str().map(str::to_owned))
    else {
        return;
    };
    if content.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while cut > 0 && !content.is_char_boundary(cut) {
        cut -= 1;
    }
    value["content"] = Value::String(content[..cut].to_owned());
    value["truncated"] = Value::Bool(true);
}

async fn route(
    engine: &Engine,
    op: &str,
    raw_params: Value,
    cancel: &CancelToken,
) -> OpResult<Value> {
    match op {
        // File I/O.
        "read_file" => {
            let p: ReadFileParams = params(raw_params)?;
            to_value(engine.read_file(&p.path, p.max_lines, p.mode, cancel).await?)
        }
        "write_file" => {
            let p: WriteFileParams = params(raw_params)?;
            to_value(engine.write_file(&p.path, &p.content, cancel).await?)
        }
        "streaming_write_file" => {
            let p: WriteFileParams = params(raw_params)?;
            to_value(engine.streaming_write_file(&p.path, &p.content, cancel).await?)
        }
        "chunked_read_file" => {
            let p: ChunkedReadParams = params(raw_params)?;
            to_value(engine.chunked_read_file(&p.path, p.offset, p.max_bytes, cancel).await?)
        }
        "read_file_range" => {
            let p: RangeParams = params(raw_params)?;
            to_value(engine.read_file_range(&p.path, p.start_line, p.end_line, cancel).await?)
        }
        "get_file_info" => {
            let p: PathParams = params(raw_params)?;
            to_value(engine.get_file_info(&p.path).await?)
        }

        // Editing.
        "edit_file" => {
            let p: EditFileParams = params(raw_params)?;
            to_value(engine.edit_file(&p.path, &p.old_text, &p.new_text, p.force, cancel).await?)
        }
        "multi_edit" => {
            let p: MultiEditParams = params(raw_params)?;
            to_value(engine.multi_edit(&p.path, &p.edits, p.force, cancel).await?)
        }
        "smart_edit_file" => {
            let p: EditFileParams = params(raw_params)?;
            to_value(
                engine.smart_edit_file(&p.path, &p.old_text, &p.new_text, p.force, cancel).await?,
            )
        }
        "replace_nth_occurrence" => {
            let p: ReplaceNthParams = params(raw_params)?;
            to_value(
                engine
                    .replace_nth_occurrence(
                        &p.path,
                        &p.pattern,
                        &p.replacement,
                        p.occurrence,
                        p.whole_word,
                        p.force,
                        cancel,
                    )
                    .await?,
            )
        }

        // Search.
        "smart_search" => {
            let p: SmartSearchParams = params(raw_params)?;
            to_value(
                engine
                    .smart_search(&p.path, &p.pattern, p.include_content, p.file_types, cancel)
                    .await?,
            )
        }
        "advanced_text_search" => {
            let p: AdvancedSearchParams = params(raw_params)?;
            to_value(
                engine
                    .advanced_text_search(
                        &p.path,
                        &p.pattern,
                        p.case_sensitive,
                        p.whole_word,
                        p.include_context,
                        p.context_lines,
                        cancel,
                    )
                    .await?,
            )
        }
        "search_and_replace" => {
            let p: SearchReplaceParams = params(raw_params)?;
            to_value(
                engine
                    .search_and_replace(&p.path, &p.pattern, &p.replacement, p.force, cancel)
                    .await?,
            )
        }
        "count_occurrences" => {
            let p: CountParams = params(raw_params)?;
            to_value(engine.count_occurrences(&p.path, &p.pattern, p.return_lines, cancel).await?)
        }

        // Directory management.
        "list_directory" => {
            let p: PathParams = params(raw_params)?;
            to_value(engine.list_directory(&p.path).await?)
        }
        "create_directory" => {
            let p: PathParams = params(raw_params)?;
            to_value(engine.create_directory(&p.path).await?)
        }
        "rename_file" => {
            let p: TransferParams = params(raw_params)?;
            to_value(engine.rename_file(&p.from, &p.to, cancel).await?)
        }
        "move_file" => {
            let p: TransferParams = params(raw_params)?;
            to_value(engine.move_file(&p.from, &p.to, cancel).await?)
        }
        "copy_file" => {
            let p: TransferParams = params(raw_params)?;
            to_value(engine.copy_file(&p.from, &p.to, cancel).await?)
        }
        "delete_file" => {
            let p: DeleteParams = params(raw_params)?;
            to_value(engine.delete_file(&p.path, p.force, cancel).await?)
        }
        "soft_delete_file" => {
            let p: PathParams = params(raw_params)?;
            to_value(engine.soft_delete_file(&p.path, cancel).await?)
        }

        // Backups.
        "list_backups" => {
            let p: ListBackupsParams = params(raw_params)?;
            to_value(
                engine
                    .list_backups(p.operation, p.path_contains, p.max_age_days, p.limit)
                    .await?,
            )
        }
        "restore_backup" => {
            let p: RestoreParams = params(raw_params)?;
            to_value(engine.restore_backup(&p.backup_id, p.file_path.as_deref(), p.preview).await?)
        }
        "compare_with_backup" => {
            let p: CompareParams = params(raw_params)?;
            to_value(engine.compare_with_backup(&p.backup_id, &p.file_path).await?)
        }
        "cleanup_backups" => {
            let p: CleanupParams = params(raw_params)?;
            to_value(engine.cleanup_backups(p.older_than_days, p.dry_run).await?)
        }
        "get_backup_info" => {
            let p: BackupIdParams = params(raw_params)?;
            to_value(engine.get_backup_info(&p.backup_id).await?)
        }

        // Dry-run analysis.
        "analyze_write" => {
            let p: WriteFileParams = params(raw_params)?;
            to_value(engine.analyze_write(&p.path, &p.content).await?)
        }
        "analyze_edit" => {
            let p: EditFileParams = params(raw_params)?;
            to_value(engine.analyze_edit(&p.path, &p.old_text, &p.new_text).await?)
        }
        "analyze_delete" => {
            let p: PathParams = params(raw_params)?;
            to_value(engine.analyze_delete(&p.path).await?)
        }

        // Batch.
        "batch_operations" => {
            let p: BatchParams = params(raw_params)?;
            to_value(
                engine
                    .batch_operations(
                        &p.operations,
                        p.atomic,
                        p.create_backup,
                        p.validate_only,
                        p.force,
                        cancel,
                    )
                    .await?,
            )
        }

        // Telemetry.
        "get_telemetry" => to_value(engine.telemetry_summary()),

        other => Err(OpError::validation(format!("unknown operation: {other}"))),
    }
}
