//! CLI command implementations
//!
//! Each command loads the configuration, builds the directory it
//! describes and returns its output as JSON. Printing happens in
//! `run_command`.

use std::path::Path;

use serde_json::{json, Value};

use crate::cache::CallContext;
use crate::config::FlexConfig;
use crate::flex::{CallResult, FlexIndex, Orderings, SortKey};
use crate::observability::Event;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::print_response;

/// Dispatch a parsed command and print its output
pub fn run_command(command: Command) -> CliResult<()> {
    let output = match command {
        Command::Reconcile { config } => reconcile(&config)?,
        Command::List {
            config,
            key_field,
            order_by,
            session,
        } => list(&config, key_field.as_deref(), &order_by, session)?,
        Command::Call {
            operation,
            config,
            args,
            key_field,
            session,
        } => call(&config, &operation, &args, key_field.as_deref(), session)?,
    };
    print_response(output)
}

fn load_config(path: &Path) -> CliResult<FlexConfig> {
    let config = FlexConfig::load(path)?;
    config.logger().trace(
        Event::ConfigLoaded.as_str(),
        &[("path", &path.display().to_string())],
    );
    Ok(config)
}

fn context_for(session: Option<String>) -> CallContext {
    match session {
        Some(id) => CallContext::session(id),
        None => CallContext::anonymous(),
    }
}

/// Reconcile the index file and report what changed
pub fn reconcile(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let directory = config.build_directory();
    let reconciliation = directory.reconcile()?;

    Ok(json!({
        "type": directory.directory_type(),
        "total": reconciliation.index.len(),
        "added": reconciliation.added,
        "updated": reconciliation.updated,
        "removed": reconciliation.removed,
        "rows_read": reconciliation.rows_read,
        "written": reconciliation.written,
    }))
}

/// List index entries, re-keyed and sorted as requested
pub fn list(
    config_path: &Path,
    key_field: Option<&str>,
    order_by: &[String],
    session: Option<String>,
) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let directory = config.build_directory();
    let index = keyed_index(directory.index()?, key_field);

    let orderings = order_by
        .iter()
        .map(|spec| spec.parse::<SortKey>())
        .collect::<Result<Orderings, _>>()
        .map_err(CliError::invalid_arguments)?;

    let result = index.order_by(&orderings, &context_for(session))?;
    Ok(render(&result))
}

/// Run a registered operation
pub fn call(
    config_path: &Path,
    operation: &str,
    args: &str,
    key_field: Option<&str>,
    session: Option<String>,
) -> CliResult<Value> {
    let arguments = match serde_json::from_str::<Value>(args) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Err(CliError::invalid_arguments("--args must be a JSON array")),
        Err(e) => return Err(CliError::invalid_arguments(format!("--args: {}", e))),
    };

    let config = load_config(config_path)?;
    let directory = config.build_directory();
    let index = keyed_index(directory.index()?, key_field);

    let result = index.call(operation, &arguments, &context_for(session))?;
    let mut output = render(&result);
    output["metrics"] = serde_json::to_value(directory.metrics().snapshot())?;
    Ok(output)
}

fn keyed_index(index: FlexIndex, key_field: Option<&str>) -> FlexIndex {
    match key_field {
        Some(field) => index.with_key_field(Some(field)),
        None => index,
    }
}

/// JSON form of a call result; entry order is kept by using arrays.
pub fn render(result: &CallResult) -> Value {
    match result {
        CallResult::Index(index) => json!({
            "kind": "index",
            "type": index.directory_type(),
            "key_field": index.key_field(),
            "count": index.len(),
            "entries": index
                .entries()
                .iter()
                .map(|(key, entry)| json!({ "key": key, "entry": entry }))
                .collect::<Vec<_>>(),
        }),
        CallResult::Collection(collection) => json!({
            "kind": "collection",
            "type": collection.directory_type(),
            "key_field": collection.key_field(),
            "count": collection.len(),
            "objects": collection
                .iter()
                .map(|object| json!({ "key": object.key(), "data": object.data() }))
                .collect::<Vec<_>>(),
        }),
        CallResult::Value(value) => json!({
            "kind": "value",
            "value": value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FolderStore, Row};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let storage = temp.path().join("people");
        let store = FolderStore::new(&storage);
        for (key, name, age) in [("p1", "Carol", 40), ("p2", "alice", 31), ("p10", "Bob", 35)] {
            let mut row = Row::new();
            row.insert("name".into(), json!(name));
            row.insert("age".into(), json!(age));
            store.write_row(key, &row).unwrap();
        }

        let config_path = temp.path().join("flex.json");
        let config = json!({
            "directory_type": "people",
            "storage_path": storage,
            "indexed_fields": ["name"],
            "cache": {"backend": "file"},
            "log_level": "error"
        });
        fs::write(&config_path, config.to_string()).unwrap();
        (temp, config_path)
    }

    #[test]
    fn test_reconcile_then_noop() {
        let (_temp, config) = setup();

        let first = reconcile(&config).unwrap();
        assert_eq!(first["total"], 3);
        assert_eq!(first["added"].as_array().unwrap().len(), 3);
        assert_eq!(first["written"], true);

        let second = reconcile(&config).unwrap();
        assert_eq!(second["rows_read"], 0);
        assert_eq!(second["written"], false);
    }

    #[test]
    fn test_list_natural_order_and_sort() {
        let (_temp, config) = setup();

        let listing = list(&config, None, &[], None).unwrap();
        let keys: Vec<&str> = listing["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["p1", "p2", "p10"]);

        let by_age = list(&config, Some("name"), &["age:desc".to_string()], None).unwrap();
        assert_eq!(by_age["kind"], "collection");
        assert_eq!(by_age["objects"][0]["key"], "Carol");
    }

    #[test]
    fn test_call_count_and_bad_args() {
        let (_temp, config) = setup();

        let count = call(&config, "count", "[]", None, None).unwrap();
        assert_eq!(count["kind"], "value");
        assert_eq!(count["value"], 3);
        assert_eq!(count["metrics"]["cache_misses"], 1);

        let err = call(&config, "count", "{}", None, None).unwrap_err();
        assert_eq!(err.code_str(), "FLEX_CLI_INVALID_ARGUMENTS");

        let err = call(&config, "nope", "[]", None, None).unwrap_err();
        assert_eq!(err.code_str(), "FLEX_CLI_OPERATION_FAILED");
    }

    #[test]
    fn test_bad_sort_spec() {
        let (_temp, config) = setup();
        let err = list(&config, None, &["age:sideways".to_string()], None).unwrap_err();
        assert_eq!(err.code_str(), "FLEX_CLI_INVALID_ARGUMENTS");
    }
}
