//! Shared helpers for the CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use alsvid_pipeline::{JobRecord, JobStore, MemoryStore, RecordFilter, WorkerConfig};

/// Load the store file, or start empty if it does not exist yet.
///
/// The store's transaction deadline comes from the worker config.
pub async fn load_store(path: &Path, config: &WorkerConfig) -> Result<MemoryStore> {
    let store = MemoryStore::with_txn_timeout(config.txn_timeout);
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store file {}", path.display()))?;
        let records: Vec<JobRecord> = serde_json::from_str(&content)
            .with_context(|| format!("store file {} is not valid", path.display()))?;
        store.put_multi(records).await?;
    }
    Ok(store)
}

/// Write all records back to the store file.
pub async fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let records = all_records(store).await?;
    let json = serde_json::to_string_pretty(&records)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write store file {}", path.display()))?;
    Ok(())
}

/// All records in query order.
pub async fn all_records(store: &MemoryStore) -> Result<Vec<JobRecord>> {
    let keys = store.query_keys(&RecordFilter::default()).await?;
    let records = store
        .get_multi(&keys)
        .await?
        .into_iter()
        .flatten()
        .collect();
    Ok(records)
}

/// A record's lifecycle stage as a styled label.
pub fn stage_label(record: &JobRecord) -> console::StyledObject<&'static str> {
    if record.done && record.result.is_some() {
        style("done").green()
    } else if record.done {
        style("failed").red()
    } else if record.sent {
        style("sent").yellow()
    } else if record.verified {
        style("verified").cyan()
    } else {
        style("pending").dim()
    }
}

/// Print one record as a summary line.
pub fn print_record_line(record: &JobRecord) {
    println!(
        "  {}  {:>8}  {:>4} reps  {}",
        style(&record.key).bold(),
        stage_label(record),
        record.repetitions,
        record.message
    );
}
