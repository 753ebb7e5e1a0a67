//! Status command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use console::style;

use alsvid_pipeline::{JobKey, JobStore, WorkerConfig};

use super::common::{all_records, load_store, print_record_line, stage_label};

/// Execute the status command.
pub async fn execute(store_path: &Path, key: Option<&str>) -> Result<()> {
    let store = load_store(store_path, &WorkerConfig::from_env()).await?;

    let Some(key) = key else {
        let records = all_records(&store).await?;
        if records.is_empty() {
            println!("No jobs in {}", store_path.display());
            return Ok(());
        }
        println!("{} job(s):", records.len());
        for record in &records {
            print_record_line(record);
        }
        return Ok(());
    };

    let key = JobKey::parse(key)?;
    let Some(record) = store.get(&key).await? else {
        bail!("no job with key {key}");
    };

    println!("{}  {}", style(&record.key).bold(), stage_label(&record));
    println!("  repetitions:  {}", record.repetitions);
    println!("  batchable:    {}", record.batchable);
    println!("  submitted at: {}", record.submitted_at.to_rfc3339());
    if let Some(at) = record.verified_at {
        println!("  verified at:  {}", at.to_rfc3339());
    }
    if let Some(at) = record.processed_at {
        println!("  processed at: {}", at.to_rfc3339());
    }
    if let Some(version) = &record.worker_version {
        println!("  worker:       {version}");
    }
    if !record.message.is_empty() {
        println!("  message:      {}", record.message);
    }
    if let Some(note) = &record.note {
        println!("  note:         {note}");
    }
    if let Some(result_ref) = &record.result_ref {
        println!(
            "  batch:        {} (index {}, prefix {:?})",
            result_ref.batch, result_ref.index, result_ref.prefix
        );
    }
    if let Some(mapped) = &record.mapped_program {
        println!("  mapped program:");
        for line in mapped.lines() {
            println!("    {line}");
        }
    }
    if let Some(result) = &record.result {
        println!("  result:       {}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}
