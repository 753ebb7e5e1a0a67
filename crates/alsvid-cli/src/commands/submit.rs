//! Submit command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use alsvid_pipeline::{JobRecord, JobStore, WorkerConfig};

use super::common::{load_store, save_store};

/// Execute the submit command.
pub async fn execute(
    store_path: &Path,
    input: &Path,
    repetitions: u32,
    batchable: bool,
    note: Option<&str>,
) -> Result<()> {
    let program = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read program {}", input.display()))?;

    let mut record = JobRecord::new(program, repetitions).with_batchable(batchable);
    if let Some(note) = note {
        record = record.with_note(note);
    }

    let store = load_store(store_path, &WorkerConfig::from_env()).await?;
    let key = store.insert(record).await?;
    save_store(&store, store_path).await?;

    println!(
        "{} Submitted {} as job {}",
        style("→").cyan().bold(),
        style(input.display()).green(),
        style(key).bold()
    );
    Ok(())
}
