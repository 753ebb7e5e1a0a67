//! Collect command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;

use alsvid_adapter_sim::SimBackend;
use alsvid_pipeline::{Collector, WorkerConfig};

use super::common::{load_store, save_store};

/// Execute the collect command.
///
/// Batches submitted by an earlier invocation no longer exist on the
/// in-process simulator; their jobs stay in flight and only the
/// `process` command, which collects within the same invocation, can
/// complete them.
pub async fn execute(store_path: &Path, grid: i32) -> Result<()> {
    let config = WorkerConfig::from_env();
    let store = load_store(store_path, &config).await?;
    let backend = Arc::new(SimBackend::square(grid));
    let collector = Collector::new(Arc::new(store.clone()), backend, config);
    let finalized = collector.run().await?;
    save_store(&store, store_path).await?;

    println!(
        "{} Finalized {} job(s)",
        style("→").cyan().bold(),
        style(finalized).bold()
    );
    Ok(())
}
