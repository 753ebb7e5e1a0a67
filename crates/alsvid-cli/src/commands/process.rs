//! Process command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;

use alsvid_adapter_sim::SimBackend;
use alsvid_pipeline::{Collector, Processor, WorkerConfig};

use super::common::{load_store, save_store};

/// Execute the process command.
///
/// The simulator's batch ledger lives in this process, so results are
/// collected before exit; a deployed worker against a remote backend
/// would leave collection to a separate `collect` schedule.
pub async fn execute(store_path: &Path, grid: i32) -> Result<()> {
    let config = WorkerConfig::from_env();
    let store = load_store(store_path, &config).await?;
    let backend = Arc::new(SimBackend::square(grid));

    let processor = Processor::new(Arc::new(store.clone()), backend.clone(), config.clone());
    let claimed = processor.run().await?;

    let collector = Collector::new(Arc::new(store.clone()), backend, config);
    collector.run().await?;

    save_store(&store, store_path).await?;

    println!(
        "{} Claimed and ran {} job(s) on a {}x{} grid",
        style("→").cyan().bold(),
        style(claimed).bold(),
        grid,
        grid
    );
    Ok(())
}
