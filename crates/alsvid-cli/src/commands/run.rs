//! Run command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;

use alsvid_adapter_sim::SimBackend;
use alsvid_pipeline::{Collector, Processor, Verifier, WorkerConfig};

use super::common::{all_records, load_store, print_record_line, save_store};

/// Execute the run command: all three worker stages in sequence.
pub async fn execute(store_path: &Path, grid: i32) -> Result<()> {
    let config = WorkerConfig::from_env();
    let store = load_store(store_path, &config).await?;
    let backend = Arc::new(SimBackend::square(grid));

    let verified = Verifier::new(Arc::new(store.clone()), config.clone())
        .run()
        .await?;
    let claimed = Processor::new(Arc::new(store.clone()), backend.clone(), config.clone())
        .run()
        .await?;
    let finalized = Collector::new(Arc::new(store.clone()), backend, config)
        .run()
        .await?;

    save_store(&store, store_path).await?;

    println!(
        "{} Verified {}, ran {}, finalized {} job(s)",
        style("→").cyan().bold(),
        style(verified).bold(),
        style(claimed).bold(),
        style(finalized).bold()
    );
    for record in all_records(&store).await? {
        print_record_line(&record);
    }
    Ok(())
}
