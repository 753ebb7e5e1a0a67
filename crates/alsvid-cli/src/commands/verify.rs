//! Verify command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;

use alsvid_pipeline::{Verifier, WorkerConfig};

use super::common::{load_store, save_store};

/// Execute the verify command.
pub async fn execute(store_path: &Path) -> Result<()> {
    let config = WorkerConfig::from_env();
    let store = load_store(store_path, &config).await?;
    let verifier = Verifier::new(Arc::new(store.clone()), config);
    let resolved = verifier.run().await?;
    save_store(&store, store_path).await?;

    println!(
        "{} Verified {} job(s)",
        style("→").cyan().bold(),
        style(resolved).bold()
    );
    Ok(())
}
