//! Stats command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::vector_store::IndexTarget;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(index: Option<String>, namespace: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Stats, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let target = IndexTarget::new(
        index.unwrap_or_else(|| settings.chat.index_name.clone()),
        namespace.unwrap_or_else(|| settings.chat.namespace.clone()),
    );
    let provider = settings.vector_store.provider;
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.vector_store().count(&target).await {
        Ok(count) => {
            Output::header("Vector Store");
            Output::kv("Provider", &provider.to_string());
            Output::kv("Index", &target.index);
            Output::kv("Namespace", &target.namespace);
            Output::kv("Vectors", &count.to_string());
            if count == 0 {
                println!();
                Output::info("Namespace is empty. Use 'lexwise ingest' to add documents.");
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to read stats for {}: {}", target, e));
            return Err(e.into());
        }
    }

    Ok(())
}
