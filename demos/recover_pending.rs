//! Crash-recovery example demonstrating registry-driven re-admission.
//!
//! This example shows how to:
//! - Leave items stranded in quarantine (a simulated crash mid-scan)
//! - Re-admit them with recover_pending on the next start
//! - See stale registry entries swept out
//!
//! Run with: cargo run --example recover_pending

use fileward::prelude::*;
use fileward::quarantine::{Ingestor, PlaceholderManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Fileward Crash Recovery Example ===\n");

    let base = std::env::temp_dir().join("fileward-recover-demo");
    let _ = std::fs::remove_dir_all(&base);
    let dropbox = base.join("dropbox");
    let quarantine = base.join("quarantine");
    let ledger = base.join("ledger");
    let registry_path = base.join("registry.json");
    std::fs::create_dir_all(&dropbox)?;
    std::fs::create_dir_all(&quarantine)?;

    // Phase 1: a "previous process" ingests three files and dies before
    // scanning them. The registry document on disk is all that the next
    // process will have.
    println!("=== Phase 1: simulate a crash mid-pipeline ===");
    {
        let placeholders = Arc::new(PlaceholderManager::open(&ledger)?);
        let registry = Arc::new(PathRegistry::open(&registry_path)?);
        let metadata = MetadataStore::new(&quarantine);
        let ingestor = Ingestor::new(&quarantine, placeholders, Arc::clone(&registry), metadata);

        for name in ["alpha.txt", "bravo.txt", "charlie.txt"] {
            let path = dropbox.join(name);
            std::fs::write(&path, format!("contents of {name}"))?;
            let item = ingestor.ingest(&path).await?;
            println!("   ingested {name} as {}", item.quarantine_key);

            // One quarantine copy disappears out of band; its registry
            // entry is now stale.
            if name == "charlie.txt" {
                std::fs::remove_file(&item.quarantine_path)?;
                println!("   (deleted charlie's quarantine copy to fake a stale entry)");
            }
        }
        println!("   ...crash! {} entries left behind\n", registry.len().await);
    }

    // Phase 2: a fresh pipeline starts over the same directories.
    println!("=== Phase 2: restart and recover ===");
    let pipeline = Pipeline::builder()
        .with_config(PipelineConfig::new(
            &dropbox,
            &quarantine,
            &ledger,
            &registry_path,
        ))
        .add_engine(fileward::backends::MockEngine::new("recovery-scanner"))
        .build()?;

    let readmitted = pipeline.recover_pending().await?;
    println!("   re-admitted {readmitted} item(s)\n");

    for name in ["alpha.txt", "bravo.txt", "charlie.txt"] {
        let path = dropbox.join(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) if contents == format!("contents of {name}") => {
                println!("   ✅ {name} is back in the dropbox");
            }
            Ok(_) => {
                // The stale entry's bytes were lost out of band; its
                // placeholder remains as a tombstone.
                println!("   ⚠️  {name} is only a placeholder (bytes were lost out of band)");
            }
            Err(_) => println!("   ❌ {name} is gone entirely"),
        }
    }

    let remaining = pipeline.registry().len().await;
    println!("\nRegistry entries remaining: {remaining}");

    println!("\n=== Example Complete ===");
    Ok(())
}
