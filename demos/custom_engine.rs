//! Custom engine example demonstrating how to implement a new adapter.
//!
//! This example shows how to:
//! - Implement the ScanEngine trait for a custom backend
//! - Convert internal failures into error verdicts
//! - Plug the engine into a pipeline
//!
//! Run with: cargo run --example custom_engine

use async_trait::async_trait;
use fileward::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// A hash-blocklist engine: flags any file whose BLAKE3 digest appears
/// on a known-bad list.
///
/// This demonstrates the adapter contract: `scan` never fails, it
/// answers with a verdict. Unreadable targets become error verdicts so
/// the aggregate stays conservative.
#[derive(Debug)]
struct HashBlocklistEngine {
    name: String,
    blocklist: HashSet<String>,
    hasher: ContentHasher,
}

impl HashBlocklistEngine {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocklist: HashSet::new(),
            hasher: ContentHasher::new(),
        }
    }

    fn with_blocked_hash(mut self, hash: impl Into<String>) -> Self {
        self.blocklist.insert(hash.into());
        self
    }
}

#[async_trait]
impl ScanEngine for HashBlocklistEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn scan(&self, target: &Path) -> EngineVerdict {
        let hasher = self.hasher.clone();
        let path = target.to_path_buf();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash_path(&path)).await;

        match hashed {
            Ok(Ok(hash)) => {
                if self.blocklist.contains(&hash.blake3) {
                    tracing::warn!(
                        engine = self.name(),
                        hash = %hash.blake3,
                        "hash found on blocklist"
                    );
                    EngineVerdict::infected("Blocklist.Match")
                } else {
                    EngineVerdict::clean(format!("not on blocklist ({})", hash.blake3))
                }
            }
            Ok(Err(err)) => EngineVerdict::error(format!("could not hash target: {err}")),
            Err(err) => EngineVerdict::error(format!("hashing task failed: {err}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Custom Engine Example ===\n");

    // Compute the digest of our "malicious" content up front.
    let malicious_content: &[u8] = b"This content is known to be malicious!";
    let malicious_hash = ContentHasher::new().hash_bytes(malicious_content);
    println!("Blocklisted hash: {}\n", malicious_hash.blake3);

    let engine =
        HashBlocklistEngine::new("hash-blocklist").with_blocked_hash(&malicious_hash.blake3);

    // Wire the custom engine into a pipeline over a scratch area.
    let base = std::env::temp_dir().join("fileward-custom-demo");
    let _ = std::fs::remove_dir_all(&base);
    let dropbox = base.join("dropbox");
    let pipeline = Pipeline::builder()
        .with_config(PipelineConfig::new(
            &dropbox,
            base.join("quarantine"),
            base.join("ledger"),
            base.join("registry.json"),
        ))
        .add_engine(engine)
        .build()?;

    // Test 1: a clean file travels through and comes back.
    println!("=== Test 1: clean file ===");
    let safe = dropbox.join("safe.txt");
    std::fs::write(&safe, b"This is a perfectly safe file.")?;
    let outcome = pipeline.process_path(&safe).await?;
    println!(
        "Outcome: {} {}\n",
        if outcome.is_restored() { "✅" } else { "❌" },
        outcome
    );

    // Test 2: the blocklisted file stays in quarantine.
    println!("=== Test 2: blocklisted file ===");
    let bad = dropbox.join("malware.bin");
    std::fs::write(&bad, malicious_content)?;
    let outcome = pipeline.process_path(&bad).await?;
    println!(
        "Outcome: {} {}",
        if outcome.is_restored() { "✅" } else { "❌" },
        outcome
    );

    for record in pipeline.metadata().list().await? {
        if record.status == ItemStatus::Infected {
            let detections = record
                .engine_verdicts
                .iter()
                .filter(|(_, v)| v.is_infected())
                .map(|(name, v)| format!("{name}: {}", v.detail))
                .collect::<Vec<_>>()
                .join(", ");
            println!("   {} flagged by {detections}", record.quarantine_key);
        }
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
