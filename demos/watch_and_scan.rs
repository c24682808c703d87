//! Watch-loop example demonstrating the full item lifecycle.
//!
//! This example shows how to:
//! - Configure and build a pipeline over a watched directory
//! - Run the watch loop with a shutdown channel
//! - Observe restoration of clean items and quarantine of infected ones
//!
//! Run with: cargo run --example watch_and_scan

use fileward::backends::MockEngine;
use fileward::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; the audit narration arrives at INFO under the
    // fileward::audit target.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Fileward Watch-and-Scan Example ===\n");

    // Lay out a scratch area: a dropbox to watch and quarantine storage
    // beside it.
    let base = std::env::temp_dir().join("fileward-watch-demo");
    let _ = std::fs::remove_dir_all(&base);
    let dropbox = base.join("dropbox");
    let config = PipelineConfig::new(
        &dropbox,
        base.join("quarantine"),
        base.join("ledger"),
        base.join("registry.json"),
    )
    .with_poll_interval(Duration::from_millis(300));

    // A mock engine keeps the example self-contained. Against a real
    // daemon you would add, e.g.:
    //   EngineConfig::local_process("clamav", "clamdscan")
    let engine = Arc::new(MockEngine::new("demo-engine"));

    let pipeline = Arc::new(
        Pipeline::builder()
            .with_config(config)
            .add_arc_engine(Arc::clone(&engine) as ArcEngine)
            .build()?,
    );
    println!("Watching {} with {} engine(s)\n", dropbox.display(), pipeline.engine_count());

    let (shutdown, signal) = watch::channel(false);
    let runner = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.run(signal).await }
    });

    // Drop a clean file into the watch root and give the loop a moment.
    println!("=== Dropping a clean file ===");
    let clean_path = dropbox.join("quarterly-report.pdf");
    std::fs::write(&clean_path, b"nothing to see here")?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if clean_path.exists() && pipeline.registry().is_empty().await {
        println!("✅ quarterly-report.pdf was scanned and restored in place\n");
    } else {
        println!("…still in flight\n");
    }

    // Flip the engine to infected and drop another file.
    println!("=== Dropping an infected file ===");
    engine.set_verdict(EngineVerdict::infected("Demo.Threat.EICAR"));
    let bad_path = dropbox.join("totally-legit-invoice.exe");
    std::fs::write(&bad_path, b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$")?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if !bad_path.exists() {
        println!("❌ totally-legit-invoice.exe was detected and kept in quarantine");
    }

    // The registry records the way back for everything still held.
    for (key, original) in pipeline.registry().entries().await {
        println!("   held: {} (was {})", key, original.display());
    }

    // Metadata records carry the full verdict history.
    println!("\n=== Metadata records ===");
    for record in pipeline.metadata().list().await? {
        println!(
            "   {} -> {} ({} verdict(s))",
            record.quarantine_key,
            record.status,
            record.engine_verdicts.len()
        );
    }

    shutdown.send(true)?;
    runner.await??;

    println!("\n=== Example Complete ===");
    Ok(())
}
