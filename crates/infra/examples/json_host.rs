//! Example: driving the sync worker over JSON lines
//!
//! Reads one host message per line from stdin and prints every sync event
//! as a JSON line on stdout.
//!
//! ```bash
//! export NOTESYNC_ENDPOINT_URL=http://localhost:8080/api/batch-sync
//! export NOTESYNC_API_TOKEN=dev-token
//! cargo run --example json_host
//! {"type":"ENQUEUE","payload":[{"type":"note","operation":"update","data":{"id":"n1","updatedAt":1}}]}
//! {"type":"FLUSH_NOW"}
//! ```

use std::sync::Arc;

use notesync_infra::{
    config, init_tracing, BatchSyncClient, LogFormat, StaticTokenProvider, SyncWorker,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::Pretty)?;

    let config = config::load()?;
    let tokens = Arc::new(StaticTokenProvider::from_config(&config)?);
    let client = Arc::new(BatchSyncClient::from_config(&config, tokens)?);

    let (mut worker, mut events) = SyncWorker::new(config, client)?;
    worker.start()?;
    let handle = worker.handle()?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode event"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = handle.dispatch_json(&line) {
            tracing::warn!(error = %e, "rejected host message");
        }
    }

    worker.stop().await?;
    drop(worker);
    printer.await?;
    Ok(())
}
