//! Streaming example
//!
//! Streams a response body and prints each chunk as the poll loop recovers
//! it from the transport's cumulative snapshots.
//!
//! Run with: cargo run --example streaming

use pulse_http::{PulseClient, RequestConfig};
use std::io::Write;
use std::sync::mpsc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let client = PulseClient::new()?;
    let (done_tx, done_rx) = mpsc::channel();
    let error_tx = done_tx.clone();

    client.get(
        "https://httpbin.org/drip?numbytes=64&duration=3",
        RequestConfig::default()
            .stream()
            .timeout(Duration::from_secs(30))
            .on_chunk(|chunk| {
                print!("{chunk}");
                let _ = std::io::stdout().flush();
            })
            .on_complete(move |response| {
                println!("\ndone, {} bytes total", response.body.len());
                let _ = done_tx.send(true);
            })
            .on_error(move |err| {
                eprintln!("stream failed: {err}");
                let _ = error_tx.send(false);
            }),
    )?;

    let ok = tokio::task::spawn_blocking(move || {
        done_rx
            .recv_timeout(Duration::from_secs(60))
            .unwrap_or(false)
    })
    .await?;

    client.destroy();
    anyhow::ensure!(ok, "stream did not complete");
    Ok(())
}
