//! Callback-driven fetch example
//!
//! Submits a GET request and waits for the poll loop to deliver the
//! completion callback.
//!
//! Run with: cargo run --example fetch_callback

use pulse_http::{PulseClient, RequestConfig};
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

    let id = client.get(
        "https://httpbin.org/get",
        RequestConfig::default()
            .header("User-Agent", "pulse-demo")
            .timeout(Duration::from_secs(15))
            .on_complete(move |response| {
                println!("status: {:?}", response.status);
                println!("body:\n{}", response.body);
                let _ = done_tx.send(true);
            })
            .on_error(move |err| {
                eprintln!("request failed: {err}");
                let _ = error_tx.send(false);
            }),
    )?;
    println!("submitted request {id}");

    // The recurring poll task delivers the callback; block until it does.
    let ok = tokio::task::spawn_blocking(move || {
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .unwrap_or(false)
    })
    .await?;

    client.destroy();
    anyhow::ensure!(ok, "request did not complete");
    Ok(())
}
