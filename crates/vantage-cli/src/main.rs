//! vantage - multi-vantage reachability measurement
//!
//! Measures a curated domain list from the current network, compares
//! vantages and classifies likely censorship.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    vantage_cli::run().await
}
