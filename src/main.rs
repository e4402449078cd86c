#![allow(non_snake_case)]

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    vfsMonitor::cli::cli().await
}
