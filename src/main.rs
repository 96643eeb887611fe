use anyhow::Result;
use camdrop::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await
}
