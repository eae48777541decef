use anyhow::Result;
use bellhop::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
