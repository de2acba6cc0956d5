// src/main.rs

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = procguard::cli::parse();
    procguard::logging::init_logging(args.log_level)?;

    tracing::debug!(?args, "parsed CLI arguments");

    procguard::run(args).await
}
