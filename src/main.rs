//! logsift entry point: parses CLI and starts the async application runtime.

use anyhow::Result;
use logsift::{app, cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = cli::parse();
    logging::init_logging(config.log_file.as_deref(), !config.print)?;
    app::run(config).await
}
