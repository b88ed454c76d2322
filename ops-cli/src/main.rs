use anyhow::Result;
use clap::Parser;
use logger_redacted::{init_tracing, LogFormat};
use ops_cli::{execute, load_config, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.log_level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    init_tracing(&config.logging)?;

    execute(cli.command, config).await
}
