mod cli;

use anyhow::Result;
use clap::Parser;
use cli::args::{Cli, Commands};
use telesales_insights::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &cli.runtime.data_dir {
        config.datasets.data_dir = dir.clone();
    }
    if let Some(model) = &cli.runtime.model {
        config.gateway.model = Some(model.clone());
    }

    match &cli.command {
        None | Some(Commands::Chat) => {
            cli::commands::handle_chat(&config, cli.runtime.layout).await?
        }
        Some(Commands::Ask { prompt }) => cli::commands::handle_ask(&config, prompt).await?,
        Some(Commands::Report) => cli::commands::handle_report()?,
        Some(Commands::Stats) => cli::commands::handle_stats(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
