mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use scrapebench::config::Config;
use scrapebench::harness;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.clone())?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            let summary = harness::run(&config).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Sample(args) => {
            args.apply(&mut config);
            for url in harness::select_urls(&config)? {
                println!("{}", url);
            }
        }
        Commands::ShowConfig(args) => {
            args.apply(&mut config);
            config.validate()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
