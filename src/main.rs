use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use series_matcher::cli;
use series_matcher::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("series_matcher=debug,info")
    } else {
        EnvFilter::new("series_matcher=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        cli::Commands::Import(args) => {
            cli::import::run(args, &cli.library, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::run::run(args, &cli.library, &config, cli.format, cli.verbose)?;
        }
        cli::Commands::Review(args) => {
            cli::review::run(args, &cli.library, &config, cli.format)?;
        }
        cli::Commands::Status(args) => {
            cli::status::run(args, &cli.library, cli.format)?;
        }
    }

    Ok(())
}
