// Strata CLI entry point

use clap::Parser;
use tracing::Level;

use strata::{args::Cli, commands, output::OutputStyle, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let style = OutputStyle::default();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", style.error(&format!("Failed to load configuration: {}", e)));
            std::process::exit(1);
        }
    };

    if let Err(e) = commands::run(cli.command, config, &style).await {
        eprintln!("{}", style.error(&format!("{:#}", e)));
        std::process::exit(1);
    }
}
