use clap::Parser;
use mocksmith::cli::{self, Cli};
use mocksmith::config::Settings;
use mocksmith::logging;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_with_config(&settings.logging);

    if let Err(e) = cli::run(cli, settings) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
