//! Command-line interface definition.

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cargo-style help colors.
fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(
    name = "mocksmith",
    version,
    about = "Swift mock generator",
    long_about = "Scans Swift sources for annotated protocols and classes and \
generates mock implementations with call counters, stub handlers, and \
optional argument capture.",
    styles = cli_styles()
)]
pub struct Cli {
    /// Path to mocksmith.toml (defaults to searching parent directories)
    #[arg(short, long, global = true, value_name = "FILE", env = "MOCKSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default mocksmith.toml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Scan sources and generate mocks
    Generate {
        /// Source roots to scan (defaults to the current directory)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Output file (single-file mode) or directory (per-entity mode)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Parse worker count; 0 means one per CPU
        #[arg(short, long, value_name = "N")]
        threads: Option<usize>,

        /// Annotation marker that opts declarations in
        #[arg(long, value_name = "MARKER")]
        annotation: Option<String>,

        /// Capture argument history for every mocked method
        #[arg(long)]
        args_history: bool,

        /// Route generic methods through Any-typed template handlers
        #[arg(long)]
        template_func: bool,
    },

    /// Print the active configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_paths_and_overrides() {
        let cli = Cli::parse_from([
            "mocksmith",
            "generate",
            "Sources",
            "Tests",
            "--threads",
            "4",
            "--args-history",
        ]);
        match cli.command {
            Commands::Generate {
                paths,
                threads,
                args_history,
                ..
            } => {
                assert_eq!(paths, vec![PathBuf::from("Sources"), PathBuf::from("Tests")]);
                assert_eq!(threads, Some(4));
                assert!(args_history);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn global_config_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["mocksmith", "--config", "custom.toml", "config"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }
}
