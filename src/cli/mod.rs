//! Command dispatch.
//!
//! Each command takes parsed args plus loaded settings and returns an
//! `anyhow::Result`; the binary maps errors to a nonzero exit.

pub mod args;

pub use args::{Cli, Commands};

use crate::config::{CONFIG_FILE_NAME, Settings};
use crate::pipeline::Generator;
use anyhow::{Context, bail};
use std::path::PathBuf;
use tracing::warn;

pub fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force } => init(force),
        Commands::Generate {
            paths,
            output,
            threads,
            annotation,
            args_history,
            template_func,
        } => generate(
            settings,
            paths,
            output,
            threads,
            annotation,
            args_history,
            template_func,
        ),
        Commands::Config => config(settings),
    }
}

fn init(force: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!("{CONFIG_FILE_NAME} already exists (use --force to overwrite)");
    }
    let content = toml::to_string_pretty(&Settings::default())
        .context("failed to serialize default settings")?;
    std::fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {CONFIG_FILE_NAME}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate(
    mut settings: Settings,
    paths: Vec<PathBuf>,
    output: Option<PathBuf>,
    threads: Option<usize>,
    annotation: Option<String>,
    args_history: bool,
    template_func: bool,
) -> anyhow::Result<()> {
    if let Some(output) = output {
        settings.generation.output.path = output;
    }
    if let Some(threads) = threads {
        settings.generation.concurrency = threads;
    }
    if let Some(annotation) = annotation {
        settings.generation.annotation = annotation;
    }
    if args_history {
        settings.generation.enable_args_history = true;
    }
    if template_func {
        settings.generation.use_template_func = true;
    }

    let roots = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    };

    let report = Generator::new(settings).run(&roots)?;
    for warning in &report.warnings {
        warn!(target: "cli", "{warning}");
    }
    println!(
        "Scanned {} files, found {} entities, wrote {} mocks in {:.2?}",
        report.files_scanned,
        report.entities_found,
        report.mocks_rendered,
        report.elapsed
    );
    if !report.write_failures.is_empty() {
        bail!("{} output file(s) could not be written", report.write_failures.len());
    }
    Ok(())
}

fn config(settings: Settings) -> anyhow::Result<()> {
    let content =
        toml::to_string_pretty(&settings).context("failed to serialize settings")?;
    print!("{content}");
    Ok(())
}
