//! Command-line interface for the converter.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;

use crate::config::{load_context, load_properties, ConvertOptions, PipelineConfig};
use crate::convert::ConversionStats;
use crate::error::{Result, ScopeError};
use crate::pipeline::Pipeline;

/// File extension of written documents.
pub const OUTPUT_EXTENSION: &str = "jsonld";

/// Scope to JSON-LD - Convert Scope XML archive exports to JSON-LD.
#[derive(Parser, Debug)]
#[command(name = "scope-jsonld")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Scope XML export files to convert
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// JSON-LD context file
    #[arg(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// ElementId to property mapping file
    #[arg(short, long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    /// Write one .jsonld file per input into this directory instead of stdout
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Records buffered between parsing and writing
    #[arg(long, value_name = "N")]
    pub channel_capacity: Option<usize>,
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    execute(Cli::parse()).await
}

/// Execute parsed arguments.
pub async fn execute(cli: Cli) -> Result<()> {
    let options = load_options(cli.context.as_deref(), cli.properties.as_deref())?;

    let mut config = PipelineConfig::from_env()?;
    if let Some(capacity) = cli.channel_capacity {
        config = config.with_channel_capacity(capacity);
    }

    // Validate output directory before converting anything
    if let Some(output_dir) = &cli.output_dir {
        if !output_dir.is_dir() {
            return Err(ScopeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Output directory does not exist: {}", output_dir.display()),
            )));
        }
    }

    let pipeline = Pipeline::new(options, config);
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received SIGINT, cancelling conversions");
            cancel.cancel();
        }
    });

    match cli.output_dir {
        Some(output_dir) => convert_to_dir(&pipeline, cli.files, &output_dir).await,
        None => convert_to_stdout(&pipeline, &cli.files).await,
    }
}

/// Load the context and property mapping files, if given.
pub fn load_options(context: Option<&Path>, properties: Option<&Path>) -> Result<ConvertOptions> {
    let mut options = ConvertOptions::new();
    if let Some(path) = context {
        options = options.with_context(load_context(path)?);
    }
    if let Some(path) = properties {
        let map = load_properties(path)?;
        tracing::debug!(entries = map.len(), path = %path.display(), "loaded property mapping");
        options = options.with_properties(map);
    }
    Ok(options)
}

/// Path of the document written for `input` inside `output_dir`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use scope_jsonld::cli::output_path;
///
/// assert_eq!(
///     output_path(Path::new("exports/archive.xml"), Path::new("out")),
///     Path::new("out/archive.jsonld")
/// );
/// ```
#[must_use]
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

/// Output paths for all inputs, rejecting inputs that would share one.
///
/// # Errors
/// Returns `ScopeError::Config` naming both inputs when two of them map to
/// the same output file.
pub fn output_paths(files: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(files.len());

    files
        .iter()
        .map(|input| {
            let target = output_path(input, output_dir);
            if let Some(previous) = seen.insert(target.clone(), input) {
                return Err(ScopeError::Config(format!(
                    "{} and {} would both be written to {}",
                    previous.display(),
                    input.display(),
                    target.display()
                )));
            }
            Ok(target)
        })
        .collect()
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    eprintln!("parse scope file: {}", path.display());
    let file = File::open(path).map_err(|e| {
        ScopeError::Io(std::io::Error::new(
            e.kind(),
            format!("Cannot open {}: {e}", path.display()),
        ))
    })?;
    Ok(BufReader::new(file))
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn report(path: &Path, stats: &ConversionStats) {
    eprintln!(
        "{} {} ({} records, {} bytes)",
        style("Converted").green().bold(),
        path.display(),
        style(stats.records).cyan(),
        stats.bytes_written
    );
}

/// Convert files one after another, concatenating their documents on stdout.
async fn convert_to_stdout(pipeline: &Pipeline, files: &[PathBuf]) -> Result<()> {
    let mut stdout = tokio::io::stdout();

    for path in files {
        let input = open_input(path)?;
        let pb = spinner(format!("Converting {}...", path.display()));
        let outcome = pipeline.run(input, &mut stdout).await;
        pb.finish_and_clear();

        report(path, &outcome?);
    }

    Ok(())
}

/// Convert files concurrently, one independent pipeline run per file.
async fn convert_to_dir(pipeline: &Pipeline, files: Vec<PathBuf>, output_dir: &Path) -> Result<()> {
    let targets = output_paths(&files, output_dir)?;
    let pb = spinner(format!("Converting {} files...", files.len()));
    let mut tasks = JoinSet::new();

    for (path, target) in files.into_iter().zip(targets) {
        let pipeline = pipeline.clone();
        tasks.spawn(async move {
            let outcome = convert_file(&pipeline, &path, &target).await;
            (path, target, outcome)
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let (path, target, outcome) = joined?;
        match outcome {
            Ok(stats) => pb.suspend(|| report(&path, &stats)),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "conversion failed");
                // Never leave a truncated document behind.
                if let Err(remove_err) = tokio::fs::remove_file(&target).await {
                    tracing::debug!(file = %target.display(), error = %remove_err, "no partial output to remove");
                }
                pb.suspend(|| {
                    eprintln!(
                        "{} {}: {e}",
                        style("Failed").red().bold(),
                        path.display()
                    );
                });
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    pb.finish_and_clear();

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn convert_file(pipeline: &Pipeline, path: &Path, target: &Path) -> Result<ConversionStats> {
    let input = open_input(path)?;
    let mut output = tokio::io::BufWriter::new(tokio::fs::File::create(target).await?);
    pipeline.run(input, &mut output).await
}
