//! Reel render command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::{FfmpegRunner, TempFileSet};
use reel_models::RenderOutput;
use reel_worker::{DualRenderRequest, RenderConfig, RenderJob, RenderRequest, WorkerResult};

#[derive(Debug, Parser)]
#[command(name = "reel-render", version, about = "Render reel compositions with FFmpeg")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a single-track composition request
    Render(JobArgs),
    /// Render two sources stacked vertically
    RenderDual(JobArgs),
    /// Print the JSON schema of a request type
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::Render)]
        kind: SchemaKind,
    },
}

#[derive(Debug, clap::Args)]
struct JobArgs {
    /// Request JSON file
    job: PathBuf,

    /// Compile and print the filter graph without running FFmpeg
    #[arg(long)]
    print_graph: bool,

    /// Leave uploaded files in place after the render
    #[arg(long)]
    keep_uploads: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaKind {
    Render,
    RenderDual,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = RenderConfig::from_env();
    info!("Render config: {:?}", config);

    match cli.command {
        Command::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Render => schemars::schema_for!(RenderRequest),
                SchemaKind::RenderDual => schemars::schema_for!(DualRenderRequest),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Render(args) => {
            let request: RenderRequest = read_job(&args.job).await?;
            let (job, _cancel) = render_job(config);

            if args.print_graph {
                let program = job.compile_only(&request)?;
                println!("{}", program.filter_graph());
                return Ok(());
            }

            let uploads = uploads_for(request.upload_paths(), args.keep_uploads);
            report(job.render(request, uploads, Box::new(|_| {})).await)
        }
        Command::RenderDual(args) => {
            let request: DualRenderRequest = read_job(&args.job).await?;
            let (job, _cancel) = render_job(config);

            if args.print_graph {
                let program = job.compile_dual_only(&request).await?;
                println!("{}", program.filter_graph());
                return Ok(());
            }

            let uploads = uploads_for(request.upload_paths(), args.keep_uploads);
            report(job.render_dual(request, uploads, Box::new(|_| {})).await)
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`. Logs go to stderr so
/// stdout carries only the result payload.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reel=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// A job whose FFmpeg process is killed on Ctrl-C.
fn render_job(config: RenderConfig) -> (RenderJob, tokio::task::JoinHandle<()>) {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = cancel_tx.send(true);
        }
    });

    let engine = FfmpegRunner::new(config.ffmpeg_binary.clone()).with_cancel(cancel_rx);
    (RenderJob::new(config, Arc::new(engine)), handle)
}

async fn read_job<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid request in {}", path.display()))
}

fn uploads_for(paths: Vec<PathBuf>, keep: bool) -> TempFileSet {
    if keep {
        TempFileSet::new()
    } else {
        TempFileSet::from_paths(paths)
    }
}

/// Print the success or failure payload; failures exit non-zero.
fn report(result: WorkerResult<RenderOutput>) -> anyhow::Result<()> {
    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Render failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&e.to_failure())?);
            std::process::exit(1);
        }
    }
}
