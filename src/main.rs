use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rasterpredict::api::{ApiOutcome, UploadKind};
use rasterpredict::config::{FormField, Settings};
use rasterpredict::shell::display::{
    display_alert, display_fragments, display_models, display_notice, display_prediction,
    display_tiffs, display_upload_form,
};
use rasterpredict::Controller;

#[derive(Parser)]
#[command(name = "rasterpredict", version, about = "Upload models and TIFF layers, then request raster predictions")]
struct Cli {
    /// Directory holding default.toml and local.toml (defaults to ./config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FileKind {
    Model,
    Tiff,
}

impl From<FileKind> for UploadKind {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Model => UploadKind::Model,
            FileKind::Tiff => UploadKind::Tiff,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session (default)
    Shell,
    /// List uploaded models
    Models,
    /// List uploaded TIFF layers
    Tiffs,
    /// Upload a trained model file
    UploadModel { path: PathBuf },
    /// Upload a TIFF layer of the given type
    UploadTiff {
        #[arg(long = "type")]
        tiff_type: String,
        path: PathBuf,
    },
    /// Run a prediction
    Predict {
        #[arg(long)]
        model: String,
        /// Extra form field, name=value; may repeat
        #[arg(long = "field")]
        fields: Vec<FormField>,
        /// Save the predicted TIFF into this directory
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Delete an uploaded file
    Delete { kind: FileKind, name: String },
    /// Print the initial page as HTML fragments
    Render,
}

fn init_logging(settings: &Settings) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = settings.logging.file.as_deref().unwrap_or_else(|| Path::new("logs"));
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        log_dir,
        "rasterpredict",
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    info!("Log directory: {}", log_dir.display());
    Ok(guard)
}

/// Entry point: loads settings, sets up logging, then runs the requested
/// command against the configured backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(dir) => Settings::load(dir),
        None => Settings::new(),
    }
    .context("loading settings")?;

    if let Some(Command::Predict { fields, .. }) = &cli.command {
        settings.predict.extra_fields.extend(fields.iter().cloned());
        settings.validate().context("checking --field values")?;
    }

    let _guard = init_logging(&settings)?;
    info!("rasterpredict starting, backend {}", settings.server.base_url);

    let controller = Controller::from_settings(&settings).context("building HTTP client")?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            rasterpredict::shell::shell_loop(&controller)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        Command::Models => {
            let outcome = controller.refresh_models().await?;
            controller.view(display_models);
            fail_on_rejection(outcome)?;
        }
        Command::Tiffs => {
            let outcome = controller.refresh_tiffs().await?;
            controller.view(display_tiffs);
            fail_on_rejection(outcome)?;
        }
        Command::UploadModel { path } => {
            controller.choose_file(UploadKind::Model, Some(&path));
            let outcome = controller.submit_upload(UploadKind::Model).await;
            controller.view(|page| display_upload_form(page, UploadKind::Model));
            fail_on_rejection(outcome?)?;
        }
        Command::UploadTiff { tiff_type, path } => {
            controller.set_tiff_type(Some(&tiff_type))?;
            controller.choose_file(UploadKind::Tiff, Some(&path));
            let outcome = controller.submit_upload(UploadKind::Tiff).await;
            controller.view(|page| display_upload_form(page, UploadKind::Tiff));
            fail_on_rejection(outcome?)?;
        }
        Command::Predict { model, download, .. } => {
            fail_on_rejection(controller.refresh_and_select(&model).await?)?;
            let outcome = controller.submit_prediction().await;
            if let Some(alert) = controller.take_alert() {
                display_alert(&alert);
            }
            fail_on_rejection(outcome?)?;
            controller.view(|page| display_prediction(page.panel()));
            if let Some(dir) = download {
                let saved = controller.download_prediction(&dir).await?;
                println!("Saved {}", saved.display());
            }
        }
        Command::Delete { kind, name } => {
            let outcome = controller.delete_file(kind.into(), &name).await?;
            controller.view(display_notice);
            fail_on_rejection(outcome)?;
        }
        Command::Render => {
            controller.initialize().await;
            display_fragments(&controller.render());
        }
    }

    Ok(())
}

/// Turns a business failure into a non-zero exit.
fn fail_on_rejection<T>(outcome: ApiOutcome<T>) -> anyhow::Result<()> {
    match outcome {
        ApiOutcome::Success(_) => Ok(()),
        ApiOutcome::Failure { message } => bail!("{}", message),
    }
}
