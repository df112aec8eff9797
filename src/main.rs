use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use moment_catcher::{
    config::{Config, DetectionParams},
    service::{UploadHandler, Workspace},
    tools, MomentCatcher,
};

#[derive(Parser)]
#[command(
    name = "moment-catcher",
    version,
    about = "Cut short trailers out of long videos",
    long_about = "Moment Catcher scores every frame of a video by its audio energy, motion and \
                  visual detail, picks the most exciting moments and concatenates them into a \
                  trailer."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect exciting moments and print them as JSON
    Detect {
        /// Input video
        input: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Detect moments and render them into a trailer
    Trailer {
        /// Input video
        input: PathBuf,

        /// Output video file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Run a file through the upload flow of a workspace
    Ingest {
        /// Video to upload
        file: PathBuf,

        /// Workspace root holding the upload and output directories
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Print the path of a rendered trailer in a workspace
    Fetch {
        /// Trailer name as reported by `ingest`
        name: String,

        /// Workspace root holding the upload and output directories
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// Check that ffmpeg, ffprobe and the workspace directories are present
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination TOML file
        path: PathBuf,
    },
}

#[derive(Args)]
struct DetectionArgs {
    /// Number of moments to detect
    #[arg(short = 'n', long)]
    moments: Option<usize>,

    /// Length of each moment in seconds
    #[arg(short = 'd', long)]
    moment_duration: Option<f64>,

    /// Trailer duration budget in seconds
    #[arg(short = 'm', long)]
    max_duration: Option<f64>,
}

impl DetectionArgs {
    fn apply(&self, mut params: DetectionParams) -> DetectionParams {
        if let Some(moments) = self.moments {
            params.num_moments = moments;
        }
        if let Some(duration) = self.moment_duration {
            params.moment_duration = duration;
        }
        if let Some(max) = self.max_duration {
            params.max_trailer_duration = max;
        }
        params
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    info!("Starting Moment Catcher v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Detect { input, detection } => {
            let params = detection.apply(config.detection.clone());
            let catcher = MomentCatcher::new(config);
            let result = catcher.detect_file(&input, &params).map_err(explain)?;
            println!("{}", serde_json::to_string_pretty(&result.moments)?);
        }

        Command::Trailer { input, output, detection } => {
            let params = detection.apply(config.detection.clone());
            let catcher = MomentCatcher::new(config);
            let report = catcher.process(&input, &output, &params).map_err(explain)?;
            println!("{}", report.to_json()?);
        }

        Command::Ingest { file, workspace, detection } => {
            let params = detection.apply(config.detection.clone());
            let workspace = Workspace::rooted_at(&workspace, &config.service);
            let handler =
                UploadHandler::new(workspace, MomentCatcher::new(config)).with_params(params);

            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("{:?} has no usable file name", file))?
                .to_string();
            let body = File::open(&file).with_context(|| format!("Failed to open {:?}", file))?;

            let outcome = handler.handle_upload(&name, body).map_err(explain)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Fetch { name, workspace } => {
            let workspace = Workspace::rooted_at(&workspace, &config.service);
            let path = workspace.resolve_download(&name).map_err(explain)?;
            println!("{}", path.display());
        }

        Command::Check => {
            let report = tools::check_installation(&config);
            for tool in &report.tools {
                match &tool.version {
                    Some(version) => println!("  ✅ {}: {}", tool.name, version),
                    None => println!("  ❌ {}: not found or not working", tool.name),
                }
            }
            for dir in &report.directories {
                if dir.exists {
                    println!("  ✅ {}/", dir.path.display());
                } else {
                    println!("  ❌ {}/ (missing)", dir.path.display());
                }
            }

            if !report.is_ready() {
                anyhow::bail!("installation incomplete");
            }
            println!("🎉 Moment Catcher is ready to use.");
        }

        Command::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            info!("Default configuration written to {:?}", path);
        }
    }

    Ok(())
}

/// Log the user-facing cause before handing the error to anyhow
fn explain(err: moment_catcher::CatcherError) -> anyhow::Error {
    warn!("{}", err.user_message());
    err.into()
}
