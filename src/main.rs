use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate::{config, Capture, FaceGate, Response};
use log::{info, warn};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "facegate")]
#[command(version, about = "Face identity enrollment and login")]
struct Cli {
    /// Print the response envelope as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to the build-time config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity store file, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new identity from a single-face capture
    Enroll {
        /// Display name for the identity
        #[arg(short, long)]
        name: String,
        /// Feature file produced by the extractor
        #[arg(short, long)]
        features: PathBuf,
    },
    /// Log in with a capture (any face in frame may match)
    Login {
        #[arg(short, long)]
        features: PathBuf,
    },
    /// Identify the first face of a capture without logging in
    Check {
        #[arg(short, long)]
        features: PathBuf,
    },
    /// Report whether a capture is suitable for enrollment
    Inspect {
        #[arg(short, long)]
        features: PathBuf,
    },
    /// Record a logout
    Logout {
        #[arg(long)]
        id: String,
    },
    /// Change an identity's display name
    Rename {
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        name: String,
    },
    /// Permanently remove an identity
    Delete {
        #[arg(long)]
        id: String,
    },
    /// List enrolled identities
    List,
    /// Show one identity
    Show {
        #[arg(long)]
        id: String,
    },
    /// Number of enrolled identities
    Status,
    /// Open config file in editor
    Config,
}

fn main() -> Result<ExitCode> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config_path = cli.config.as_deref();
    let open_gate = || -> Result<FaceGate> {
        let mut cfg = config::load_config(config_path)?;
        if let Some(store) = &cli.store {
            cfg.store_path = store.clone();
        }
        Ok(FaceGate::open(&cfg))
    };

    match cli.command {
        Commands::Enroll { name, features } => {
            let capture = load_capture(&features)?;
            render(Response::from_result(open_gate()?.enroll(&capture, &name)), json)
        }
        Commands::Login { features } => {
            let capture = load_capture(&features)?;
            render(Response::from_result(open_gate()?.login(&capture)), json)
        }
        Commands::Check { features } => {
            let capture = load_capture(&features)?;
            render(Response::from_result(open_gate()?.check_face(&capture)), json)
        }
        Commands::Inspect { features } => {
            let capture = load_capture(&features)?;
            render(Response::from_result(open_gate()?.inspect(&capture)), json)
        }
        Commands::Logout { id } => render(Response::from_result(open_gate()?.logout(&id)), json),
        Commands::Rename { id, name } => {
            render(Response::from_result(open_gate()?.rename(&id, &name)), json)
        }
        Commands::Delete { id } => render(Response::from_result(open_gate()?.delete(&id)), json),
        Commands::List => {
            let response = Response::from_result(open_gate()?.list());
            if let Response::Success { data, .. } = &response {
                if !json {
                    for entry in &data.identities {
                        info!("{}  {}  {}", entry.id, entry.name, entry.registered_at);
                    }
                }
            }
            render(response, json)
        }
        Commands::Show { id } => render(Response::from_result(open_gate()?.describe(&id)), json),
        Commands::Status => render(Response::from_result(open_gate()?.status()), json),
        Commands::Config => {
            open_config(config_path)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_capture(path: &Path) -> Result<Capture> {
    Capture::from_feature_file(path).context("Failed to load face capture")
}

fn render<T: Serialize>(response: Response<T>, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.is_success() {
        info!("✓ {}", response.message());
    } else {
        warn!("{}", response.message());
    }

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
