use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use server_bundler::commands::{self, BuildSummary};
use server_bundler::{
    AppState, BuildRequest, BundlerError, BundlerResult, LoaderType, ProgressEvent, ProgressLevel,
    ProgressPhase, ProgressSink,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(name = "server-bundler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build ready-to-run Minecraft server bundles", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/server-bundler/bundler.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve, download and package a server
    Build {
        /// vanilla, fabric or forge
        #[arg(long, value_parser = parse_loader)]
        loader: LoaderType,
        /// Minecraft version, e.g. 1.20.1
        #[arg(long)]
        version: String,
        /// Server setting as key=value (repeatable), e.g. max_players=10
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_setting)]
        settings: Vec<(String, String)>,
        /// Where to write the zip (defaults to the bundle name in the current directory)
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Abort the build after this many seconds
        #[arg(long, value_name = "SECS")]
        deadline: Option<u64>,
    },

    /// List Minecraft versions a loader can be bundled for
    Versions {
        #[arg(long, value_parser = parse_loader)]
        loader: LoaderType,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    server_bundler::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            if e.is_user_correctable() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> BundlerResult<()> {
    let mut config = match &cli.config {
        Some(path) => server_bundler::BundlerConfig::load(path)?,
        None => server_bundler::BundlerConfig::load_default()?,
    };

    match cli.command {
        Commands::Build {
            loader,
            version,
            settings,
            output,
            deadline,
        } => {
            if let Some(secs) = deadline {
                config.build_deadline = Some(Duration::from_secs(secs));
            }
            let state = AppState::new(config)?;
            let settings: HashMap<String, String> = settings.into_iter().collect();
            build(&state, BuildRequest { loader, version, settings }, output).await
        }
        Commands::Versions { loader } => {
            let state = AppState::new(config)?;
            for version in commands::get_minecraft_versions(&state, loader).await? {
                println!("{version}");
            }
            Ok(())
        }
    }
}

async fn build(state: &AppState, request: BuildRequest, output: Option<PathBuf>) -> BundlerResult<()> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling build");
            on_ctrl_c.cancel();
        }
    });

    let sink = ProgressSink::new(print_progress);
    let result = commands::build_server_bundle(state, "cli", request, sink, cancel).await?;
    let summary = BuildSummary::from(&result);

    let dest = output.unwrap_or_else(|| PathBuf::from(&result.archive_name));
    let written = result.archive.persist(&dest)?;

    eprintln!(
        "Wrote {} ({} bytes, {:.1}% smaller than the {} byte artifact)",
        written.display(),
        summary.archive_size_bytes,
        summary.compression_ratio_percent,
        summary.original_artifact_size_bytes
    );
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| BundlerError::AssemblyFailed(format!("Cannot render summary: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_progress(event: ProgressEvent) {
    let prefix = match event.level {
        ProgressLevel::Info => "",
        ProgressLevel::Warning => "warning: ",
    };

    match (event.phase, event.percent, &event.message) {
        (ProgressPhase::Downloading, Some(pct), None) => eprintln!("{prefix}downloading {pct:>3}%"),
        (ProgressPhase::Done, _, _) => eprintln!("{prefix}done ({} bytes)", event.bytes_done),
        (phase, _, Some(message)) => eprintln!("{prefix}[{phase:?}] {message}"),
        (phase, _, None) => eprintln!("{prefix}[{phase:?}]"),
    }
}

fn parse_loader(raw: &str) -> Result<LoaderType, String> {
    raw.parse()
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
