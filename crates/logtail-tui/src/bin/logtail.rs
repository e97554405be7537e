use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use logtail_client::{Endpoints, HttpCommandClient, HttpTransport, LogCommands, Session};
use logtail_core::config::Config;
use logtail_tui::app::{LogsView, TRUNCATE_OK_TEXT};
use logtail_tui::{logging, runtime, stream};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "logtail", version, about = "Tail a control server's log stream")]
struct Cli {
    /// Control server base URL, e.g. http://127.0.0.1:8080
    #[arg(long)]
    url: Option<String>,

    /// Config file (default: ./logtail.toml, then ~/.config/logtail/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lines kept in memory
    #[arg(long)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Follow the live log stream (default)
    Tail,
    /// Wipe the remote log file
    Truncate,
    /// Save the whole remote log file to PATH
    Download { path: PathBuf },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("logtail: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("load config")?;
    if let Some(url) = cli.url {
        config.server.base_url = url;
    }
    if let Some(capacity) = cli.capacity {
        config.buffer.capacity = capacity;
    }
    config.validate().context("invalid settings")?;

    let _log_guard = logging::init(&config.logging)?;
    info!(base_url = %config.server.base_url, "logtail starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(execute(cli.command.unwrap_or(Commands::Tail), config))
}

async fn execute(command: Commands, config: Config) -> anyhow::Result<()> {
    let endpoints = Endpoints::from_config(&config.server);
    let commands = Arc::new(HttpCommandClient::new(endpoints.clone(), &config.server)?);

    match command {
        Commands::Truncate => {
            commands.truncate().await?;
            println!("{TRUNCATE_OK_TEXT}");
            Ok(())
        }
        Commands::Download { path } => {
            let written = commands.download_to(&path).await?;
            println!("wrote {written} bytes to {}", path.display());
            Ok(())
        }
        Commands::Tail => {
            let transport = Arc::new(HttpTransport::new(config.server.connect_timeout())?);
            let session = Session::new(endpoints, config.buffer.capacity, transport, commands);
            let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
            if interactive {
                let mut view =
                    LogsView::new(session, config.scroll.to_scroll_config(), &config.ui);
                runtime::run(&mut view).await
            } else {
                let mut session = session;
                let mut out = std::io::stdout().lock();
                stream::stream_lines(&mut session, &mut out).await
            }
        }
    }
}
