use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tgcp_cache::app::{App, Outcome};
use tgcp_cache::cache::spawn_sweeper;
use tgcp_cache::command::Command;
use tgcp_cache::config::Config;
use tgcp_cache::gcp::{Endpoints, GcpClient, GcpCredentials};
use tgcp_cache::resource::ResourceService;
use tgcp_cache::VERSION;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Cached command line browser for GCP resources
#[derive(Parser, Debug)]
#[command(name = "tgcp-cache", version, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long)]
    project: Option<String>,

    /// GCP zone to use (`all` for every zone)
    #[arg(short, long)]
    zone: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Access token to use instead of Application Default Credentials
    #[arg(long, env = "CLOUDSDK_AUTH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tgcp-cache {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tgcp").join("tgcp-cache.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tgcp").join("tgcp-cache.log");
    }
    PathBuf::from("tgcp-cache.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    let project = args
        .project
        .clone()
        .unwrap_or_else(|| config.effective_project());
    let zone = args.zone.clone().unwrap_or_else(|| config.effective_zone());

    if project.is_empty() {
        anyhow::bail!("No project configured. Pass --project or run 'gcloud config set project <id>'");
    }
    tracing::info!("Using project: {}, zone: {}", project, zone);

    let client = match &args.access_token {
        Some(token) => GcpClient::with_credentials(GcpCredentials::from_token(token), Endpoints::default(), &zone)?,
        None => GcpClient::new(&zone).await?,
    };

    let service = ResourceService::new(
        client,
        Arc::new(config.cache.ttl_policy()),
        config.cache.enricher(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(service.caches(), config.cache.sweep_interval(), shutdown_rx);

    let mut app = App::new(service, &project);
    let result = run(&mut app).await;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;

    config.project_id = Some(app.project.clone());
    config.zone = Some(app.zone().to_string());
    if let Err(e) = config.save() {
        tracing::warn!("Failed to save config: {}", e);
    }

    result
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C
async fn run(app: &mut App<GcpClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(app)?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let command = match Command::parse(&line) {
            None => continue,
            Some(Err(usage)) => {
                println!("{}", usage);
                continue;
            }
            Some(Ok(command)) => command,
        };

        match app.execute(command).await {
            Outcome::Quit => break,
            Outcome::Output(output) => {
                for row in output {
                    println!("{}", row);
                }
            }
        }
    }

    Ok(())
}

fn prompt(app: &App<GcpClient>) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}/{}> ", app.project, app.zone())?;
    stdout.flush()?;
    Ok(())
}
