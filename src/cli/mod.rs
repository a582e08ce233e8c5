//! Command-line interface for edc-stream.
//!
//! Commands:
//! - `stream`: connect to configured streams and store what arrives
//! - `replay`: push a captured stream file through the same pipeline
//! - `config check`: validate the configuration without connecting
//! - `encode-password`: obscure a password for `account.password_encoded`
//! - `completions`: shell completion scripts

mod commands;

pub use commands::*;

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};

use crate::config::{encode_password, Config};
use crate::error::{EdcError, Result};

/// Streaming client for Enterprise Data Collector activity feeds.
#[derive(Debug, Parser)]
#[command(name = "edc-stream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file (default: ./edc_config.toml).
    #[arg(short = 'c', long, global = true, env = "EDC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info", env = "EDC_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log format (text, json, compact, pretty).
    #[arg(long, global = true, default_value = "text", env = "EDC_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Log output file (default: stderr).
    #[arg(long, global = true, env = "EDC_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Log level options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, heartbeats and stored activities.
    #[default]
    Info,
    /// All of the above plus per-record details.
    Debug,
    /// All messages including per-chunk details.
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter level.
    #[must_use]
    pub fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// Structured JSON format for machine consumption.
    Json,
    /// Compact single-line format.
    Compact,
    /// Pretty format with full details.
    Pretty,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to configured streams and store incoming activities.
    Stream(StreamArgs),

    /// Feed a captured stream file through the pipeline.
    Replay(ReplayArgs),

    /// Inspect the configuration.
    Config(ConfigArgs),

    /// Print the base64-obscured form of a password.
    EncodePassword {
        /// Password to encode.
        password: String,
    },

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for the stream command.
#[derive(Debug, Clone, clap::Args)]
pub struct StreamArgs {
    /// Stream to run, by name or publisher (default: the first configured).
    #[arg(short = 's', long, conflicts_with = "all")]
    pub stream: Option<String>,

    /// Run every configured stream concurrently.
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the replay command.
#[derive(Debug, Clone, clap::Args)]
pub struct ReplayArgs {
    /// Captured stream body.
    pub file: PathBuf,

    /// Stream whose publisher and sink settings apply.
    #[arg(short = 's', long)]
    pub stream: Option<String>,

    /// Bytes per simulated network chunk.
    #[arg(long, default_value = "4096", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Config action to perform.
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Load and validate the configuration, then summarize each stream.
    Check,

    /// Show which configuration file would be used.
    Path,
}

/// Arguments for the completions command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// PowerShell.
    Powershell,
    /// Elvish shell.
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::Powershell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions and print to stdout.
pub fn generate_completions(shell: CompletionShell) {
    let mut cmd = Cli::command();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, "edc-stream", &mut io::stdout());
}

impl Cli {
    /// Load the configuration named by `-c`, or the default one.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }
}

/// Initialize tracing/logging based on CLI options.
fn init_logging(cli: &Cli) -> Result<()> {
    use std::sync::Mutex;
    use tracing_subscriber::{
        fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_string()));

    let (writer, ansi) = match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| EdcError::io(format!("Failed to open log file: {}", path.display()), e))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let result = match cli.log_format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(ansi)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer().with_ansi(ansi).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
    };

    if let Err(e) = result {
        eprintln!("Warning: Could not initialize logging: {e}");
    }
    Ok(())
}

/// Build the multi-threaded runtime used by the streaming commands.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| EdcError::io("Failed to start async runtime", e))
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Commands::Stream(args) => runtime()?.block_on(commands::stream::run(&cli, args)),
        Commands::Replay(args) => runtime()?.block_on(commands::replay::run(&cli, args)),
        Commands::Config(args) => commands::config::run(&cli, args),
        Commands::EncodePassword { password } => {
            println!("{}", encode_password(password));
            Ok(())
        }
        Commands::Completions(args) => {
            generate_completions(args.shell);
            Ok(())
        }
    }
}
