// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::Path;
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::app_config::AppConfig;
use crate::caption_fetcher::CaptionFetcher;
use crate::providers::gemini::Gemini;
use crate::proxy_pool::ProxyPoolManager;
use crate::server::AppState;
use crate::transcript_cache::TranscriptCache;
use crate::translation::TranslationPipeline;
use crate::youtube::YouTubeCaptionSource;

mod app_config;
mod caption_fetcher;
mod errors;
mod language_utils;
mod progress;
mod providers;
mod proxy_pool;
mod server;
mod subtitle_processor;
mod transcript_cache;
mod translation;
mod youtube;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the subtitle server (default command)
    #[command(alias = "serve")]
    Serve(ServeArgs),

    /// Generate shell completions for tubesub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Port to listen on (overrides the configured port)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// tubesub - YouTube subtitle fetching and translation server
///
/// Fetches caption tracks from YouTube through a rotating proxy pool,
/// converts them to SRT, and translates them in batches with the Gemini API
/// while streaming progress to the client.
#[derive(Parser, Debug)]
#[command(name = "tubesub")]
#[command(version = "1.0.0")]
#[command(about = "YouTube subtitle fetching and translation server")]
#[command(long_about = "tubesub serves two endpoints: POST /fetch-subtitles turns a YouTube URL into
SRT text (optionally routed through a pool of public proxies), and
GET /process-subtitles translates an SRT payload in batches while streaming
progress over server-sent events.

EXAMPLES:
    tubesub                                # Serve using default config
    tubesub -p 8080                        # Listen on port 8080
    tubesub -c /etc/tubesub/conf.json      # Use a specific config file
    tubesub --log-level debug              # Verbose logging
    tubesub completions bash > tubesub.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Port to listen on (overrides the configured port)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());

            let color = match record.level() {
                Level::Error => "\x1B[1;31m",
                Level::Warn => "\x1B[1;33m",
                Level::Info => "\x1B[1;32m",
                Level::Debug => "\x1B[1;36m",
                Level::Trace => "\x1B[1;35m",
            };

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "tubesub", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Serve(args)) => run_server(args).await,
        None => {
            // Default behavior - use top-level args
            let serve_args = ServeArgs {
                port: cli.port,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_server(serve_args).await
        }
    }
}

async fn run_server(options: ServeArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    // Load or create configuration
    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader::<_, AppConfig>(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        // Create default configuration if not exists
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );

        let config = AppConfig::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Override config with CLI options if provided
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate the configuration after loading and overriding
    config
        .validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    // Seed the proxy pool before accepting requests, then keep it fresh in
    // the background
    let proxies = Arc::new(ProxyPoolManager::new(config.proxy.clone()));
    proxies.load_persisted().await;
    if !proxies.refresh().await && proxies.is_empty() {
        warn!("Starting without any pooled proxies; fetches will go direct until a refresh succeeds");
    }
    {
        let proxies = Arc::clone(&proxies);
        tokio::spawn(async move { proxies.run_refresh_loop().await });
    }

    let cache = if config.fetch.cache_enabled {
        let cache = match &config.fetch.cache_dir {
            Some(dir) => TranscriptCache::new(dir.clone()),
            None => TranscriptCache::new_default()?,
        };
        info!("Caching transcripts under {}", cache.path().display());
        Some(cache)
    } else {
        None
    };

    let fetcher = CaptionFetcher::new(
        Arc::new(YouTubeCaptionSource),
        Arc::clone(&proxies),
        config.fetch.clone(),
    );
    let backend = Arc::new(Gemini::new(
        config.translation.endpoint.clone(),
        config.translation.request_timeout(),
    ));
    let pipeline = TranslationPipeline::new(backend, &config.translation);

    let state = Arc::new(AppState::new(fetcher, pipeline, cache));
    server::serve(state, config.server.port).await
}
