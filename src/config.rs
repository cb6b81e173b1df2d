use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::widget::{MarkupPolicy, WidgetSettings};

/// Prefix for environment overrides, e.g. `CHAT_SERVER__PORT=8000`.
pub const ENV_PREFIX: &str = "CHAT";

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "BIND_ADDRESS")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Delay before the bot echo, in milliseconds
    #[arg(long, env = "ECHO_DELAY_MS")]
    pub echo_delay_ms: Option<u64>,

    /// HTML-escape message text in rendered entries
    #[arg(long, env = "ESCAPE_MARKUP")]
    pub escape_markup: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub widget: WidgetConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_dir: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub echo_delay_ms: u64,
    pub escape_markup: bool,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
}

impl WidgetConfig {
    pub fn settings(&self) -> WidgetSettings {
        WidgetSettings {
            echo_delay: Duration::from_millis(self.echo_delay_ms),
            markup: MarkupPolicy::from_escape_flag(self.escape_markup),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl ResilienceConfig {
    /// Request timeout; a year when disabled so the layer stack keeps one type.
    pub fn request_timeout(&self) -> Duration {
        if self.timeout_disabled {
            Duration::from_secs(365 * 24 * 60 * 60)
        } else {
            Duration::from_secs(self.request_timeout_secs)
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `CHAT_` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default(
                "server.cors_origins",
                vec![
                    "http://localhost:3000",
                    "http://localhost:8080",
                    "http://localhost:8000",
                    "https://localhost:3000",
                    "https://localhost:8080",
                    "https://localhost:8000",
                ],
            )?
            .set_default("widget.echo_delay_ms", 1000)?
            .set_default("widget.escape_markup", true)?
            .set_default("widget.idle_timeout_secs", 30 * 60)?
            .set_default("widget.sweep_interval_secs", 60)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 30)?;

        // Explicit file must exist; the cwd fallback is optional.
        match &cli.config {
            Some(path) => builder = builder.add_source(File::with_name(path).required(true)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(delay) = cli.echo_delay_ms {
            builder = builder.set_override("widget.echo_delay_ms", delay)?;
        }
        if let Some(escape) = cli.escape_markup {
            builder = builder.set_override("widget.escape_markup", escape)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        builder.build()?.try_deserialize()
    }
}
