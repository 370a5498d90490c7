use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ProviderRedirects;
use crate::auth::RefreshPolicy;

const DEFAULT_SESSION_DB: &str = "~/.kkom/session.sqlite3";
const DEFAULT_REFRESH_TOKEN_MAX_AGE: u64 = 7 * 24 * 60 * 60;

/// Kkom-Kkom API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// API base URL
    #[arg(short = 'u', long, env = "KKOM_API_URL")]
    pub api_url: Option<String>,

    /// Path to the persisted session store
    #[arg(short = 'd', long, env = "SESSION_DB_FILE")]
    pub session_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// How concurrent 401s share a refresh (independent, single-flight)
    #[arg(long, env = "REFRESH_POLICY", default_value = "independent")]
    pub refresh_policy: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Parse the command line, with variables from a `.env` file as fallbacks
    pub fn load() -> Self {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

/// Shape of log lines written to stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse a format name, defaulting to text for anything unrecognized
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in with email and password and store the session
    Login {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Send a request through the authenticated client and print the body
    Request {
        /// HTTP method
        method: String,

        /// Path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Do not attach the stored access token
        #[arg(long)]
        no_auth: bool,
    },

    /// Report whether a session is stored
    Status,

    /// Forget the stored session
    Logout,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_url: Url,

    // Session store
    pub session_db_file: PathBuf,
    pub access_token_max_age: Duration,
    pub refresh_token_max_age: Duration,
    pub refresh_policy: RefreshPolicy,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // OAuth
    pub provider_redirects: ProviderRedirects,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Build configuration from parsed arguments, filling the rest from the environment
    ///
    /// Priority is CLI > ENV > defaults; clap already folds `KKOM_API_URL` and the other
    /// argument variables into `args`.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let api_url = args
            .api_url
            .context("KKOM_API_URL is required (use -u or set KKOM_API_URL env var)")?;
        let api_url =
            Url::parse(&api_url).with_context(|| format!("KKOM_API_URL is not a valid URL: {}", api_url))?;

        let config = Config {
            api_url,

            session_db_file: expand_tilde(args.session_db.as_deref().unwrap_or(DEFAULT_SESSION_DB)),

            access_token_max_age: Duration::from_secs(env_or("ACCESS_TOKEN_MAX_AGE", 3600)),

            refresh_token_max_age: Duration::from_secs(env_or(
                "REFRESH_TOKEN_MAX_AGE",
                DEFAULT_REFRESH_TOKEN_MAX_AGE,
            )),

            refresh_policy: RefreshPolicy::parse(&args.refresh_policy),

            http_max_connections: env_or("HTTP_MAX_CONNECTIONS", 20),

            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 10),

            http_request_timeout: args.http_timeout,

            provider_redirects: ProviderRedirects {
                kakao: std::env::var("KAKAO_REDIRECT_URL").ok(),
                google: std::env::var("GOOGLE_REDIRECT_URL").ok(),
            },

            log_format: LogFormat::parse(&args.log_format),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.api_url.scheme(), "http" | "https") {
            anyhow::bail!(
                "KKOM_API_URL must use http or https, got: {}",
                self.api_url.scheme()
            );
        }

        if self.http_connect_timeout == 0 || self.http_request_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        if self.access_token_max_age.is_zero() {
            anyhow::bail!("ACCESS_TOKEN_MAX_AGE must be greater than zero");
        }

        Ok(())
    }
}

/// Read a numeric environment variable, falling back to `default` when unset or invalid
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(
                key = key,
                value = %raw,
                "Invalid value for {}, using default {}",
                key,
                default
            );
            default
        }
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
