//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the fixed
//! operational constants (pagination windowing aside, which lives with the
//! pagination engine): timeouts, size ceilings, pacing, retry policy.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Root directory for per-user download subdirectories
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,

    /// Port for the keep-alive HTTP server
    #[serde(default = "default_keep_alive_port")]
    pub keep_alive_port: u16,

    /// URL the self-ping task requests; defaults to the local keep-alive
    /// server when unset
    pub self_ping_url: Option<String>,
}

fn default_downloads_dir() -> String {
    "downloads".to_string()
}

const fn default_keep_alive_port() -> u16 {
    8080
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `TELEGRAM_TOKEN` is
    /// missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly.
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Effective self-ping target: configured URL or the local server.
    #[must_use]
    pub fn self_ping_target(&self) -> String {
        self.self_ping_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/", self.keep_alive_port))
    }
}

// Search configuration
/// Upper bound on results requested from the provider per search
pub const SEARCH_MAX_RESULTS: usize = 50;
/// Overall deadline for one provider search call. Downloads carry no
/// deadline: once started they run to completion or failure.
pub const SEARCH_TIMEOUT_SECS: u64 = 60;

// Politeness pacing before provider calls (rate-limit avoidance, not a
// correctness mechanism)
/// Delay range before a search call, milliseconds
pub const SEARCH_PACING_MS: (u64, u64) = (500, 2000);
/// Delay range before a download call, milliseconds
pub const DOWNLOAD_PACING_MS: (u64, u64) = (1000, 3000);

// Delivery configuration
/// Telegram bot upload ceiling: 50 MiB
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

// Telegram API retry configuration
/// Max retry attempts for transient Telegram API failures
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

// Keep-alive configuration
/// Interval between best-effort self-pings
pub const SELF_PING_INTERVAL_SECS: u64 = 300;

/// Browser user agents rotated across yt-dlp invocations to reduce the
/// chance of upstream throttling
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("TELEGRAM_TOKEN", "dummy_token");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.downloads_dir, "downloads");
        assert_eq!(settings.keep_alive_port, 8080);
        assert_eq!(settings.self_ping_target(), "http://localhost:8080/");

        env::remove_var("TELEGRAM_TOKEN");
        Ok(())
    }
}
