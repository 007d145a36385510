//! Server configuration — all from environment variables.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the page, the stream and the ingest endpoint.
    pub listen_addr: String,
    /// Log level filter.
    pub log_level: String,
    /// Base64-encoded 32-byte seed for the session signing key.
    /// When unset a built-in development key is used.
    pub session_secret: Option<String>,
    /// Mark the session cookie `Secure`. Off by default: the demo assumes
    /// plaintext transport.
    pub cookie_secure: bool,
    /// Session cookie lifetime in seconds.
    pub session_max_age: u64,
    /// How long a message stays live before it is evicted.
    pub message_ttl: Duration,
    /// Broadcast tick per viewer.
    pub tick_interval: Duration,
    /// Longest accepted message, in characters.
    pub max_message_len: usize,
    /// Directory served under /static. When unset the embedded assets are
    /// served instead.
    pub static_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".into(),
            log_level: "voidd=info,tower_http=info".into(),
            session_secret: None,
            cookie_secure: false,
            session_max_age: 24 * 60 * 60,
            message_ttl: Duration::from_secs(10),
            tick_interval: Duration::from_millis(200),
            max_message_len: 500,
            static_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
            session_secret: env::var("SESSION_SECRET").ok().filter(|s| !s.is_empty()),
            cookie_secure: env::var("COOKIE_SECURE")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.cookie_secure),
            session_max_age: parsed("SESSION_MAX_AGE").unwrap_or(defaults.session_max_age),
            message_ttl: parsed("MESSAGE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.message_ttl),
            tick_interval: parsed("TICK_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            max_message_len: parsed("MAX_MESSAGE_LEN").unwrap_or(defaults.max_message_len),
            static_dir: env::var("STATIC_DIR").ok().filter(|s| !s.is_empty()),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Boolean env values: `1/true/yes/on` and `0/false/no/off`, any case.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
