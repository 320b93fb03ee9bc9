use std::path::PathBuf;

use chrono::Duration;
use rand::RngCore;
use turnstile_core::MatchPolicy;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Listen address (default: 0.0.0.0:8080).
    pub bind_addr: String,
    /// Externally reachable base URL, embedded in kiosk links.
    pub public_url: String,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// HMAC secret for kiosk access tokens.
    pub token_secret: Vec<u8>,
    /// Kiosk token lifetime in hours.
    pub token_ttl_hours: i64,
    /// Distance below which a gallery candidate is accepted.
    pub accept_threshold: f32,
    /// Best-vs-runner-up gap below which a match is refused as ambiguous.
    pub ambiguity_margin: f32,
    /// Distance below which an enrollment collides with another member.
    pub duplicate_threshold: f32,
    /// Timeout in seconds for remote recognition calls.
    pub remote_timeout_secs: u64,
    /// Upper bound on uploaded probe images.
    pub max_image_bytes: usize,
}

impl Config {
    /// Load configuration from `TURNSTILE_*` environment variables with
    /// defaults. The matching thresholds are deployment calibration, not
    /// constants; revalidate them against labeled data before changing.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("turnstile");

        let db_path = std::env::var("TURNSTILE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("turnstile.db"));

        let token_secret = match std::env::var("TURNSTILE_TOKEN_SECRET") {
            Ok(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                // Ephemeral secret: issued tokens die with this process.
                tracing::warn!(
                    "TURNSTILE_TOKEN_SECRET not set; using a random secret, \
                     kiosk tokens will not survive a restart"
                );
                let mut buf = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut buf);
                buf.to_vec()
            }
        };

        Self {
            bind_addr: std::env::var("TURNSTILE_BIND")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            public_url: std::env::var("TURNSTILE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            db_path,
            token_secret,
            token_ttl_hours: env_i64("TURNSTILE_TOKEN_TTL_HOURS", 24),
            accept_threshold: env_f32("TURNSTILE_ACCEPT_THRESHOLD", 0.38),
            ambiguity_margin: env_f32("TURNSTILE_AMBIGUITY_MARGIN", 0.12),
            duplicate_threshold: env_f32("TURNSTILE_DUPLICATE_THRESHOLD", 0.28),
            remote_timeout_secs: env_u64("TURNSTILE_REMOTE_TIMEOUT_SECS", 10),
            max_image_bytes: env_usize("TURNSTILE_MAX_IMAGE_BYTES", 5 * 1024 * 1024),
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            accept_threshold: self.accept_threshold,
            ambiguity_margin: self.ambiguity_margin,
            duplicate_threshold: self.duplicate_threshold,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
