//! Service configuration read from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::guard::RetryPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:6573";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Replacement card catalog (None = built-in packs)
    pub card_packs_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6573)),
            card_packs_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults on bad values
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = match non_empty_var("BIND_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid BIND_ADDR '{}', using {}",
                    raw,
                    DEFAULT_BIND_ADDR
                );
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let card_packs_path = non_empty_var("CARD_PACKS_PATH").map(PathBuf::from);

        let max_attempts = parse_var("MUTATION_MAX_ATTEMPTS", defaults.retry.max_attempts)
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                tracing::warn!("MUTATION_MAX_ATTEMPTS must be at least 1, using default");
                defaults.retry.max_attempts
            });

        let base_delay = parse_var(
            "MUTATION_BACKOFF_MS",
            defaults.retry.base_delay.as_millis() as u64,
        )
        .map(Duration::from_millis)
        .unwrap_or(defaults.retry.base_delay);

        Self {
            bind_addr,
            card_packs_path,
            retry: RetryPolicy {
                max_attempts,
                base_delay,
                max_delay: defaults.retry.max_delay.max(base_delay),
            },
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Unset means `default`; a value that doesn't parse yields None
fn parse_var<T: std::str::FromStr + Copy>(key: &str, default: T) -> Option<T> {
    match non_empty_var(key) {
        None => Some(default),
        Some(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Invalid {} '{}', ignoring", key, raw);
                None
            }
        },
    }
}
