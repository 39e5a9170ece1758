//! Configuration for the session router.
//!
//! Unlike a file-based config, every setting here comes from the process
//! environment and is validated once at startup — before any port is bound
//! or any connection to the coordination store is attempted. Missing
//! required values or malformed ones are fatal: there is no partially-valid
//! config that gets silently used.
//!
//! # Recognized variables
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `BACKEND_IPS` | yes | — |
//! | `MAX_REQUESTS_PER_BACKEND` | yes | — |
//! | `REDIS_URL` | yes | — |
//! | `PORT` | no | `8080` |
//! | `MAPPING_TTL_IN_S` | no | `3600` |
//! | `ALLOW_ORIGIN` | no | `*` |

use anyhow::{Context, Result};

/// CORS allow-list parsed from `ALLOW_ORIGIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowOrigin {
    /// `ALLOW_ORIGIN=*` (or unset) — any origin is reflected.
    Any,
    /// Comma-separated exact-match allow-list.
    List(Vec<String>),
}

impl AllowOrigin {
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            AllowOrigin::Any => true,
            AllowOrigin::List(entries) => entries.iter().any(|e| e == origin),
        }
    }
}

/// Fully validated process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Static pool of backend addresses (host[:port] strings, port always appended at call time).
    pub backend_ips: Vec<String>,
    /// Soft cap on live sessions per backend, used for selection only.
    pub max_requests_per_backend: u64,
    /// Coordination-store connection URL, including auth in the user-info component.
    pub redis_url: String,
    /// Bind port for the router's own HTTP server.
    pub port: u16,
    /// TTL, in seconds, applied to the forward mapping and the liveness window.
    pub mapping_ttl_secs: u64,
    /// Parsed CORS allow-list.
    pub allow_origin: AllowOrigin,
}

impl Config {
    /// Load and validate configuration from the process environment.
    ///
    /// Fails fast with a descriptive error on the first missing or malformed
    /// value, rather than falling back to a guess.
    pub fn from_env() -> Result<Self> {
        let backend_ips = parse_backend_ips(&require_env("BACKEND_IPS")?)?;

        let max_requests_per_backend = require_env("MAX_REQUESTS_PER_BACKEND")?
            .parse::<u64>()
            .context("MAX_REQUESTS_PER_BACKEND must be a non-negative integer")?;

        let redis_url = require_env("REDIS_URL")?;

        let port = std::env::var("PORT")
            .ok()
            .map(|v| v.parse::<u16>().context("PORT must be a valid port number"))
            .transpose()?
            .unwrap_or(defaults::port());

        let mapping_ttl_secs = std::env::var("MAPPING_TTL_IN_S")
            .ok()
            .map(|v| v.parse::<u64>().context("MAPPING_TTL_IN_S must be a non-negative integer"))
            .transpose()?
            .unwrap_or(defaults::mapping_ttl_secs());

        let allow_origin = match std::env::var("ALLOW_ORIGIN") {
            Ok(v) if v == "*" || v.is_empty() => AllowOrigin::Any,
            Ok(v) => AllowOrigin::List(v.split(',').map(|s| s.trim().to_string()).collect()),
            Err(_) => AllowOrigin::Any,
        };

        Ok(Self {
            backend_ips,
            max_requests_per_backend,
            redis_url,
            port,
            mapping_ttl_secs,
            allow_origin,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("missing required environment variable `{name}`"))?;
    anyhow::ensure!(!value.is_empty(), "environment variable `{name}` must not be empty");
    Ok(value)
}

fn parse_backend_ips(raw: &str) -> Result<Vec<String>> {
    let ips: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(!ips.is_empty(), "BACKEND_IPS must list at least one backend address");
    Ok(ips)
}

mod defaults {
    pub fn port() -> u16 {
        8080
    }
    pub fn mapping_ttl_secs() -> u64 {
        3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation races across tests in the same process —
    // serialize all tests in this module through one lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            "BACKEND_IPS",
            "MAX_REQUESTS_PER_BACKEND",
            "REDIS_URL",
            "PORT",
            "MAPPING_TTL_IN_S",
            "ALLOW_ORIGIN",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set(var: &str, value: &str) {
        unsafe { std::env::set_var(var, value) };
    }

    fn minimal_required() {
        set("BACKEND_IPS", "10.0.0.1,10.0.0.2");
        set("MAX_REQUESTS_PER_BACKEND", "5");
        set("REDIS_URL", "rediss://:pw@coord.internal:6380");
    }

    #[test]
    fn loads_with_defaults_when_optional_vars_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        minimal_required();

        let config = Config::from_env().expect("should load");
        assert_eq!(config.backend_ips, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(config.max_requests_per_backend, 5);
        assert_eq!(config.port, 8080);
        assert_eq!(config.mapping_ttl_secs, 3600);
        assert_eq!(config.allow_origin, AllowOrigin::Any);
    }

    #[test]
    fn missing_backend_ips_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set("MAX_REQUESTS_PER_BACKEND", "5");
        set("REDIS_URL", "rediss://coord.internal:6380");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn missing_max_requests_per_backend_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set("BACKEND_IPS", "10.0.0.1");
        set("REDIS_URL", "rediss://coord.internal:6380");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn non_integer_ttl_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        minimal_required();
        set("MAPPING_TTL_IN_S", "not-a-number");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("MAPPING_TTL_IN_S"));
    }

    #[test]
    fn empty_backend_ips_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set("BACKEND_IPS", "   ");
        set("MAX_REQUESTS_PER_BACKEND", "5");
        set("REDIS_URL", "rediss://coord.internal:6380");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn allow_origin_parses_comma_separated_list() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        minimal_required();
        set("ALLOW_ORIGIN", "https://a.example, https://b.example");

        let config = Config::from_env().expect("should load");
        match config.allow_origin {
            AllowOrigin::List(entries) => {
                assert_eq!(entries, vec!["https://a.example".to_string(), "https://b.example".to_string()]);
            }
            AllowOrigin::Any => panic!("expected a parsed list"),
        }
    }

    #[test]
    fn allow_origin_star_means_any() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        minimal_required();
        set("ALLOW_ORIGIN", "*");

        let config = Config::from_env().expect("should load");
        assert_eq!(config.allow_origin, AllowOrigin::Any);
    }

    #[test]
    fn allows_checks_exact_match() {
        let list = AllowOrigin::List(vec!["https://ok.example".to_string()]);
        assert!(list.allows("https://ok.example"));
        assert!(!list.allows("https://evil.example"));
        assert!(AllowOrigin::Any.allows("https://anything.example"));
    }
}
