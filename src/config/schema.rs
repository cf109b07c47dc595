//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the SSR gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SsrConfig {
    /// Development mode: watch the output directory and wait for the first
    /// build before serving.
    pub dev: bool,

    /// Build output directory holding `client.json`, `server.json` and the
    /// compiled client chunks.
    pub output_dir: PathBuf,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Document template overrides.
    pub templates: TemplatesConfig,

    /// Cache-Control directives per asset class.
    pub cache: CacheConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            dev: false,
            output_dir: PathBuf::from(".ssr"),
            listener: ListenerConfig::default(),
            templates: TemplatesConfig::default(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Template directory. Any of `main.html`, `404.html`, `500.html` found
/// there replaces the built-in document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub dir: Option<PathBuf>,
}

/// Cache-Control values sent with cached assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root document (`/`).
    pub index: String,

    /// Service worker script.
    pub service_worker: String,

    /// Hashed client chunks under `/client/`.
    pub chunks: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            index: "max-age=600".to_string(),
            service_worker: "no-cache".to_string(),
            chunks: "max-age=31536000".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body buffered for endpoints, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds. 0 disables it, which leaves a hung
    /// preload or render stalling its request indefinitely.
    pub request_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: SsrConfig = toml::from_str("").unwrap();
        assert!(!config.dev);
        assert_eq!(config.cache.chunks, "max-age=31536000");
        assert_eq!(config.timeouts.request_secs, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: SsrConfig = toml::from_str(
            r#"
            dev = true
            output_dir = "build"

            [cache]
            index = "no-store"
            "#,
        )
        .unwrap();
        assert!(config.dev);
        assert_eq!(config.output_dir, PathBuf::from("build"));
        assert_eq!(config.cache.index, "no-store");
        assert_eq!(config.cache.service_worker, "no-cache");
    }
}
