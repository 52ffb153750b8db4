//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLSIFT_CONFIG` (environment variable)
//! 2. `~/.config/emlsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\emlsift\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Parsing limits.
    pub parser: ParserConfig,
    /// Link extraction settings.
    pub links: LinksConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Parsing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum multipart nesting depth.
    pub max_depth: usize,
}

/// Link extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Host suffixes recognized as safe-link redirectors.
    pub safe_link_suffixes: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: crate::parser::tree::DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            safe_link_suffixes: crate::links::KNOWN_SAFE_LINK_SUFFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMLSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("emlsift").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.parser.max_depth, 16);
        assert_eq!(
            cfg.links.safe_link_suffixes,
            ["safelinks.protection.outlook.com"]
        );
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.parser.max_depth, cfg.parser.max_depth);
        assert_eq!(parsed.links.safe_link_suffixes, cfg.links.safe_link_suffixes);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[parser]
max_depth = 4
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.parser.max_depth, 4);
        assert_eq!(cfg.general.log_level, "warn");
        assert!(!cfg.links.safe_link_suffixes.is_empty());
    }
}
