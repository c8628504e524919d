//! TOML-based configuration for quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! schema = "./schema.toml"
//!
//! [database]
//! path = "${QUARRY_DATA}/app.db"
//! busy_timeout_ms = 2000
//! foreign_keys = true
//!
//! [query]
//! dialect = "postgres"
//! log_statements = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Schema file loaded by the CLI when none is given.
    pub schema: Option<String>,

    /// SQLite database.
    pub database: DatabaseSettings,

    /// Query compilation and logging.
    pub query: QuerySettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file, or `:memory:` (supports ${ENV_VAR} expansion).
    pub path: String,

    /// How long a statement waits on a locked database.
    pub busy_timeout_ms: u64,

    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

impl DatabaseSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<String, SettingsError> {
        let path = expand_env_vars(&self.path)?;
        if path.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "database.path must not be empty".to_string(),
            ));
        }
        Ok(path)
    }
}

/// Query configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Dialect statements are rendered in when no backend decides it.
    pub dialect: String,

    /// Log every executed statement at info level.
    pub log_statements: bool,

    /// Also log bound parameter values.
    pub log_params: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            dialect: "sqlite".to_string(),
            log_statements: false,
            log_params: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("QUARRY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get the configured dialect.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        self.query
            .dialect
            .parse()
            .map_err(|_| SettingsError::UnsupportedDialect(self.query.dialect.clone()))
    }

    /// Get the schema file path with environment variables expanded.
    pub fn schema_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.schema
            .as_deref()
            .map(|s| expand_env_vars(s).map(PathBuf::from))
            .transpose()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference `${{{}`",
                    var_name
                )));
            }
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
