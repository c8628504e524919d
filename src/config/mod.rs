//! Configuration module for quarry.
//!
//! Handles the database, query logging and environment variable settings.

mod settings;

pub use settings::{expand_env_vars, DatabaseSettings, QuerySettings, Settings, SettingsError};
