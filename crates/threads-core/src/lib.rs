//! Core library for threads - a client for the Threads messaging API.
//!
//! This crate provides:
//! - Configuration loading and management
//! - XDG-compliant path resolution
//! - Schema and example config generation
//! - A cookie-backed API session with CSRF handling
//! - Typed helpers for threads, references and messages
//! - Common types and error handling

pub mod api;
pub mod config;
pub mod error;
pub mod paths;
pub mod schema;

pub use api::{
    Credentials, FileVersion, Message, MessageEnvelope, Reference, ReferenceType, Session,
    Thread, ThreadsClient, format_message,
};
pub use config::{ApiConfig, AppConfig, LogLevel, LoggingConfig};
pub use error::{CoreError, Result};
pub use paths::{AppPaths, default_config_dir};
pub use schema::{generate_example_config, generate_schema, write_generated_files};

/// Application name used for config directories and environment prefix.
pub const APP_NAME: &str = "threads";

/// Versioned REST root of the hosted Threads API.
pub const DEFAULT_BASE_URL: &str = "https://api.threads.dev-auth2.com/v1";

/// Returns the environment variable prefix for this application.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
