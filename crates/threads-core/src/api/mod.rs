//! Threads API session, authentication and resource client.
//!
//! This module provides:
//! - A cookie-backed session with CSRF header handling
//! - Email/password login
//! - Typed helpers for threads, references and messages
//! - The rich-text envelope used for message bodies

pub mod auth;
pub mod client;
pub mod envelope;
pub mod models;
pub mod session;

pub use auth::Credentials;
pub use client::ThreadsClient;
pub use envelope::{MessageEnvelope, format_message};
pub use models::{FileVersion, Message, Reference, ReferenceType, Thread};
pub use session::Session;
