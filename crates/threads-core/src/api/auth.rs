//! Email/password login.
//!
//! A successful `POST /auth/login/` makes the server set its session and
//! CSRF cookies; the shared jar picks them up, so nothing is stored here.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::CoreError;
use crate::api::session::Session;

/// Login route. The trailing slash is required by the server.
pub const LOGIN_PATH: &str = "/auth/login/";

/// Login credentials, supplied once per run and never persisted.
#[derive(Clone, Serialize)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Bundle an email and password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Account email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Log in on `session`.
///
/// Returns `Ok(true)` only when the server answers 200; any other status is
/// `Ok(false)` and leaves the session unauthenticated.
///
/// # Errors
///
/// Returns an error if the request cannot be sent.
pub fn login(session: &mut Session, credentials: &Credentials) -> Result<bool, CoreError> {
    let response = session
        .request(Method::POST, LOGIN_PATH)
        .json(credentials)
        .send()?;

    let status = response.status();
    if status != StatusCode::OK {
        log::warn!("login for {} rejected: {status}", credentials.email());
        return Ok(false);
    }

    session.mark_authenticated();
    log::info!("logged in as {}", credentials.email());
    Ok(true)
}
