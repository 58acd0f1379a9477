//! HTTP session: one blocking client, one cookie jar.
//!
//! The server authenticates with a session cookie and protects mutating
//! routes with a CSRF token it also issues as a cookie. Both live in the jar
//! shared with the HTTP client, so every request sends whatever the server
//! last set. The CSRF value is read back out of the jar on each mutating
//! call because the server may rotate it.

use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use crate::CoreError;
use crate::config::ApiConfig;

/// Cookie the server stores its CSRF token in.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the server expects the CSRF token echoed in.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Cookie-backed API session.
#[derive(Debug)]
pub struct Session {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
    authenticated: bool,
}

impl Session {
    /// Create a session for the configured API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or HTTP client creation fails.
    pub fn new(api: &ApiConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(api.base_url.trim_end_matches('/'))
            .map_err(|e| CoreError::Config(format!("invalid base URL {}: {e}", api.base_url)))?;

        let jar = Arc::new(Jar::default());
        let mut builder = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(api.timeout_duration());
        if let Some(ref agent) = api.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let http = builder
            .build()
            .map_err(|e| CoreError::Other(format!("creating HTTP client: {e}")))?;

        Ok(Self {
            http,
            jar,
            base_url,
            authenticated: false,
        })
    }

    /// API root this session talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a login has succeeded on this session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) const fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Absolute URL for an API path such as `/references/`.
    ///
    /// The path is appended verbatim, so trailing slashes the server
    /// requires are preserved.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Start a request against an API path.
    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::blocking::RequestBuilder {
        let url = self.endpoint(path);
        log::debug!("{method} {url}");
        self.http.request(method, url)
    }

    /// Start a GET against an absolute URL, e.g. a file download link.
    pub(crate) fn get_absolute(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        log::debug!("GET {url}");
        self.http.get(url)
    }

    /// Current CSRF token, read fresh from the cookie jar.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let cookies = header.to_str().ok()?;
        cookie_value(cookies, CSRF_COOKIE).map(str::to_string)
    }

    /// Headers every POST/PATCH must carry.
    ///
    /// # Errors
    ///
    /// Returns an error if the jar holds no CSRF cookie (no successful
    /// login yet) or the value is not a valid header.
    pub fn required_headers(&self) -> Result<HeaderMap, CoreError> {
        let token = self.csrf_token().ok_or_else(|| {
            CoreError::Auth(format!("no {CSRF_COOKIE} cookie in session; log in first"))
        })?;
        let value = HeaderValue::from_str(&token)
            .map_err(|e| CoreError::Auth(format!("invalid {CSRF_COOKIE} cookie value: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(CSRF_HEADER), value);
        Ok(headers)
    }

    /// Store a cookie as if the API root had set it.
    pub fn add_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.base_url);
    }
}

/// Look up one cookie in a `Cookie` header value (`a=1; b=2`).
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&ApiConfig::with_base_url("https://api.example.test/v1")).expect("session")
    }

    #[test]
    fn cookie_value_finds_named_pair() {
        let header = "sessionid=abc; csrftoken=tok=en; other=1";
        assert_eq!(cookie_value(header, "csrftoken"), Some("tok=en"));
        assert_eq!(cookie_value(header, "sessionid"), Some("abc"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("xcsrftoken=nope", "csrftoken"), None);
    }

    #[test]
    fn endpoint_keeps_trailing_slash() {
        let session = session();
        assert_eq!(
            session.endpoint("/references/"),
            "https://api.example.test/v1/references/"
        );
        assert_eq!(
            session.endpoint("/threads"),
            "https://api.example.test/v1/threads"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let session = Session::new(&ApiConfig::with_base_url("https://api.example.test/v1/"))
            .expect("session");
        assert_eq!(
            session.endpoint("/auth/login/"),
            "https://api.example.test/v1/auth/login/"
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = Session::new(&ApiConfig::with_base_url("not a url")).expect_err("should fail");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn required_headers_without_cookie_is_auth_error() {
        let session = session();
        assert!(!session.is_authenticated());
        assert!(matches!(
            session.required_headers(),
            Err(CoreError::Auth(_))
        ));
    }

    #[test]
    fn required_headers_track_rotated_cookie() {
        let session = session();
        session.add_cookie("csrftoken=first; Path=/");
        let before = session.required_headers().expect("headers");
        assert_eq!(before[CSRF_HEADER], "first");

        session.add_cookie("csrftoken=second; Path=/");
        let after = session.required_headers().expect("headers");
        assert_eq!(after[CSRF_HEADER], "second");
        assert_eq!(before[CSRF_HEADER], "first");
    }
}
