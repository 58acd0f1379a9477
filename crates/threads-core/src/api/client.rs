//! Threads API client.
//!
//! Every call is a blocking request on the client's own [`Session`].
//! Reads only need the session cookie; POST and PATCH calls also attach the
//! CSRF header, re-read from the jar right before sending.

use std::path::Path;

use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::CoreError;
use crate::api::auth::{self, Credentials};
use crate::api::envelope::format_message;
use crate::api::models::{Message, Reference, ReferenceType, Thread};
use crate::api::session::Session;
use crate::config::ApiConfig;

/// Threads API client.
#[derive(Debug)]
pub struct ThreadsClient {
    session: Session,
}

impl ThreadsClient {
    /// Create a new, unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or HTTP client creation fails.
    pub fn new(api: &ApiConfig) -> Result<Self, CoreError> {
        Ok(Self {
            session: Session::new(api)?,
        })
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether [`login`](Self::login) has succeeded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Log in and keep the resulting cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent. A rejected login is
    /// `Ok(false)`, not an error.
    pub fn login(&mut self, email: &str, password: &str) -> Result<bool, CoreError> {
        auth::login(&mut self.session, &Credentials::new(email, password))
    }

    /// Headers required on mutating requests, built from the current cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if no CSRF cookie is present.
    pub fn required_headers(&self) -> Result<HeaderMap, CoreError> {
        self.session.required_headers()
    }

    /// List the threads visible to the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub fn list_threads(&self) -> Result<Vec<Thread>, CoreError> {
        let response = send(
            self.session.request(Method::GET, "/threads"),
            "list threads",
        )?;
        parse_json(response, "threads")
    }

    /// Fetch a reference's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub fn get_reference_metadata(&self, id: i64) -> Result<Reference, CoreError> {
        let response = send(
            self.session.request(Method::GET, &format!("/references/{id}")),
            "get reference",
        )?;
        parse_json(response, "reference")
    }

    /// Download the content of a file reference's first version.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoFileVersions`] for references without file
    /// versions (URL references), or an error if either request fails.
    pub fn get_reference(&self, id: i64) -> Result<Vec<u8>, CoreError> {
        let reference = self.get_reference_metadata(id)?;
        let version = reference
            .first_version()
            .ok_or(CoreError::NoFileVersions(id))?;

        let response = send(
            self.session.get_absolute(&version.file),
            "download reference file",
        )?;
        Ok(response.bytes()?.to_vec())
    }

    /// Create a FILE reference on a thread from a local file.
    ///
    /// Any 2xx status counts as success. The created reference is returned
    /// when the server echoes one back, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, no CSRF cookie is
    /// present, or the upload fails.
    pub fn upload_new_reference(
        &self,
        thread_id: i64,
        name: &str,
        file_path: &Path,
    ) -> Result<Option<Reference>, CoreError> {
        let form = Form::new()
            .text("name", name.to_string())
            .text("thread", thread_id.to_string())
            .text("reference_type", ReferenceType::File.as_str())
            .part("file", file_part(file_path)?);

        let response = send(
            self.session
                .request(Method::POST, "/references/")
                .headers(self.session.required_headers()?)
                .multipart(form),
            "upload reference",
        )?;
        parse_optional_json(response, "created reference")
    }

    /// Upload a new version of an existing reference.
    ///
    /// Like [`Self::upload_new_reference`], the updated reference is only
    /// returned when the 2xx body decodes as one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, no CSRF cookie is
    /// present, or the upload fails.
    pub fn upload_reference_version(
        &self,
        reference_id: i64,
        name: &str,
        file_path: &Path,
    ) -> Result<Option<Reference>, CoreError> {
        let form = Form::new()
            .text("name", name.to_string())
            .text("id", reference_id.to_string())
            .part("file", file_part(file_path)?);

        let response = send(
            self.session
                .request(Method::PATCH, &format!("/references/{reference_id}/"))
                .headers(self.session.required_headers()?)
                .multipart(form),
            "upload reference version",
        )?;
        parse_optional_json(response, "updated reference")
    }

    /// Post a message, then re-fetch the thread's messages.
    ///
    /// The re-fetched list is returned so callers can confirm the post.
    ///
    /// # Errors
    ///
    /// Returns an error if no CSRF cookie is present or either request fails.
    pub fn post_message(&self, thread_id: i64, text: &str) -> Result<Vec<Message>, CoreError> {
        let body = serde_json::json!({
            "text": format_message(text)?,
            "thread": thread_id,
        });

        send(
            self.session
                .request(Method::POST, "/messages/")
                .headers(self.session.required_headers()?)
                .json(&body),
            "post message",
        )?;

        self.get_messages(thread_id)
    }

    /// List a thread's messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub fn get_messages(&self, thread_id: i64) -> Result<Vec<Message>, CoreError> {
        let response = send(
            self.session
                .request(Method::GET, &format!("/threads/{thread_id}/messages")),
            "get messages",
        )?;
        parse_json(response, "messages")
    }
}

/// Send a request and turn non-success statuses into [`CoreError::Api`].
fn send(request: RequestBuilder, context: &str) -> Result<Response, CoreError> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(CoreError::Api {
            context: context.to_string(),
            status,
            body,
        });
    }
    Ok(response)
}

fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, CoreError> {
    let body = response.bytes()?;
    decode_json(&body, what)
}

fn decode_json<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, CoreError> {
    serde_json::from_slice(body)
        .map_err(|e| CoreError::Serialization(format!("parsing {what}: {e}")))
}

/// Decode a body the server may leave empty or fill with something else.
fn parse_optional_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<Option<T>, CoreError> {
    let body = response.bytes()?;
    if body.iter().all(u8::is_ascii_whitespace) {
        log::debug!("no {what} in response body");
        return Ok(None);
    }
    match decode_json(&body, what) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            log::debug!("ignoring response body: {err}");
            Ok(None)
        }
    }
}

/// Read a file into a multipart part named after the file.
fn file_part(file_path: &Path) -> Result<Part, CoreError> {
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::Path(format!("invalid file name: {}", file_path.display())))?
        .to_string();

    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bytes = std::fs::read(file_path)?;
    log::debug!("read {} bytes from {}", bytes.len(), file_path.display());

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for_ext(&ext))
        .map_err(|e| CoreError::Other(format!("setting upload content type: {e}")))
}

/// Map a file extension to a MIME type.
fn mime_for_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_lookup_defaults_to_octet_stream() {
        assert_eq!(mime_for_ext("pdf"), "application/pdf");
        assert_eq!(mime_for_ext("csv"), "text/csv");
        assert_eq!(mime_for_ext("bin"), "application/octet-stream");
        assert_eq!(mime_for_ext(""), "application/octet-stream");
    }

    #[test]
    fn decode_error_names_the_missing_field() {
        let err = decode_json::<Thread>(br#"{"name": "General"}"#, "threads")
            .expect_err("id is required");
        let message = err.to_string();
        assert!(matches!(err, CoreError::Serialization(_)));
        assert!(message.contains("parsing threads"), "{message}");
        assert!(message.contains("missing field `id`"), "{message}");
    }

    #[test]
    fn missing_upload_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = file_part(&dir.path().join("absent.pdf")).expect_err("should fail");
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn mutating_calls_fail_locally_before_login() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"data").expect("write");

        let client = ThreadsClient::new(&ApiConfig::with_base_url("http://127.0.0.1:9/v1"))
            .expect("client");
        assert!(!client.is_authenticated());
        assert!(matches!(
            client.upload_new_reference(1, "doc", &path),
            Err(CoreError::Auth(_))
        ));
        assert!(matches!(
            client.post_message(1, "hi"),
            Err(CoreError::Auth(_))
        ));
    }
}
