//! Blocking JSON client with retries.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use super::error::{ApiError, ApiErrorCode};
use super::retry::RetryPolicy;
use crate::error::{MoveMintError, Result};

const USER_AGENT: &str = concat!("movemint/", env!("CARGO_PKG_VERSION"));

const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Called with `(bytes_sent, total_bytes)` while a file uploads.
pub type UploadProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// JSON client for the minting engine.
///
/// Every request goes through the [`RetryPolicy`]; request bodies are rebuilt
/// on each attempt so multipart uploads can be retried.
pub struct ApiClient {
    base_url: String,
    http: Client,
    timeout: Duration,
    upload_timeout: Duration,
    retry: RetryPolicy,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("retry", &self.retry)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MoveMintError::Config(format!(
                "api.base_url must start with http:// or https://, got '{base_url}'"
            )));
        }
        if base_url.starts_with("http://") && !is_local(&base_url) {
            warn!(base_url = %base_url, "engine URL uses unencrypted HTTP");
        }

        let timeout = timeout.max(Duration::from_millis(1));
        let http = build_http(timeout, USER_AGENT)?;
        Ok(Self {
            base_url,
            http,
            timeout,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT.max(timeout),
            retry: RetryPolicy::default(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whole-request limit for [`ApiClient::upload_file`]. The client-wide
    /// timeout would otherwise cut off large files mid-transfer.
    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Replace the default `movemint/<version>` user agent.
    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self> {
        let user_agent = user_agent.trim();
        if !user_agent.is_empty() {
            self.http = build_http(self.timeout, user_agent)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, |req| req)
    }

    pub fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::POST, path, |req| req.json(body))
    }

    pub fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::PUT, path, |req| req.json(body))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, |req| req)
    }

    /// Upload a file as the multipart field `field`.
    pub fn upload_file<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file: &Path,
        progress: Option<UploadProgress>,
    ) -> Result<T> {
        let metadata = std::fs::metadata(file)?;
        if !metadata.is_file() {
            return Err(MoveMintError::ValidationFailed(format!(
                "{} is not a file",
                file.display()
            )));
        }
        let total = metadata.len();
        let file_name = file
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        let mime = mime_for(file);

        let url = self.url(path);
        let label = format!("POST {path}");
        debug!(url = %url, file = %file.display(), bytes = total, "uploading file");

        let result = self.retry.execute(&label, |attempt| {
            let reader = File::open(file).map_err(|err| {
                ApiError::new(
                    ApiErrorCode::Unknown,
                    format!("Cannot read {}: {err}", file.display()),
                )
            })?;
            let reader = CountingReader {
                inner: reader,
                sent: 0,
                total,
                progress: progress.clone(),
            };
            let part = multipart::Part::reader_with_length(reader, total)
                .file_name(file_name.clone())
                .mime_str(mime)
                .map_err(|err| ApiError::invalid_response(format!("bad mime type: {err}")))?;
            let form = multipart::Form::new().part(field.to_string(), part);
            let request = self
                .authorize(self.http.post(&url))
                .timeout(self.upload_timeout)
                .multipart(form);
            self.attempt(request, &label, attempt, self.upload_timeout)
        })?;
        Ok(result)
    }

    fn send<T, F>(&self, method: Method, path: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url(path);
        let label = format!("{method} {path}");
        let result = self.retry.execute(&label, |attempt| {
            let request = build(self.authorize(self.http.request(method.clone(), &url)));
            self.attempt(request, &label, attempt, self.timeout)
        })?;
        Ok(result)
    }

    fn attempt<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        label: &str,
        attempt: u32,
        timeout: Duration,
    ) -> std::result::Result<T, ApiError> {
        let started = Instant::now();
        let response = request.send().map_err(|err| transport_error(&err, timeout))?;
        let status = response.status();
        trace!(
            request = label,
            attempt,
            status = status.as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "response"
        );
        decode(response, status, timeout)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn build_http(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|err| MoveMintError::Config(format!("engine http client: {err}")))
}

fn transport_error(err: &reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(timeout)
    } else if err.is_decode() {
        ApiError::invalid_response(err.to_string())
    } else {
        ApiError::network(format!("Could not reach the engine: {err}"))
    }
}

fn decode<T: DeserializeOwned>(
    response: Response,
    status: StatusCode,
    timeout: Duration,
) -> std::result::Result<T, ApiError> {
    let retry_after = retry_after(response.headers());
    let body = response.text().map_err(|err| {
        if err.is_timeout() {
            ApiError::timeout(timeout)
        } else {
            ApiError::network(format!("Failed to read response body: {err}"))
        }
    })?;

    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), &body).with_retry_after(retry_after));
    }

    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|err| {
        ApiError::invalid_response(format!("Unexpected response from the engine: {err}"))
            .with_details(serde_json::json!({ "status": status.as_u16() }))
    })
}

/// `Retry-After` in delta-seconds form. HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn is_local(url: &str) -> bool {
    let host = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    matches!(host, "localhost" | "127.0.0.1") || host.starts_with('[')
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

struct CountingReader {
    inner: File,
    sent: u64,
    total: u64,
    progress: Option<UploadProgress>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sent += n as u64;
        if let Some(progress) = &self.progress {
            progress(self.sent.min(self.total), self.total);
        }
        Ok(n)
    }
}
