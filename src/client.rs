//! Authenticated channel to the CA's REST api.
//!
//! [`CaClient`] holds a single blocking HTTP client configured once from a
//! [`ClientConfig`]. Every request carries the api key, a user agent and a JSON
//! `Accept` header. Responses with a status of 300 or more are turned into
//! [`CertOrderError::ApiRequestRejected`] errors carrying the CA's error list, or
//! the raw body when it cannot be decoded.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use bon::Builder;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Request, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::ApiErrors;
use crate::error::{CertOrderError, RejectionDetail, Result};
use crate::tls::build_rustls_config;

/// Base URL of the production api.
pub const DEFAULT_BASE_URL: &str = "https://www.digicert.com/services/v2";
/// Header carrying the api key.
pub const API_KEY_HEADER: &str = "X-DC-DEVKEY";
/// User agent sent with every request.
pub const CLIENT_USER_AGENT: &str = concat!("certorder/", env!("CARGO_PKG_VERSION"));

const JSON: &str = "application/json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const WIRE_TARGET: &str = "certorder::wire";

/// Settings of a [`CaClient`], fixed at construction.
///
/// # Example
///
/// ```
/// use certorder::client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_key("0123456789abcdef")
///     .debug(true)
///     .build();
/// assert_eq!(config.base_url(), "https://www.digicert.com/services/v2");
/// ```
#[derive(Clone, Builder)]
pub struct ClientConfig {
    #[builder(into)]
    api_key: String,
    #[builder(into, default = DEFAULT_BASE_URL.to_owned())]
    base_url: String,
    /// Render every request and response through `tracing` at debug level.
    #[builder(default)]
    debug: bool,
    #[builder(default = Duration::from_secs(DEFAULT_TIMEOUT_SECS))]
    timeout: Duration,
}

impl ClientConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("debug", &self.debug)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the CA's REST api.
#[derive(Debug)]
pub struct CaClient {
    config: ClientConfig,
    http: Client,
}

impl CaClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientConfiguration` if the TLS settings or the HTTP client cannot
    /// be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let tls = build_rustls_config()?;
        let http = Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CertOrderError::ClientConfiguration(error_chain(&e)))?;

        Ok(Self { config, http })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn get(&self, path: &str) -> Result<Response> {
        self.execute(self.http.get(self.url(path)))
    }

    pub(crate) fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let body = serde_json::to_vec(body).map_err(|e| {
            CertOrderError::InvalidInput(format!("failed to marshal request body: {e}"))
        })?;
        self.execute(
            self.http
                .post(self.url(path))
                .header(CONTENT_TYPE, JSON)
                .body(body),
        )
    }

    /// Sends a request to the api after adding authentication headers.
    ///
    /// Responses with a status below 300 are handed back unread; the caller owns the
    /// body. Anything else is turned into an error.
    pub fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let mut api_key = HeaderValue::from_str(&self.config.api_key).map_err(|_| {
            CertOrderError::InvalidInput("api key is not a valid header value".to_string())
        })?;
        api_key.set_sensitive(true);

        let request = request
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, JSON)
            .build()
            .map_err(|e| {
                CertOrderError::InvalidInput(format!("failed to prepare request: {}", error_chain(&e)))
            })?;

        if self.config.debug {
            tracing::debug!(target: WIRE_TARGET, "request:\n{}", render_request(&request));
        }

        let response = self.http.execute(request).map_err(transport_error)?;

        if self.config.debug {
            tracing::debug!(
                target: WIRE_TARGET,
                "response:\n{}",
                render_head(&response.status(), response.headers())
            );
        }

        let status = response.status();
        if status.as_u16() < 300 {
            return Ok(response);
        }

        let body = self.read_body(response)?;
        Err(rejection(status, &body))
    }

    /// Reads a successful response and decodes its JSON body.
    pub(crate) fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let body = self.read_body(response)?;
        serde_json::from_str(&body).map_err(|e| CertOrderError::MalformedResponse(e.to_string()))
    }

    fn read_body(&self, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().map_err(|e| CertOrderError::TransportFailure {
            status: status.to_string(),
            message: format!("failed to read response body: {}", error_chain(&e)),
        })?;
        if self.config.debug {
            tracing::debug!(target: WIRE_TARGET, "response body:\n{body}");
        }
        Ok(body)
    }
}

/// Turns the body of a response with status 300 or above into an error.
///
/// The body is kept verbatim when it is not a valid error list.
pub fn rejection(status: StatusCode, body: &str) -> CertOrderError {
    let detail = match serde_json::from_str::<ApiErrors>(body) {
        Ok(errors) => RejectionDetail::Structured(errors),
        Err(e) => RejectionDetail::Raw {
            body: body.to_string(),
            decode_error: e.to_string(),
        },
    };
    CertOrderError::ApiRequestRejected {
        status: status.to_string(),
        detail,
    }
}

fn transport_error(err: reqwest::Error) -> CertOrderError {
    match err.status() {
        Some(status) => CertOrderError::TransportFailure {
            status: status.to_string(),
            message: error_chain(&err),
        },
        None => CertOrderError::NetworkError(error_chain(&err)),
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn render_request(request: &Request) -> String {
    let mut out = format!("{} {}\n", request.method(), request.url());
    out.push_str(&render_headers(request.headers()));
    if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
        out.push('\n');
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

fn render_head(status: &StatusCode, headers: &HeaderMap) -> String {
    format!("{status}\n{}", render_headers(headers))
}

fn render_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        let value = if value.is_sensitive() {
            "[redacted]"
        } else {
            value.to_str().unwrap_or("[binary]")
        };
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn rejection_decodes_error_list() {
        let err = rejection(
            StatusCode::BAD_REQUEST,
            r#"{"errors":[{"code":"invalid_parameter","message":"bad csr"}]}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ApiRequestRejected);
        match err.rejection() {
            Some(RejectionDetail::Structured(errors)) => {
                assert_eq!(errors.to_string(), "invalid_parameter bad csr")
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn rejection_keeps_undecodable_body() {
        let err = rejection(StatusCode::SERVICE_UNAVAILABLE, "maintenance window");
        match err.rejection() {
            Some(RejectionDetail::Raw { body, decode_error }) => {
                assert_eq!(body, "maintenance window");
                assert!(!decode_error.is_empty());
            }
            other => panic!("unexpected detail {other:?}"),
        }
        assert!(err.to_string().contains("503 Service Unavailable"));
        assert!(err.to_string().contains("maintenance window"));
    }

    #[test]
    fn sensitive_headers_are_redacted() {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_static("secret-key");
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        let rendered = render_headers(&headers);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("[redacted]"));
        assert!(rendered.contains("accept: application/json"));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = ClientConfig::builder().api_key("secret-key").build();
        assert!(!format!("{config:?}").contains("secret-key"));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(!config.debug());
    }
}
