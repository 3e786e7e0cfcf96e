//! HTTP write client for line-protocol endpoints.
//!
//! [`HttpClient`] performs exactly one HTTP request per call: a payload known
//! up front ([`Client::write`]), a streamed body such as a
//! [`StreamEncoder`](crate::encoder::StreamEncoder) ([`Client::write_stream`]),
//! or an administrative query ([`Client::create_database`]). There is no retry:
//! a call either fully succeeds or returns an error and reports zero bytes.
//!
//! # Example
//!
//! ```rust,no_run
//! use sluice::client::{Client, HttpClient};
//! use sluice::config::ClientConfig;
//! use sluice::encoder::StreamEncoder;
//! use sluice::metric::{FieldValue, LineMetric};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(ClientConfig::new("http://localhost:8086"))?;
//! client.create_database("")?;
//!
//! let no_tags: &[(&str, &str)] = &[];
//! let batch = vec![
//!     LineMetric::new("cpu", no_tags, &[("value", FieldValue::Int(1))], 1_700_000_000_000_000_000)?,
//!     LineMetric::new("cpu", no_tags, &[("value", FieldValue::Int(2))], 1_700_000_001_000_000_000)?,
//! ];
//! let encoder = StreamEncoder::new(batch);
//! let size = encoder.encoded_len();
//! client.write_stream(encoder, size)?;
//! # Ok(())
//! # }
//! ```

use std::io::Read;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::{Body, RequestBuilder};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, USER_AGENT};

use crate::config::{ClientConfig, Consistency, Precision, WriteParams};
use crate::error::{Result, SluiceError};

/// Status code the write endpoint answers with on success.
const WRITE_OK: u16 = 204;

/// Status code the query endpoint answers with on success.
const QUERY_OK: u16 = 200;

/// A database write client.
///
/// Implementations are safe to share between threads; every call carries its
/// own request and response.
pub trait Client {
    /// Runs an administrative command against the query endpoint.
    ///
    /// An empty `command` means `CREATE DATABASE <configured database>`.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Transport` if no response arrived, or
    /// `SluiceError::QueryFailed` (with the response body) on any status
    /// other than 200.
    fn create_database(&self, command: &str) -> Result<()>;

    /// Writes a complete payload. Returns `payload.len()` on success.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Transport` if no response arrived, or
    /// `SluiceError::BadStatus` on any status other than 204.
    fn write(&self, payload: &[u8]) -> Result<usize>;

    /// Streams `size` bytes from `source` as the request body. Returns `size`
    /// on success.
    ///
    /// `size` is sent as the `Content-Length` and must equal exactly the
    /// number of bytes `source` yields. A mismatch breaks the HTTP framing and
    /// is not detected here.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Client::write).
    fn write_stream<R>(&self, source: R, size: u64) -> Result<u64>
    where
        R: Read + Send + 'static;

    /// Releases client-owned resources. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Never fails for [`HttpClient`]; the signature leaves room for
    /// implementations that flush on close.
    fn close(&self) -> Result<()>;
}

/// [`Client`] over a pooled blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
    write_url: String,
    query_url: String,
    /// Precomputed `Authorization` header value, if credentials are complete.
    authorization: Option<String>,
    http: reqwest::blocking::Client,
}

impl HttpClient {
    /// Creates a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::ClientCreate` if the transport cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| SluiceError::ClientCreate { source: e })?;
        Ok(Self::with_transport(config, http))
    }

    /// Creates a client that shares an existing transport (and its
    /// connection pool) with other clients.
    pub fn with_transport(config: ClientConfig, http: reqwest::blocking::Client) -> Self {
        let write_url = write_url(&config.base_url, &config.params);
        let query_url = query_url(&config.base_url);
        let authorization = (!config.username.is_empty() && !config.password.is_empty())
            .then(|| format!("Basic {}", basic_auth(&config.username, &config.password)));

        Self {
            config,
            write_url,
            query_url,
            authorization,
            http,
        }
    }

    /// The write URL, fixed at construction.
    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds a write request carrying every header the endpoint expects.
    fn write_request(&self, body: Body) -> RequestBuilder {
        let mut request = self
            .http
            .post(&self.write_url)
            .timeout(self.config.timeout)
            .header(CONTENT_TYPE, "text/plain")
            .header(USER_AGENT, self.config.user_agent.as_str());

        if self.config.gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(auth) = &self.authorization {
            request = request.header(AUTHORIZATION, auth.as_str());
        }

        request.body(body)
    }

    /// Sends a write and maps the outcome. The response is dropped before
    /// returning on every path.
    fn send_write(&self, request: RequestBuilder, size: u64) -> Result<()> {
        tracing::debug!(url = %self.write_url, bytes = size, "sending write");

        let response = request
            .send()
            .map_err(|e| SluiceError::Transport { source: e })?;
        let status = response.status().as_u16();
        drop(response);

        tracing::debug!(status, "write answered");
        if status == WRITE_OK {
            Ok(())
        } else {
            Err(SluiceError::BadStatus {
                status,
                expected: WRITE_OK,
            })
        }
    }
}

impl Client for HttpClient {
    fn create_database(&self, command: &str) -> Result<()> {
        let command = if command.is_empty() {
            format!("CREATE DATABASE {}", self.config.params.database)
        } else {
            command.to_string()
        };

        let mut request = self
            .http
            .post(&self.query_url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .form(&[("q", command.as_str())]);
        if let Some(auth) = &self.authorization {
            request = request.header(AUTHORIZATION, auth.as_str());
        }

        tracing::debug!(url = %self.query_url, %command, "sending query");
        let response = request
            .send()
            .map_err(|e| SluiceError::Transport { source: e })?;

        let status = response.status().as_u16();
        if status != QUERY_OK {
            let body = response.text().unwrap_or_default();
            return Err(SluiceError::QueryFailed {
                command,
                status,
                body,
            });
        }

        Ok(())
    }

    fn write(&self, payload: &[u8]) -> Result<usize> {
        let request = self.write_request(Body::from(payload.to_vec()));
        self.send_write(request, payload.len() as u64)?;
        Ok(payload.len())
    }

    fn write_stream<R>(&self, source: R, size: u64) -> Result<u64>
    where
        R: Read + Send + 'static,
    {
        let request = self.write_request(Body::sized(source, size));
        self.send_write(request, size)?;
        Ok(size)
    }

    fn close(&self) -> Result<()> {
        // The transport may be shared with other clients; dropping the last
        // handle closes its pool.
        tracing::debug!(url = %self.write_url, "client closed");
        Ok(())
    }
}

/// Builds the write URL: `{base_url}/write?` followed by the form-encoded
/// parameters in key order.
///
/// `db` is always present. `rp` is left out when empty; `precision` and
/// `consistency` are left out when unset or equal to the server defaults
/// (nanoseconds and `one`).
pub fn write_url(base_url: &str, params: &WriteParams) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());

    if let Some(consistency) = params.consistency.filter(|c| *c != Consistency::One) {
        query.append_pair("consistency", consistency.as_str());
    }
    query.append_pair("db", &params.database);
    if let Some(precision) = params.precision.filter(|p| *p != Precision::Nanoseconds) {
        query.append_pair("precision", precision.as_str());
    }
    if !params.retention_policy.is_empty() {
        query.append_pair("rp", &params.retention_policy);
    }

    format!("{base_url}/write?{}", query.finish())
}

/// Builds the query URL: `{base_url}/query`.
pub fn query_url(base_url: &str) -> String {
    format!("{base_url}/query")
}

/// Base64 of `username:password`, as used in a Basic `Authorization` header
/// (RFC 2617 section 2). Not URL-encoded.
pub fn basic_auth(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{username}:{password}"))
}
