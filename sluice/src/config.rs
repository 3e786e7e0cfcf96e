//! Client configuration.
//!
//! Configuration is plain data: build a [`ClientConfig`], hand it to
//! [`HttpClient::new`](crate::client::HttpClient::new), and it is frozen for
//! the lifetime of the client. Nothing here is validated up front; a bad base
//! URL shows up as a transport error on the first request.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use sluice::config::{ClientConfig, Consistency, Precision};
//!
//! let config = ClientConfig::new("http://localhost:8086")
//!     .with_database("telegraf")
//!     .with_precision(Precision::Seconds)
//!     .with_consistency(Consistency::Quorum)
//!     .with_credentials("admin", "secret")
//!     .with_timeout(Duration::from_secs(2));
//!
//! assert_eq!(config.params.database, "telegraf");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Database written to when none is configured.
pub const DEFAULT_DATABASE: &str = "stress";

/// Retention policy written to when none is configured.
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";

/// Base URL used by [`ClientConfig::default`].
pub const DEFAULT_BASE_URL: &str = "http://localhost:8086";

/// User agent used by [`ClientConfig::default`].
pub const DEFAULT_USER_AGENT: &str = "sluice";

/// Request timeout used by [`ClientConfig::default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timestamp precision of written points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// Nanoseconds (`n`). The server default, never sent explicitly.
    #[default]
    #[serde(rename = "n")]
    Nanoseconds,
    /// Microseconds (`u`).
    #[serde(rename = "u")]
    Microseconds,
    /// Milliseconds (`ms`).
    #[serde(rename = "ms")]
    Milliseconds,
    /// Seconds (`s`).
    #[serde(rename = "s")]
    Seconds,
    /// Minutes (`m`).
    #[serde(rename = "m")]
    Minutes,
    /// Hours (`h`).
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    /// Returns the query-string value for this precision.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "n",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    /// Parses a query-string value (`n`, `u`, `ms`, `s`, `m`, `h`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "n" | "ns" => Some(Self::Nanoseconds),
            "u" | "us" => Some(Self::Microseconds),
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            _ => None,
        }
    }
}

/// Write consistency for clustered deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Any node, including hinted handoff.
    Any,
    /// One node. The server default, never sent explicitly.
    #[default]
    One,
    /// A quorum of nodes.
    Quorum,
    /// Every node.
    All,
}

impl Consistency {
    /// Returns the query-string value for this consistency level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::One => "one",
            Self::Quorum => "quorum",
            Self::All => "all",
        }
    }

    /// Parses a query-string value (`any`, `one`, `quorum`, `all`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(Self::Any),
            "one" => Some(Self::One),
            "quorum" => Some(Self::Quorum),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Parameters carried in the write URL's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteParams {
    /// Target database. Always sent.
    pub database: String,
    /// Retention policy. Sent only when non-empty.
    pub retention_policy: String,
    /// Timestamp precision. Sent only when set to something other than nanoseconds.
    pub precision: Option<Precision>,
    /// Write consistency. Sent only when set to something other than `one`.
    pub consistency: Option<Consistency>,
}

impl Default for WriteParams {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            retention_policy: DEFAULT_RETENTION_POLICY.to_string(),
            precision: None,
            consistency: None,
        }
    }
}

/// Configuration for an [`HttpClient`](crate::client::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the database, e.g. `http://localhost:8086`.
    pub base_url: String,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Deadline for a full request/response round trip.
    pub timeout: Duration,
    /// Basic auth username. Auth is only sent when both username and password are set.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Write parameters baked into the write URL.
    pub params: WriteParams,
    /// Send `Content-Encoding: gzip`. The body must already be compressed by
    /// the caller; the client never compresses.
    pub gzip: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            username: String::new(),
            password: String::new(),
            params: WriteParams::default(),
            gzip: false,
        }
    }
}

impl ClientConfig {
    /// Creates a config for `base_url` with every other setting at its default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the target database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.params.database = database.into();
        self
    }

    /// Sets the retention policy. An empty string leaves it out of the URL.
    #[must_use]
    pub fn with_retention_policy(mut self, rp: impl Into<String>) -> Self {
        self.params.retention_policy = rp.into();
        self
    }

    /// Sets the timestamp precision.
    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.params.precision = Some(precision);
        self
    }

    /// Sets the write consistency.
    #[must_use]
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.params.consistency = Some(consistency);
        self
    }

    /// Sets Basic auth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Marks request bodies as gzip-encoded.
    #[must_use]
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }
}
