//! # sluice
//!
//! Streaming write path for time-series load generation.
//!
//! sluice takes an in-memory batch of metrics and ships it to a
//! line-protocol write endpoint without first materializing the whole encoded
//! batch. A [`StreamEncoder`] exposes the batch as a pull stream that fills
//! caller-sized buffers; an [`HttpClient`] streams that into a single HTTP
//! write with Basic auth, an optional gzip content-encoding marker and a
//! per-request deadline.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Byte-exact output for any sequence of buffer sizes, including 1
//! - Whole metrics copied straight into the caller's buffer when they fit
//! - One request per write, no hidden retries, no partial-success reporting
//! - Write URL and auth header computed once per client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice::{Client, ClientConfig, FieldValue, HttpClient, LineMetric, StreamEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("http://localhost:8086").with_database("stress");
//! let client = HttpClient::new(config)?;
//!
//! let batch: Vec<LineMetric> = (0..1000)
//!     .map(|i| {
//!         LineMetric::new(
//!             "cpu",
//!             &[("host", "web1")],
//!             &[("value", FieldValue::Int(i))],
//!             1_700_000_000_000_000_000 + i,
//!         )
//!     })
//!     .collect::<Result<_, _>>()?;
//!
//! let encoder = StreamEncoder::new(batch);
//! let size = encoder.encoded_len();
//! client.write_stream(encoder, size)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`metric`] — The metric contract and a line-protocol record
//! - [`encoder`] — Pull-based stream encoder
//! - [`client`] — HTTP write client
//! - [`config`] — Client configuration and write parameters
//! - [`error`] — Error types

pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metric;

// Re-export primary API types at crate root for convenience.
pub use client::{Client, HttpClient};
pub use config::{ClientConfig, Consistency, Precision, WriteParams};
pub use encoder::{Pull, StreamEncoder};
pub use error::{Result, SluiceError};
pub use metric::{FieldValue, LineMetric, Metric};
