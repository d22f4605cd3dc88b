//! # minuet
//!
//! Typed command/response client adapter for a Redis-backed time-series
//! store.
//!
//! minuet translates typed, named-option calls (create a series, append
//! samples, query ranges, read metadata) into the ordered token sequences
//! of the store's wire protocol, and decodes the heterogeneous,
//! positionally-encoded replies back into typed results. It is a protocol
//! layer only: storage, compaction, and aggregation all happen in the
//! external server, reached through a single request/response transport
//! seam.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Pure command builders and reply decoders with no shared mutable state
//! - Compile-time command-to-decoder routing over a closed vocabulary
//! - Client-side validation of option combinations before anything is sent
//! - Version-tolerant metadata decoding (optional fields stay optional)
//! - Transport held by composition: any `execute(name, args) -> reply`
//!   primitive works, including mocks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minuet::{Client, CreateOptions, RangeOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let redis = redis::Client::open("redis://127.0.0.1:6379")?;
//! let mut client = Client::new(redis.get_connection()?);
//!
//! // Create a series with a retention window and a label
//! client.create(
//!     "sensor:temp",
//!     &CreateOptions::default()
//!         .with_retention_ms(60_000)
//!         .with_label("room", "lab"),
//! )?;
//!
//! // Append a sample (server picks the timestamp)
//! client.add("sensor:temp", minuet::Timestamp::Auto, 21.5, &Default::default())?;
//!
//! // Query it back
//! for sample in client.range("sensor:temp", 0, i64::MAX, &RangeOptions::default())? {
//!     println!("{}: {}", sample.timestamp, sample.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Client`] — Typed method per command; build, execute, decode
//! - [`Transport`] — The one-operation seam to the remote store
//! - [`Pipeline`] — Batched submission with in-order reply decoding
//! - [`options`] — Per-command-family option records and closed vocabularies
//! - [`reply`] — Typed results and the command-to-decoder routing
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`client`] — Transport seam, synchronous client, pipeline
//! - [`command`] — Command vocabulary and wire-token assembly
//! - [`options`] — Option records, sentinels, validation
//! - [`reply`] — Reply records and decoders
//! - [`error`] — Error types
//! - `aio` — Async client variant (requires the `aio` feature)

#[cfg(feature = "aio")]
pub mod aio;
pub mod client;
pub mod command;
pub mod error;
pub mod options;
pub mod reply;

// Re-export primary API types at crate root for convenience.
pub use client::{Client, Pipeline, Transport};
pub use command::Command;
pub use error::{DecodeError, MinuetError, Result, ValidationError};
pub use options::{
    AddOptions, Aggregation, AggregationType, Align, AlterOptions, CounterOptions, CreateOptions,
    DuplicatePolicy, Labels, MGetOptions, MultiRangeOptions, RangeOptions, TimeBound, Timestamp,
};
pub use reply::{CompactionRule, Reply, Sample, SeriesInfo, SeriesLast, SeriesRange};
