//! Netdata data source for Vigil.
//!
//! [`NetdataClient`] issues single, bounded HTTP GETs against a node's
//! `/api/v1` endpoints and reduces the verbose payloads to the few fields a
//! language model needs. [`tools::register_netdata_tools`] wraps every client
//! operation as a validated skill.
//!
//! # Main entry points
//!
//! - [`NetdataClient`]: HTTP client with a fixed deadline.
//! - [`TimeRef`]: parsing rule for `after`/`before` arguments.
//! - [`Frequency`]: client-side resampling of chart data.
//! - [`HostPolicy`]: which base URLs tools may query.
//! - [`register_netdata_tools()`]: register the tool table.
//! - [`system_prompt()`]: assistant instructions naming the configured hosts.

/// HTTP client and response projections.
pub mod client;
/// Base-URL allow list.
pub mod host;
/// Assistant instructions.
pub mod prompt;
/// Client-side resampling of chart rows.
pub mod resample;
/// `after`/`before` parsing.
pub mod time;
/// The tool table.
pub mod tools;

pub use client::{AlarmFilter, DataFormat, DataQuery, NetdataClient, DEFAULT_TIMEOUT};
pub use host::HostPolicy;
pub use prompt::{system_prompt, SYSTEM_PROMPT};
pub use resample::Frequency;
pub use time::TimeRef;
pub use tools::{netdata_tools, register_netdata_tools, ToolContext};
