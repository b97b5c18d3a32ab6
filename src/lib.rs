//! Offline capture analysis.
//!
//! A capture file is read once ([`sniff::CaptureReader`]), each frame is decoded
//! best-effort ([`parser::decode`]) and folded into the aggregates in [`stats`].
//! [`state::AnalysisState`] holds the finished results for the HTTP layer in
//! [`server`].

pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod render;
pub mod server;
pub mod sniff;
pub mod state;
pub mod stats;
pub mod vendor;

pub use error::{CaptureError, ConfigError, InvalidMacAddr, VendorLookupError};
pub use state::{AnalysisState, CaptureSources};
pub use vendor::{VendorRecord, VendorResolver};
