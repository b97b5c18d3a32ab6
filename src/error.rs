//! Error types for capstats.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to open a capture file. Fatal for every analysis backed by that file.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The file does not exist
    #[error("capture file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file is unreadable or its container header is invalid
    #[error("failed to open capture {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: pcap::Error,
    },

    /// The link layer is not one the decoder understands
    #[error("unsupported link type {link_type} in {}", path.display())]
    UnsupportedLinkType { path: PathBuf, link_type: i32 },
}

/// Failure of a single vendor lookup. Never leaves the resolver.
#[derive(Error, Debug)]
pub enum VendorLookupError {
    #[error("lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lookup service answered with status {0}")]
    Status(u16),

    #[error("malformed lookup response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("vendor lookups are disabled")]
    Disabled,
}

/// A hardware address string that is not six hex octets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hardware address: {0}")]
pub struct InvalidMacAddr(pub String);

/// Invalid command line or environment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no capture file given for the {0} analysis (use --capture or --{0}-capture)")]
    MissingCapture(&'static str),

    #[error("--lookup-workers must be at least 1")]
    NoWorkers,
}
