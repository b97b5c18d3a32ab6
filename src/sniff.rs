// src/sniff.rs
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pcap::{Capture, Offline};
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::models::domain::{LinkType, RawFrame};

/// Single-pass reader over an offline capture file.
///
/// Yields frames lazily until end of file. A read error in the middle of the
/// file (typically a truncated last record) ends the sequence early. To read
/// the file again, open a new reader.
pub struct CaptureReader {
    capture: Capture<Offline>,
    link_type: LinkType,
    path: PathBuf,
    frames_read: u64,
    finished: bool,
}

impl CaptureReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(CaptureError::NotFound { path });
        }

        let capture = Capture::from_file(&path).map_err(|source| CaptureError::Open {
            path: path.clone(),
            source,
        })?;

        let dlt = capture.get_datalink().0;
        let link_type = LinkType::from_dlt(dlt).ok_or_else(|| CaptureError::UnsupportedLinkType {
            path: path.clone(),
            link_type: dlt,
        })?;

        debug!(path = %path.display(), ?link_type, "opened capture");
        Ok(Self {
            capture,
            link_type,
            path,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl Iterator for CaptureReader {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        if self.finished {
            return None;
        }

        match self.capture.next_packet() {
            Ok(packet) => {
                self.frames_read += 1;
                let ts = packet.header.ts;
                let timestamp =
                    DateTime::<Utc>::from_timestamp(ts.tv_sec as i64, (ts.tv_usec as u32).saturating_mul(1000))
                        .unwrap_or_default();
                Some(RawFrame {
                    timestamp,
                    link_type: self.link_type,
                    data: packet.data.to_vec(),
                })
            }
            Err(pcap::Error::NoMorePackets) => {
                self.finished = true;
                None
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    frames = self.frames_read,
                    "capture read stopped early: {}", e
                );
                self.finished = true;
                None
            }
        }
    }
}
