use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::error::CaptureError;
use crate::models::domain::LinkType;
use crate::models::dto::{PortRow, ProtocolRow};
use crate::parser;
use crate::sniff::CaptureReader;
use crate::stats::{
    MacVendorCounter, NeighborGraph, PacketFold, ProtocolCounter, RipNeighborGraph, UdpPortHistogram,
    VendorReport,
};
use crate::vendor::VendorResolver;

/// Capture file behind each analysis. Analyses may share a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSources {
    pub protocols: PathBuf,
    pub arp: PathBuf,
    pub rip: PathBuf,
    pub udp: PathBuf,
}

impl CaptureSources {
    pub fn single(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            protocols: path.clone(),
            arp: path.clone(),
            rip: path.clone(),
            udp: path,
        }
    }

    fn distinct(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = Vec::new();
        for path in [&self.protocols, &self.arp, &self.rip, &self.udp] {
            if !paths.contains(&path.as_path()) {
                paths.push(path);
            }
        }
        paths
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub link_type: LinkType,
    pub frames: u64,
    pub first_frame: Option<DateTime<Utc>>,
    pub last_frame: Option<DateTime<Utc>>,
}

/// Outcome of one analysis: either its data or why its capture could not be read.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis<T> {
    Ready { capture: CaptureSummary, data: T },
    Unavailable { capture: PathBuf, reason: String },
}

impl<T> Analysis<T> {
    fn from_outcome(path: &Path, outcome: &Result<CaptureSummary, String>, data: T) -> Self {
        match outcome {
            Ok(summary) => Analysis::Ready {
                capture: summary.clone(),
                data,
            },
            Err(reason) => Analysis::Unavailable {
                capture: path.to_path_buf(),
                reason: reason.clone(),
            },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Analysis::Ready { data, .. } => Some(data),
            Analysis::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Analysis::Ready { .. })
    }
}

/// Every aggregate, computed once before serving and read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisState {
    pub protocols: Analysis<Vec<ProtocolRow>>,
    pub manufacturers: Analysis<VendorReport>,
    pub rip_graph: Analysis<NeighborGraph>,
    pub udp_ports: Analysis<Vec<PortRow>>,
}

impl AnalysisState {
    /// Reads each distinct capture once, feeding every aggregator backed by it,
    /// then resolves ARP sender vendors.
    pub fn build(sources: &CaptureSources, resolver: &VendorResolver, lookup_workers: usize) -> Self {
        let mut protocols = ProtocolCounter::default();
        let mut vendors = MacVendorCounter::default();
        let mut rip = RipNeighborGraph::default();
        let mut udp = UdpPortHistogram::default();

        let mut outcomes: Vec<(PathBuf, Result<CaptureSummary, String>)> = Vec::new();
        for path in sources.distinct() {
            let mut folds: Vec<&mut dyn PacketFold> = Vec::new();
            if sources.protocols == path {
                folds.push(&mut protocols);
            }
            if sources.arp == path {
                folds.push(&mut vendors);
            }
            if sources.rip == path {
                folds.push(&mut rip);
            }
            if sources.udp == path {
                folds.push(&mut udp);
            }

            let outcome = fold_capture(path, &mut folds).map_err(|e| {
                error!("{}", e);
                e.to_string()
            });
            outcomes.push((path.to_path_buf(), outcome));
        }

        let outcome_of = |path: &Path| {
            outcomes
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| Err(format!("capture {} was not read", path.display())))
        };

        let arp_outcome = outcome_of(&sources.arp);
        // vendor lookups only make sense once the ARP capture was read
        let manufacturers = match &arp_outcome {
            Ok(_) => Analysis::from_outcome(&sources.arp, &arp_outcome, vendors.resolve(resolver, lookup_workers)),
            Err(reason) => Analysis::Unavailable {
                capture: sources.arp.clone(),
                reason: reason.clone(),
            },
        };

        Self {
            protocols: Analysis::from_outcome(&sources.protocols, &outcome_of(&sources.protocols), protocols.report()),
            manufacturers,
            rip_graph: Analysis::from_outcome(&sources.rip, &outcome_of(&sources.rip), rip.into_graph()),
            udp_ports: Analysis::from_outcome(&sources.udp, &outcome_of(&sources.udp), udp.report()),
        }
    }
}

/// Single pass over one capture file, decoding each frame once for all folds.
pub fn fold_capture(path: &Path, folds: &mut [&mut dyn PacketFold]) -> Result<CaptureSummary, CaptureError> {
    let mut reader = CaptureReader::open(path)?;
    let link_type = reader.link_type();

    let mut first_frame = None;
    let mut last_frame = None;
    for frame in &mut reader {
        first_frame.get_or_insert(frame.timestamp);
        last_frame = Some(frame.timestamp);

        let packet = parser::decode(&frame);
        for fold in folds.iter_mut() {
            fold.update(&packet);
        }
    }

    let summary = CaptureSummary {
        path: reader.path().to_path_buf(),
        link_type,
        frames: reader.frames_read(),
        first_frame,
        last_frame,
    };
    info!(path = %summary.path.display(), frames = summary.frames, "capture aggregated");
    Ok(summary)
}
