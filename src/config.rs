use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::state::CaptureSources;
use crate::vendor::DEFAULT_LOOKUP_URL;

/// Capture analysis server: protocol usage, ARP vendors, RIP neighbors, UDP ports.
#[derive(Debug, Clone, Parser)]
#[command(name = "capstats", version, about)]
pub struct Args {
    /// Capture file used by every analysis without its own override
    #[arg(long, env = "CAPSTATS_CAPTURE")]
    pub capture: Option<PathBuf>,

    #[arg(long, env = "CAPSTATS_PROTOCOLS_CAPTURE")]
    pub protocols_capture: Option<PathBuf>,

    #[arg(long, env = "CAPSTATS_ARP_CAPTURE")]
    pub arp_capture: Option<PathBuf>,

    #[arg(long, env = "CAPSTATS_RIP_CAPTURE")]
    pub rip_capture: Option<PathBuf>,

    #[arg(long, env = "CAPSTATS_UDP_CAPTURE")]
    pub udp_capture: Option<PathBuf>,

    #[arg(long, env = "CAPSTATS_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Base URL of the vendor lookup service; the address is appended
    #[arg(long, env = "CAPSTATS_LOOKUP_URL", default_value = DEFAULT_LOOKUP_URL)]
    pub lookup_url: String,

    #[arg(long, env = "CAPSTATS_LOOKUP_TIMEOUT_MS", default_value_t = 5000)]
    pub lookup_timeout_ms: u64,

    #[arg(
        long,
        env = "CAPSTATS_LOOKUP_RETRIES",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=1)
    )]
    pub lookup_retries: u8,

    #[arg(long, env = "CAPSTATS_LOOKUP_WORKERS", default_value_t = 4)]
    pub lookup_workers: usize,

    /// Skip vendor lookups; every address resolves to "Not Found"
    #[arg(long)]
    pub offline: bool,

    /// Print the aggregates as JSON and exit instead of serving
    #[arg(long)]
    pub report: bool,
}

impl Args {
    pub fn sources(&self) -> Result<CaptureSources, ConfigError> {
        let pick = |specific: &Option<PathBuf>, name: &'static str| {
            specific
                .clone()
                .or_else(|| self.capture.clone())
                .ok_or(ConfigError::MissingCapture(name))
        };
        Ok(CaptureSources {
            protocols: pick(&self.protocols_capture, "protocols")?,
            arp: pick(&self.arp_capture, "arp")?,
            rip: pick(&self.rip_capture, "rip")?,
            udp: pick(&self.udp_capture, "udp")?,
        })
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn workers(&self) -> Result<usize, ConfigError> {
        match self.lookup_workers {
            0 => Err(ConfigError::NoWorkers),
            n => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fall_back_to_shared_capture() {
        let args = Args::parse_from(["capstats", "--capture", "all.pcap", "--arp-capture", "arp.pcap"]);
        let sources = args.sources().unwrap();
        assert_eq!(sources.protocols, PathBuf::from("all.pcap"));
        assert_eq!(sources.arp, PathBuf::from("arp.pcap"));
        assert_eq!(sources.udp, PathBuf::from("all.pcap"));
    }

    #[test]
    fn missing_capture_names_the_analysis() {
        let args = Args::parse_from(["capstats", "--protocols-capture", "p.pcap", "--arp-capture", "a.pcap"]);
        assert!(matches!(args.sources(), Err(ConfigError::MissingCapture("rip"))));
    }

    #[test]
    fn retries_are_capped_at_one() {
        assert!(Args::try_parse_from(["capstats", "--lookup-retries", "2"]).is_err());
        let args = Args::parse_from(["capstats", "--lookup-workers", "0"]);
        assert!(matches!(args.workers(), Err(ConfigError::NoWorkers)));
    }
}
