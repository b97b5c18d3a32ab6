pub mod domain {
    use std::fmt;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use chrono::{DateTime, Utc};
    use serde::{Serialize, Serializer};

    use crate::error::InvalidMacAddr;

    /// 48-bit hardware address, displayed as lower-case colon separated hex.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MacAddr(pub [u8; 6]);

    impl MacAddr {
        pub fn from_slice(bytes: &[u8]) -> Option<Self> {
            let octets: [u8; 6] = bytes.try_into().ok()?;
            Some(MacAddr(octets))
        }
    }

    impl fmt::Display for MacAddr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let [a, b, c, d, e, g] = self.0;
            write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
        }
    }

    impl FromStr for MacAddr {
        type Err = InvalidMacAddr;

        /// Accepts `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`, any case.
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let invalid = || InvalidMacAddr(s.to_string());
            let mut octets = [0u8; 6];
            let mut parts = s.split(|c| c == ':' || c == '-');
            for octet in octets.iter_mut() {
                let part = parts.next().ok_or_else(invalid)?;
                if part.len() != 2 {
                    return Err(invalid());
                }
                *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
            }
            if parts.next().is_some() {
                return Err(invalid());
            }
            Ok(MacAddr(octets))
        }
    }

    impl Serialize for MacAddr {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    /// Link layer of every frame in a capture file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LinkType {
        Ethernet,
        RawIpv4,
        LinuxSll,
    }

    impl LinkType {
        /// Maps a libpcap DLT value. `DLT_RAW` differs between platforms, hence 12 and 14.
        pub fn from_dlt(dlt: i32) -> Option<Self> {
            match dlt {
                1 => Some(LinkType::Ethernet),
                12 | 14 | 101 | 228 => Some(LinkType::RawIpv4),
                113 => Some(LinkType::LinuxSll),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct RawFrame {
        pub timestamp: DateTime<Utc>,
        pub link_type: LinkType,
        pub data: Vec<u8>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IpLayer {
        pub source: Ipv4Addr,
        pub destination: Ipv4Addr,
        pub protocol: u8,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArpLayer {
        pub sender_hw_addr: MacAddr,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UdpLayer {
        pub source_port: u16,
        pub destination_port: u16,
    }

    /// Layers that decoded successfully from one frame. Anything else is `None`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct DecodedPacket {
        pub ip: Option<IpLayer>,
        pub arp: Option<ArpLayer>,
        pub udp: Option<UdpLayer>,
    }

    impl DecodedPacket {
        /// IP and UDP together, the shape the UDP based aggregators filter on.
        pub fn ip_udp(&self) -> Option<(&IpLayer, &UdpLayer)> {
            Some((self.ip.as_ref()?, self.udp.as_ref()?))
        }
    }
}

pub mod dto {
    use serde::Serialize;

    use super::domain::MacAddr;

    #[derive(Debug, Serialize, Clone, PartialEq, Eq)]
    pub struct ProtocolRow {
        pub protocol: u8,
        pub label: String,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Clone, PartialEq, Eq)]
    pub struct VendorRow {
        pub vendor: String,
        /// ARP packets from every address of this vendor
        pub count: u64,
        /// Distinct addresses of this vendor
        pub devices: usize,
    }

    #[derive(Debug, Serialize, Clone, PartialEq, Eq)]
    pub struct VendorDetail {
        pub mac: MacAddr,
        pub vendor: String,
        pub country: String,
        pub flag_url: String,
        pub packets: u64,
    }

    #[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
    pub struct PortRow {
        pub port: u16,
        pub count: u64,
    }
}
