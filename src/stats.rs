use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::info;

use crate::models::domain::{DecodedPacket, MacAddr};
use crate::models::dto::{PortRow, ProtocolRow, VendorDetail, VendorRow};
use crate::vendor::{VendorRecord, VendorResolver};

/// UDP destination ports RIP speaks on (RIPv1/v2 and RIPng).
pub const RIP_PORTS: [u16; 2] = [520, 521];

/// Count per key. Reports are ordered by count descending, ties by ascending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable<K: Ord> {
    counts: BTreeMap<K, u64>,
}

impl<K: Ord> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> FrequencyTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: K, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
    }

    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.counts.keys()
    }

    pub fn report(&self) -> Vec<(K, u64)> {
        let mut rows: Vec<(K, u64)> = self.counts.iter().map(|(k, c)| (k.clone(), *c)).collect();
        // map iteration is already key-ascending; the stable sort keeps that for ties
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }
}

impl<K: Ord + Clone> FromIterator<K> for FrequencyTable<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.increment(key);
        }
        table
    }
}

/// One step of a single-pass fold over decoded packets.
pub trait PacketFold {
    fn update(&mut self, packet: &DecodedPacket);
}

pub fn protocol_label(protocol: u8) -> String {
    match protocol {
        2 => "IGMPv2".to_string(),
        6 => "TCP".to_string(),
        17 => "UDP".to_string(),
        n => format!("Protocol {}", n),
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProtocolCounter {
    table: FrequencyTable<u8>,
}

impl ProtocolCounter {
    pub fn table(&self) -> &FrequencyTable<u8> {
        &self.table
    }

    pub fn report(&self) -> Vec<ProtocolRow> {
        self.table
            .report()
            .into_iter()
            .map(|(protocol, count)| ProtocolRow {
                protocol,
                label: protocol_label(protocol),
                count,
            })
            .collect()
    }
}

impl PacketFold for ProtocolCounter {
    fn update(&mut self, packet: &DecodedPacket) {
        if let Some(ip) = &packet.ip {
            self.table.increment(ip.protocol);
        }
    }
}

/// Counts ARP senders; vendor names are attached afterwards by [`MacVendorCounter::resolve`].
#[derive(Debug, Default, Clone)]
pub struct MacVendorCounter {
    senders: FrequencyTable<MacAddr>,
}

impl MacVendorCounter {
    pub fn senders(&self) -> &FrequencyTable<MacAddr> {
        &self.senders
    }

    /// One resolver call per distinct sender address.
    pub fn resolve(self, resolver: &VendorResolver, workers: usize) -> VendorReport {
        let records = resolver.resolve_all(self.senders.keys().copied(), workers);

        let mut vendors = FrequencyTable::new();
        let mut members: BTreeMap<String, BTreeSet<MacAddr>> = BTreeMap::new();
        for (mac, count) in self.senders.report() {
            let record = records.get(&mac).cloned().unwrap_or_else(VendorRecord::not_found);
            vendors.add(record.vendor.clone(), count);
            members.entry(record.vendor).or_default().insert(mac);
        }

        info!(
            addresses = self.senders.len(),
            vendors = vendors.len(),
            unresolved = records.values().filter(|r| !r.is_found()).count(),
            "resolved ARP sender vendors"
        );
        VendorReport {
            senders: self.senders,
            records,
            vendors,
            members,
        }
    }
}

impl PacketFold for MacVendorCounter {
    fn update(&mut self, packet: &DecodedPacket) {
        if let Some(arp) = &packet.arp {
            self.senders.increment(arp.sender_hw_addr);
        }
    }
}

/// ARP senders with their resolved vendors.
#[derive(Debug, Clone)]
pub struct VendorReport {
    senders: FrequencyTable<MacAddr>,
    records: BTreeMap<MacAddr, VendorRecord>,
    vendors: FrequencyTable<String>,
    members: BTreeMap<String, BTreeSet<MacAddr>>,
}

impl VendorReport {
    pub fn records(&self) -> &BTreeMap<MacAddr, VendorRecord> {
        &self.records
    }

    pub fn vendor_counts(&self) -> &FrequencyTable<String> {
        &self.vendors
    }

    pub fn members(&self, vendor: &str) -> Option<&BTreeSet<MacAddr>> {
        self.members.get(vendor)
    }

    pub fn vendor_rows(&self) -> Vec<VendorRow> {
        self.vendors
            .report()
            .into_iter()
            .map(|(vendor, count)| VendorRow {
                devices: self.members(&vendor).map_or(0, |m| m.len()),
                vendor,
                count,
            })
            .collect()
    }

    pub fn details(&self) -> Vec<VendorDetail> {
        self.records
            .iter()
            .map(|(mac, record)| VendorDetail {
                mac: *mac,
                vendor: record.vendor.clone(),
                country: record.country.clone(),
                flag_url: record.flag_url(),
                packets: self.senders.get(mac),
            })
            .collect()
    }
}

impl Serialize for VendorReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("VendorReport", 3)?;
        s.serialize_field("vendors", &self.vendor_rows())?;
        s.serialize_field("details", &self.details())?;
        s.serialize_field("members", &self.members)?;
        s.end()
    }
}

/// Directed graph of RIP speakers. Edges can only be added with their endpoints,
/// so no edge ever dangles.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborGraph {
    nodes: BTreeSet<Ipv4Addr>,
    edges: BTreeSet<(Ipv4Addr, Ipv4Addr)>,
}

impl NeighborGraph {
    pub fn add_edge(&mut self, src: Ipv4Addr, dst: Ipv4Addr) {
        self.nodes.insert(src);
        self.nodes.insert(dst);
        self.edges.insert((src, dst));
    }

    pub fn nodes(&self) -> &BTreeSet<Ipv4Addr> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeSet<(Ipv4Addr, Ipv4Addr)> {
        &self.edges
    }
}

#[derive(Debug, Default, Clone)]
pub struct RipNeighborGraph {
    graph: NeighborGraph,
}

impl RipNeighborGraph {
    pub fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    pub fn into_graph(self) -> NeighborGraph {
        self.graph
    }
}

impl PacketFold for RipNeighborGraph {
    fn update(&mut self, packet: &DecodedPacket) {
        if let Some((ip, udp)) = packet.ip_udp() {
            if RIP_PORTS.contains(&udp.destination_port) {
                self.graph.add_edge(ip.source, ip.destination);
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UdpPortHistogram {
    table: FrequencyTable<u16>,
}

impl UdpPortHistogram {
    pub fn table(&self) -> &FrequencyTable<u16> {
        &self.table
    }

    pub fn report(&self) -> Vec<PortRow> {
        self.table
            .report()
            .into_iter()
            .map(|(port, count)| PortRow { port, count })
            .collect()
    }
}

impl PacketFold for UdpPortHistogram {
    fn update(&mut self, packet: &DecodedPacket) {
        if let Some((_, udp)) = packet.ip_udp() {
            self.table.increment(udp.destination_port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{ArpLayer, IpLayer, UdpLayer};
    use crate::vendor::{LookupResponse, VendorLookup};
    use crate::error::VendorLookupError;

    fn ip(protocol: u8) -> DecodedPacket {
        DecodedPacket {
            ip: Some(IpLayer {
                source: Ipv4Addr::new(10, 0, 0, 1),
                destination: Ipv4Addr::new(10, 0, 0, 2),
                protocol,
            }),
            ..Default::default()
        }
    }

    fn udp(src: [u8; 4], dst: [u8; 4], dport: u16) -> DecodedPacket {
        DecodedPacket {
            ip: Some(IpLayer {
                source: src.into(),
                destination: dst.into(),
                protocol: 17,
            }),
            udp: Some(UdpLayer {
                source_port: 40000,
                destination_port: dport,
            }),
            arp: None,
        }
    }

    fn arp(mac: [u8; 6]) -> DecodedPacket {
        DecodedPacket {
            arp: Some(ArpLayer {
                sender_hw_addr: MacAddr(mac),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn frequency_table_orders_by_count_then_key() {
        let table: FrequencyTable<u16> = [443, 80, 53, 80, 53, 9].into_iter().collect();
        assert_eq!(table.report(), vec![(53, 2), (80, 2), (9, 1), (443, 1)]);
        assert_eq!(table.total(), 6);
        assert_eq!(table.get(&7), 0);
    }

    #[test]
    fn protocol_counter_labels_and_filters() {
        let mut counter = ProtocolCounter::default();
        for packet in [ip(6), ip(17), ip(6), ip(89), ip(2), DecodedPacket::default(), arp([0; 6])] {
            counter.update(&packet);
        }
        let labels: Vec<(String, u64)> = counter.report().into_iter().map(|r| (r.label, r.count)).collect();
        assert_eq!(
            labels,
            vec![
                ("TCP".to_string(), 2),
                ("IGMPv2".to_string(), 1),
                ("UDP".to_string(), 1),
                ("Protocol 89".to_string(), 1),
            ]
        );
        assert_eq!(counter.table().total(), 5);
    }

    #[test]
    fn rip_graph_collapses_duplicate_edges() {
        let mut rip = RipNeighborGraph::default();
        for packet in [
            udp([10, 0, 0, 1], [10, 0, 0, 2], 520),
            udp([10, 0, 0, 1], [10, 0, 0, 2], 520),
            udp([10, 0, 0, 2], [10, 0, 0, 3], 521),
            udp([10, 0, 0, 9], [10, 0, 0, 1], 53),
            ip(17),
        ] {
            rip.update(&packet);
        }
        let graph = rip.into_graph();
        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(graph.edges().len(), 2);
        for (src, dst) in graph.edges() {
            assert!(graph.nodes().contains(src) && graph.nodes().contains(dst));
        }
    }

    #[test]
    fn udp_histogram_counts_destination_ports() {
        let mut hist = UdpPortHistogram::default();
        for dport in [80, 80, 443] {
            hist.update(&udp([1, 1, 1, 1], [2, 2, 2, 2], dport));
        }
        hist.update(&ip(17));
        assert_eq!(
            hist.report(),
            vec![PortRow { port: 80, count: 2 }, PortRow { port: 443, count: 1 }]
        );
    }

    struct SameVendor;

    impl VendorLookup for SameVendor {
        fn lookup(&self, mac: &MacAddr) -> Result<LookupResponse, VendorLookupError> {
            if mac.0[0] == 0xff {
                return Err(VendorLookupError::Status(404));
            }
            Ok(LookupResponse {
                company: Some("Cisco Systems, Inc".to_string()),
                country: Some("US".to_string()),
            })
        }
    }

    #[test]
    fn vendor_counter_sums_addresses_per_vendor() {
        let mut counter = MacVendorCounter::default();
        for packet in [arp([0, 1, 2, 3, 4, 5]), arp([0, 1, 2, 3, 4, 6]), arp([0, 1, 2, 3, 4, 6])] {
            counter.update(&packet);
        }
        counter.update(&arp([0xff, 0, 0, 0, 0, 1]));

        let resolver = VendorResolver::new(Box::new(SameVendor));
        let report = counter.resolve(&resolver, 2);

        assert_eq!(report.records().len(), 3);
        assert_eq!(report.vendor_counts().get(&"Cisco Systems, Inc".to_string()), 3);
        assert_eq!(report.vendor_counts().get(&"Not Found".to_string()), 1);
        assert_eq!(report.vendor_counts().total(), 4);
        assert_eq!(report.members("Cisco Systems, Inc").map(|m| m.len()), Some(2));
        assert_eq!(
            report.vendor_rows(),
            vec![
                VendorRow {
                    vendor: "Cisco Systems, Inc".to_string(),
                    count: 3,
                    devices: 2,
                },
                VendorRow {
                    vendor: "Not Found".to_string(),
                    count: 1,
                    devices: 1,
                },
            ]
        );
        assert_eq!(resolver.lookups_performed(), 3);
    }
}
