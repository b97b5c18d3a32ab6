// Best-effort frame decoding: link layer -> (ARP | IPv4) -> UDP.
//
// Nothing here fails. A malformed or truncated header stops the decode and the
// layers below it stay unset.

use etherparse::{
    Ethernet2HeaderSlice, Ipv4HeaderSlice, LinuxSllHeaderSlice, LinuxSllProtocolType, SingleVlanHeaderSlice,
    UdpHeaderSlice,
};

use crate::models::domain::{ArpLayer, DecodedPacket, IpLayer, LinkType, MacAddr, RawFrame, UdpLayer};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;
const ETHERTYPE_QINQ_LEGACY: u16 = 0x9100;

const IP_PROTO_UDP: u8 = 17;

const MAX_VLAN_TAGS: usize = 2;

// RFC 826 fixed part: htype(2) ptype(2) hlen(1) plen(1) oper(2)
const ARP_FIXED_LEN: usize = 8;
const ARP_HLEN_OFFSET: usize = 4;
const ARP_PLEN_OFFSET: usize = 5;
const ETHERNET_ADDR_LEN: usize = 6;

pub fn decode(frame: &RawFrame) -> DecodedPacket {
    let mut packet = DecodedPacket::default();

    let Some((ether_type, payload)) = network_payload(frame.link_type, &frame.data) else {
        return packet;
    };

    match ether_type {
        ETHERTYPE_ARP => packet.arp = decode_arp(payload),
        ETHERTYPE_IPV4 => decode_ipv4(payload, &mut packet),
        _ => {}
    }
    packet
}

/// Strips the link layer, returning the ethertype of what follows and its bytes.
fn network_payload(link_type: LinkType, data: &[u8]) -> Option<(u16, &[u8])> {
    match link_type {
        LinkType::Ethernet => {
            let eth = Ethernet2HeaderSlice::from_slice(data).ok()?;
            let ether_type = u16::from(eth.ether_type());
            strip_vlan_tags(ether_type, &data[eth.slice().len()..])
        }
        LinkType::LinuxSll => {
            let sll = LinuxSllHeaderSlice::from_slice(data).ok()?;
            match sll.protocol_type() {
                LinuxSllProtocolType::EtherType(ether_type) => {
                    strip_vlan_tags(u16::from(ether_type), &data[sll.slice().len()..])
                }
                _ => None,
            }
        }
        LinkType::RawIpv4 => Some((ETHERTYPE_IPV4, data)),
    }
}

fn strip_vlan_tags(mut ether_type: u16, mut payload: &[u8]) -> Option<(u16, &[u8])> {
    for _ in 0..MAX_VLAN_TAGS {
        if !matches!(ether_type, ETHERTYPE_VLAN | ETHERTYPE_QINQ | ETHERTYPE_QINQ_LEGACY) {
            break;
        }
        let vlan = SingleVlanHeaderSlice::from_slice(payload).ok()?;
        ether_type = u16::from(vlan.ether_type());
        payload = &payload[vlan.slice().len()..];
    }
    Some((ether_type, payload))
}

fn decode_arp(payload: &[u8]) -> Option<ArpLayer> {
    if payload.len() < ARP_FIXED_LEN {
        return None;
    }
    let hlen = payload[ARP_HLEN_OFFSET] as usize;
    let plen = payload[ARP_PLEN_OFFSET] as usize;
    if hlen != ETHERNET_ADDR_LEN || payload.len() < ARP_FIXED_LEN + 2 * hlen + 2 * plen {
        return None;
    }

    let sender_hw_addr = MacAddr::from_slice(&payload[ARP_FIXED_LEN..ARP_FIXED_LEN + hlen])?;
    Some(ArpLayer { sender_hw_addr })
}

fn decode_ipv4(payload: &[u8], packet: &mut DecodedPacket) {
    let Ok(ip) = Ipv4HeaderSlice::from_slice(payload) else {
        return;
    };

    let protocol = u8::from(ip.protocol());
    packet.ip = Some(IpLayer {
        source: ip.source_addr(),
        destination: ip.destination_addr(),
        protocol,
    });

    // non-first fragments carry no transport header
    if protocol != IP_PROTO_UDP || ip.fragments_offset().value() != 0 {
        return;
    }

    packet.udp = UdpHeaderSlice::from_slice(&payload[ip.slice().len()..])
        .ok()
        .map(|udp| UdpLayer {
            source_port: udp.source_port(),
            destination_port: udp.destination_port(),
        });
}
