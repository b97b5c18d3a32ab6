#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_RAW: u32 = 101;
pub const LINKTYPE_IEEE802_11: u32 = 105;
pub const LINKTYPE_LINUX_SLL: u32 = 113;

/// Classic little-endian pcap (magic a1b2c3d4, version 2.4, microsecond stamps).
pub fn write_pcap(path: &Path, link_type: u32, frames: &[Vec<u8>]) {
    write_pcap_version(path, (2, 4), link_type, frames);
}

pub fn write_pcap_version(path: &Path, (major, minor): (u16, u16), link_type: u32, frames: &[Vec<u8>]) {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&major.to_le_bytes());
    out.extend_from_slice(&minor.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&link_type.to_le_bytes());

    for (i, frame) in frames.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    fs::write(path, out).unwrap();
}

pub fn capture(dir: &Path, name: &str, frames: &[Vec<u8>]) -> PathBuf {
    let path = dir.join(name);
    write_pcap(&path, LINKTYPE_ETHERNET, frames);
    path
}

pub fn ethernet(src: [u8; 6], ether_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0xff; 6];
    data.extend_from_slice(&src);
    data.extend_from_slice(&ether_type.to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Linux cooked capture v1 header: incoming unicast from a 6 byte address.
pub fn linux_sll(src: [u8; 6], ether_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0, 0, 0, 1, 0, 6];
    data.extend_from_slice(&src);
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&ether_type.to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Bare IPv4 packet, no link layer.
pub fn ipv4_packet(protocol: u8, src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let total = (20 + payload.len()) as u16;
    let mut ip = vec![0x45, 0];
    ip.extend_from_slice(&total.to_be_bytes());
    ip.extend_from_slice(&[0, 1, 0, 0, 64, protocol, 0, 0]);
    ip.extend_from_slice(&src);
    ip.extend_from_slice(&dst);
    ip.extend_from_slice(payload);
    ip
}

pub fn ipv4_frame(protocol: u8, src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    ethernet([0x02, 0, 0, 0, 0, 0x01], 0x0800, &ipv4_packet(protocol, src, dst, payload))
}

pub fn udp_datagram(sport: u16, dport: u16) -> Vec<u8> {
    let mut udp = Vec::new();
    udp.extend_from_slice(&sport.to_be_bytes());
    udp.extend_from_slice(&dport.to_be_bytes());
    udp.extend_from_slice(&12u16.to_be_bytes());
    udp.extend_from_slice(&[0, 0, 0xde, 0xad, 0xbe, 0xef]);
    udp
}

pub fn tcp_frame(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    let mut tcp = vec![0u8; 20];
    tcp[0..2].copy_from_slice(&443u16.to_be_bytes());
    tcp[2..4].copy_from_slice(&51000u16.to_be_bytes());
    tcp[12] = 0x50;
    ipv4_frame(6, src, dst, &tcp)
}

pub fn udp_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16) -> Vec<u8> {
    ipv4_frame(17, src, dst, &udp_datagram(sport, dport))
}

pub fn arp_frame(sender: [u8; 6]) -> Vec<u8> {
    let mut arp = vec![0, 1, 0x08, 0x00, 6, 4, 0, 1];
    arp.extend_from_slice(&sender);
    arp.extend_from_slice(&[192, 168, 0, 10]);
    arp.extend_from_slice(&[0; 6]);
    arp.extend_from_slice(&[192, 168, 0, 1]);
    ethernet(sender, 0x0806, &arp)
}
