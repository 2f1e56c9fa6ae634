// Byte-level frame handling: Ethernet + IPv4/IPv6 + UDP parsing, the DNS
// frame filter used by the inspector, IP pair extraction for the monitor,
// the internet checksum, and the loop-prevention marker.
//
// The descriptor length is the only source of truth for the valid prefix of
// a frame; every function here treats its input slice as exactly that prefix.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::dns::{self, Message};
use crate::error::FenceError;
use crate::policy;

pub const ETH_HLEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
pub const PROTO_UDP: u8 = 17;
pub const DNS_PORT: u16 = 53;

/// Magic constant marking frames already processed by the inspector
/// ("KIDS"). Its low 16 bits are written into the IPv4 identification field
/// of re-transmitted frames; the kernel redirect program forwards marked
/// frames to the wire instead of redirecting them back to the socket. A
/// loop-prevention hint, not a security boundary.
pub const LOOP_MARKER: u32 = 0x4B49_4453;

const IPV4_MIN_HLEN: usize = 20;
const IPV6_HLEN: usize = 40;
const UDP_HLEN: usize = 8;

/// Direction of a DNS message as seen on the wire: responses come from
/// port 53, everything else is a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    Query,
    Response,
}

impl FrameDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameDirection::Query => "query",
            FrameDirection::Response => "response",
        }
    }
}

/// Metadata extracted from a frame that passed the DNS filter
/// (IPv4 + UDP + port 53 + decodable DNS payload).
#[derive(Debug, Clone)]
pub struct DnsFrame {
    pub message: Message,
    /// Normalised first question name, or empty when there are no questions.
    pub domain: String,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub source_port: u16,
    pub destination_port: u16,
    pub direction: FrameDirection,
}

impl DnsFrame {
    pub fn transport(&self) -> &'static str {
        "udp"
    }
}

/// Apply the inspector's DNS filter to a raw Ethernet frame.
///
/// Returns [`FenceError::NotDns`] for anything that is not
/// DNS-over-UDP-over-IPv4, and a parse error when the UDP payload looks like
/// DNS but does not decode. Both outcomes mean "forward unchanged" to the
/// caller.
pub fn parse_dns_frame(frame: &[u8]) -> Result<DnsFrame, FenceError> {
    if frame.len() < ETH_HLEN {
        return Err(FenceError::NotDns);
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    if ethertype != ETHERTYPE_IPV4 {
        return Err(FenceError::NotDns);
    }

    if frame.len() < ETH_HLEN + IPV4_MIN_HLEN {
        return Err(FenceError::NotDns);
    }
    let ihl = ((frame[ETH_HLEN] & 0x0F) as usize) * 4;
    if ihl < IPV4_MIN_HLEN || frame.len() < ETH_HLEN + ihl {
        return Err(FenceError::NotDns);
    }

    if frame[23] != PROTO_UDP {
        return Err(FenceError::NotDns);
    }

    let udp_offset = ETH_HLEN + ihl;
    if frame.len() < udp_offset + UDP_HLEN {
        return Err(FenceError::NotDns);
    }

    let source_port = u16::from_be_bytes([frame[udp_offset], frame[udp_offset + 1]]);
    let destination_port = u16::from_be_bytes([frame[udp_offset + 2], frame[udp_offset + 3]]);
    if source_port != DNS_PORT && destination_port != DNS_PORT {
        return Err(FenceError::NotDns);
    }

    let udp_len = u16::from_be_bytes([frame[udp_offset + 4], frame[udp_offset + 5]]) as usize;
    if udp_len < UDP_HLEN || frame.len() < udp_offset + udp_len {
        return Err(FenceError::NotDns);
    }
    let payload = &frame[udp_offset + UDP_HLEN..udp_offset + udp_len];
    if payload.is_empty() {
        return Err(FenceError::NotDns);
    }

    let message = dns::decode(payload)?;

    let domain = message
        .questions
        .first()
        .map(|q| policy::normalize(&q.name))
        .unwrap_or_default();
    let direction = if source_port == DNS_PORT {
        FrameDirection::Response
    } else {
        FrameDirection::Query
    };

    Ok(DnsFrame {
        message,
        domain,
        source: Ipv4Addr::new(frame[26], frame[27], frame[28], frame[29]),
        destination: Ipv4Addr::new(frame[30], frame[31], frame[32], frame[33]),
        source_port,
        destination_port,
        direction,
    })
}

/// 16-bit one's-complement internet checksum over `data`.
///
/// A header whose checksum field is populated sums to zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        sum += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Mark a frame as already-processed before re-transmission.
///
/// Writes the low 16 bits of [`LOOP_MARKER`] into the IPv4 identification
/// field (header octets 4-5) and repairs the header checksum. The kernel
/// redirect program matches on exactly this field and value. Frames that are
/// too short or not IPv4 are left untouched; the caller transmits them
/// unmarked (best-effort forwarding).
pub fn apply_loop_marker(frame: &mut [u8]) {
    if frame.len() < ETH_HLEN + IPV4_MIN_HLEN {
        return;
    }
    if frame[12] != 0x08 || frame[13] != 0x00 {
        return;
    }

    let ip = &mut frame[ETH_HLEN..];
    let ihl = ((ip[0] & 0x0F) as usize) * 4;
    if ihl < IPV4_MIN_HLEN || ip.len() < ihl {
        return;
    }

    let marker = (LOOP_MARKER & 0xFFFF) as u16;
    ip[4] = (marker >> 8) as u8;
    ip[5] = marker as u8;
    ip[10] = 0;
    ip[11] = 0;

    let csum = internet_checksum(&ip[..ihl]);
    ip[10] = (csum >> 8) as u8;
    ip[11] = csum as u8;
}

/// Extract source and destination IP strings from an Ethernet frame, IPv4 or
/// IPv6. Returns `None` for anything else (ARP, truncated frames, ...).
pub fn extract_ip_pair(frame: &[u8]) -> Option<(String, String)> {
    if frame.len() < ETH_HLEN {
        return None;
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    match ethertype {
        ETHERTYPE_IPV4 => {
            if frame.len() < ETH_HLEN + IPV4_MIN_HLEN {
                return None;
            }
            let src = Ipv4Addr::new(frame[26], frame[27], frame[28], frame[29]);
            let dst = Ipv4Addr::new(frame[30], frame[31], frame[32], frame[33]);
            Some((src.to_string(), dst.to_string()))
        }
        ETHERTYPE_IPV6 => {
            if frame.len() < ETH_HLEN + IPV6_HLEN {
                return None;
            }
            let src: [u8; 16] = frame[22..38].try_into().ok()?;
            let dst: [u8; 16] = frame[38..54].try_into().ok()?;
            Some((
                Ipv6Addr::from(src).to_string(),
                Ipv6Addr::from(dst).to_string(),
            ))
        }
        _ => None,
    }
}

/// UDP ports and payload of a frame, for the monitor's DNS enrichment pass.
#[derive(Debug)]
pub struct UdpSlice<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub payload: &'a [u8],
}

/// Locate the UDP payload of an IPv4 or IPv6 Ethernet frame.
///
/// IPv4 headers are IHL-sized; IPv6 uses the fixed 40-byte header and the
/// next-header octet must be UDP (extension headers are not traversed).
pub fn udp_slice(frame: &[u8]) -> Option<UdpSlice<'_>> {
    if frame.len() < ETH_HLEN {
        return None;
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    let udp_offset = match ethertype {
        ETHERTYPE_IPV4 => {
            if frame.len() < ETH_HLEN + IPV4_MIN_HLEN {
                return None;
            }
            let ihl = ((frame[ETH_HLEN] & 0x0F) as usize) * 4;
            if ihl < IPV4_MIN_HLEN || frame[23] != PROTO_UDP {
                return None;
            }
            ETH_HLEN + ihl
        }
        ETHERTYPE_IPV6 => {
            if frame.len() < ETH_HLEN + IPV6_HLEN + UDP_HLEN {
                return None;
            }
            if frame[ETH_HLEN + 6] != PROTO_UDP {
                return None;
            }
            ETH_HLEN + IPV6_HLEN
        }
        _ => return None,
    };

    if frame.len() < udp_offset + UDP_HLEN {
        return None;
    }
    let source_port = u16::from_be_bytes([frame[udp_offset], frame[udp_offset + 1]]);
    let destination_port = u16::from_be_bytes([frame[udp_offset + 2], frame[udp_offset + 3]]);
    let udp_len = u16::from_be_bytes([frame[udp_offset + 4], frame[udp_offset + 5]]) as usize;
    if udp_len < UDP_HLEN || frame.len() < udp_offset + udp_len {
        return None;
    }

    Some(UdpSlice {
        source_port,
        destination_port,
        payload: &frame[udp_offset + UDP_HLEN..udp_offset + udp_len],
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Raw frame construction helpers shared by the packet, inspector and
    //! monitor tests.

    use super::*;

    /// Build an Ethernet + IPv4 + UDP frame around `payload`.
    pub fn udp4_frame(
        src: Ipv4Addr,
        src_port: u16,
        dst: Ipv4Addr,
        dst_port: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        udp4_frame_with_options(src, src_port, dst, dst_port, payload, &[])
    }

    /// Same, with IPv4 options appended to the 20-byte header (IHL grows).
    pub fn udp4_frame_with_options(
        src: Ipv4Addr,
        src_port: u16,
        dst: Ipv4Addr,
        dst_port: u16,
        payload: &[u8],
        ip_options: &[u8],
    ) -> Vec<u8> {
        assert_eq!(ip_options.len() % 4, 0, "options must pad to 32-bit words");
        let ihl_bytes = IPV4_MIN_HLEN + ip_options.len();
        let udp_len = UDP_HLEN + payload.len();
        let total_len = ihl_bytes + udp_len;

        let mut frame = Vec::new();
        // Ethernet
        frame.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        // IPv4
        let ip_start = frame.len();
        frame.push(0x40 | (ihl_bytes / 4) as u8);
        frame.push(0x00);
        frame.extend_from_slice(&(total_len as u16).to_be_bytes());
        frame.extend_from_slice(&0x1c46u16.to_be_bytes()); // identification
        frame.extend_from_slice(&0u16.to_be_bytes()); // flags/fragment
        frame.push(64); // TTL
        frame.push(PROTO_UDP);
        frame.extend_from_slice(&0u16.to_be_bytes()); // checksum placeholder
        frame.extend_from_slice(&src.octets());
        frame.extend_from_slice(&dst.octets());
        frame.extend_from_slice(ip_options);
        let csum = internet_checksum(&frame[ip_start..ip_start + ihl_bytes]);
        frame[ip_start + 10] = (csum >> 8) as u8;
        frame[ip_start + 11] = csum as u8;
        // UDP
        frame.extend_from_slice(&src_port.to_be_bytes());
        frame.extend_from_slice(&dst_port.to_be_bytes());
        frame.extend_from_slice(&(udp_len as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Build an Ethernet + IPv6 + UDP frame around `payload`.
    pub fn udp6_frame(
        src: Ipv6Addr,
        src_port: u16,
        dst: Ipv6Addr,
        dst_port: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        let udp_len = UDP_HLEN + payload.len();
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&ETHERTYPE_IPV6.to_be_bytes());
        frame.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        frame.extend_from_slice(&(udp_len as u16).to_be_bytes());
        frame.push(PROTO_UDP);
        frame.push(64); // hop limit
        frame.extend_from_slice(&src.octets());
        frame.extend_from_slice(&dst.octets());
        frame.extend_from_slice(&src_port.to_be_bytes());
        frame.extend_from_slice(&dst_port.to_be_bytes());
        frame.extend_from_slice(&(udp_len as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Minimal ARP frame (EtherType 0x0806).
    pub fn arp_frame() -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xFF; 6]);
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&0x0806u16.to_be_bytes());
        frame.extend_from_slice(&[0u8; 28]);
        frame
    }
}
