// DNS wire format decoder, RFC 1035 Section 4.
//
// Decodes the header, question section (with name decompression) and answer
// section. The authority and additional sections are never inspected by the
// inspector or the monitor, so decoding stops after the answers.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::FenceError;

/// Maximum number of pointer hops allowed during name decompression.
/// Prevents infinite loops from malicious compression pointers.
const MAX_COMPRESSION_HOPS: usize = 256;

/// Maximum allowed label length per RFC 1035 Section 2.3.4.
const MAX_LABEL_LENGTH: usize = 63;

/// DNS header size in bytes.
const HEADER_SIZE: usize = 12;

pub const TYPE_A: u16 = 1;
pub const TYPE_AAAA: u16 = 28;

/// A single question entry. Names keep their trailing dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// Decoded RDATA for the record types the monitor cares about. Everything
/// else is carried opaquely so the answer count stays truthful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Other,
}

/// An answer resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub rtype: u16,
    pub ttl: u32,
    pub data: RecordData,
}

/// A decoded DNS message, up to and including the answer section.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u16,
    pub is_response: bool,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

/// Decode a DNS message from its wire representation. `payload` must begin
/// at the DNS header (the UDP body for DNS-over-UDP).
pub fn decode(payload: &[u8]) -> Result<Message, FenceError> {
    if payload.len() < HEADER_SIZE {
        return Err(truncated(0, "header"));
    }

    let id = u16::from_be_bytes([payload[0], payload[1]]);
    let flags = u16::from_be_bytes([payload[2], payload[3]]);
    let qdcount = u16::from_be_bytes([payload[4], payload[5]]) as usize;
    let ancount = u16::from_be_bytes([payload[6], payload[7]]) as usize;
    let is_response = (flags >> 15) & 1 == 1;

    let mut offset = HEADER_SIZE;

    let mut questions = Vec::with_capacity(qdcount);
    for _ in 0..qdcount {
        let (name, next) = decompress_name(payload, offset)?;
        offset = next;
        if offset + 4 > payload.len() {
            return Err(truncated(offset, "question"));
        }
        let qtype = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
        let qclass = u16::from_be_bytes([payload[offset + 2], payload[offset + 3]]);
        offset += 4;
        questions.push(Question { name, qtype, qclass });
    }

    let mut answers = Vec::with_capacity(ancount);
    for _ in 0..ancount {
        let (answer, next) = decode_answer(payload, offset)?;
        offset = next;
        answers.push(answer);
    }

    Ok(Message {
        id,
        is_response,
        questions,
        answers,
    })
}

fn decode_answer(buf: &[u8], offset: usize) -> Result<(Answer, usize), FenceError> {
    let (name, mut offset) = decompress_name(buf, offset)?;

    if offset + 10 > buf.len() {
        return Err(truncated(offset, "resource record header"));
    }

    let rtype = u16::from_be_bytes([buf[offset], buf[offset + 1]]);
    let ttl = u32::from_be_bytes([
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ]);
    let rdlength = u16::from_be_bytes([buf[offset + 8], buf[offset + 9]]) as usize;
    offset += 10;

    if offset + rdlength > buf.len() {
        return Err(truncated(offset, "resource record rdata"));
    }

    let data = match rtype {
        TYPE_A => {
            if rdlength != 4 {
                return Err(FenceError::DnsParse {
                    offset,
                    detail: format!("A record rdata length {} != 4", rdlength),
                });
            }
            RecordData::A(Ipv4Addr::new(
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ))
        }
        TYPE_AAAA => {
            if rdlength != 16 {
                return Err(FenceError::DnsParse {
                    offset,
                    detail: format!("AAAA record rdata length {} != 16", rdlength),
                });
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[offset..offset + 16]);
            RecordData::Aaaa(Ipv6Addr::from(octets))
        }
        _ => RecordData::Other,
    };
    offset += rdlength;

    Ok((Answer { name, rtype, ttl, data }, offset))
}

/// Decompress a DNS name starting at `offset` in `buf`.
///
/// Follows RFC 1035 Section 4.1.4 name compression. Returns the name with
/// its trailing dot and the offset of the field immediately after the name.
/// When compression pointers are used, the returned offset points past the
/// first pointer encountered, not past the pointer's target.
fn decompress_name(buf: &[u8], mut offset: usize) -> Result<(String, usize), FenceError> {
    let mut name = String::new();
    let mut followed_pointer = false;
    let mut end_offset = 0;
    let mut hops = 0usize;

    loop {
        if hops > MAX_COMPRESSION_HOPS {
            return Err(FenceError::DnsParse {
                offset,
                detail: "compression loop".to_string(),
            });
        }
        if offset >= buf.len() {
            return Err(truncated(offset, "name"));
        }

        let len = buf[offset] as usize;

        if len == 0 {
            if !followed_pointer {
                end_offset = offset + 1;
            }
            break;
        }

        if len & 0xC0 == 0xC0 {
            if offset + 1 >= buf.len() {
                return Err(truncated(offset, "compression pointer"));
            }
            if !followed_pointer {
                end_offset = offset + 2;
            }
            offset = ((len & 0x3F) << 8) | (buf[offset + 1] as usize);
            followed_pointer = true;
            hops += 1;
            continue;
        }

        if len > MAX_LABEL_LENGTH {
            return Err(FenceError::DnsParse {
                offset,
                detail: format!("label length {} exceeds maximum of {}", len, MAX_LABEL_LENGTH),
            });
        }

        offset += 1;
        if offset + len > buf.len() {
            return Err(truncated(offset, "label"));
        }

        let label = std::str::from_utf8(&buf[offset..offset + len]).map_err(|_| {
            FenceError::DnsParse {
                offset,
                detail: "invalid UTF-8 in label".to_string(),
            }
        })?;
        name.push_str(label);
        name.push('.');
        offset += len;
        hops += 1;
    }

    // A root-only name is ".".
    if name.is_empty() {
        name.push('.');
    }

    Ok((name, end_offset))
}

fn truncated(offset: usize, what: &str) -> FenceError {
    FenceError::DnsParse {
        offset,
        detail: format!("truncated {}", what),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! DNS wire-format construction helpers shared across test modules.

    // Encode a domain name in wire format, no compression.
    // "example.com" -> [7, b"example", 3, b"com", 0]
    pub fn encode_name(name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        if name == "." || name.is_empty() {
            out.push(0);
            return out;
        }
        let stripped = name.strip_suffix('.').unwrap_or(name);
        for label in stripped.split('.') {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    pub fn build_query(id: u16, name: &str, qtype: u16) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&id.to_be_bytes());
        pkt.extend_from_slice(&[0x01, 0x00]); // QR=0, RD=1
        pkt.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
        pkt.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
        pkt.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
        pkt.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT
        pkt.extend_from_slice(&encode_name(name));
        pkt.extend_from_slice(&qtype.to_be_bytes());
        pkt.extend_from_slice(&1u16.to_be_bytes()); // QCLASS=IN
        pkt
    }

    pub fn build_response(
        id: u16,
        questions: &[(&str, u16)],
        answers: &[(&str, u16, &[u8])],
    ) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&id.to_be_bytes());
        pkt.extend_from_slice(&0x8180u16.to_be_bytes()); // QR=1, RD=1, RA=1
        pkt.extend_from_slice(&(questions.len() as u16).to_be_bytes());
        pkt.extend_from_slice(&(answers.len() as u16).to_be_bytes());
        pkt.extend_from_slice(&0u16.to_be_bytes());
        pkt.extend_from_slice(&0u16.to_be_bytes());
        for (name, qtype) in questions {
            pkt.extend_from_slice(&encode_name(name));
            pkt.extend_from_slice(&qtype.to_be_bytes());
            pkt.extend_from_slice(&1u16.to_be_bytes());
        }
        for (name, rtype, rdata) in answers {
            pkt.extend_from_slice(&encode_name(name));
            pkt.extend_from_slice(&rtype.to_be_bytes());
            pkt.extend_from_slice(&1u16.to_be_bytes()); // CLASS=IN
            pkt.extend_from_slice(&300u32.to_be_bytes()); // TTL
            pkt.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            pkt.extend_from_slice(rdata);
        }
        pkt
    }
}
