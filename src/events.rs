// Event records published to the control plane.
//
// Events are observational: delivery is best-effort and the control plane
// may interleave inspector and monitor events arbitrarily. The JSON field
// names are part of the wire contract with the control plane and its UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Dns,
    IpPairSummary,
    Control,
}

/// Decision taken for a DNS query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

/// Aggregation bucket for an IP pair: both-private pairs are `internal`,
/// everything else `external`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairCategory {
    Internal,
    External,
}

/// A semi-structured record produced by the inspector or the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sourceIp", default, skip_serializing_if = "String::is_empty")]
    pub source_ip: String,
    #[serde(rename = "destinationIp", default, skip_serializing_if = "String::is_empty")]
    pub destination_ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub transport: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub direction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(rename = "sourcePort", default, skip_serializing_if = "is_zero_port")]
    pub source_port: u16,
    #[serde(
        rename = "destinationPort",
        default,
        skip_serializing_if = "is_zero_port"
    )]
    pub destination_port: u16,
    #[serde(rename = "pairCounts", default, skip_serializing_if = "Vec::is_empty")]
    pub pair_counts: Vec<PairCount>,
}

/// Cumulative packet totals for one canonical IP pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCount {
    pub category: PairCategory,
    pub internal: String,
    pub external: String,
    #[serde(
        rename = "externalDomain",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub external_domain: String,
    pub incoming: u64,
    pub outgoing: u64,
}

fn is_zero_port(port: &u16) -> bool {
    *port == 0
}

impl Event {
    /// Empty event of the given kind; callers fill in what they know.
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            source_ip: String::new(),
            destination_ip: String::new(),
            transport: String::new(),
            direction: String::new(),
            domain: String::new(),
            action: None,
            reason: String::new(),
            source_port: 0,
            destination_port: 0,
            pair_counts: Vec::new(),
        }
    }

    /// Summary event carrying the monitor's aggregated pair counts.
    pub fn pair_summary(timestamp: DateTime<Utc>, pair_counts: Vec<PairCount>) -> Self {
        let mut ev = Self::new(EventKind::IpPairSummary, timestamp);
        ev.pair_counts = pair_counts;
        ev
    }
}

/// Derive the event-ingest URL from the control plane's listen address.
///
/// `":8080"` becomes `http://127.0.0.1:8080/api/events`; an address without
/// a scheme gets `http://`; an explicit scheme is preserved.
pub fn build_endpoint(listen: &str, path: &str) -> String {
    let mut addr = listen.to_string();
    if addr.starts_with(':') {
        addr = format!("127.0.0.1{}", addr);
    }
    if !addr.starts_with("http://") && !addr.starts_with("https://") {
        addr = format!("http://{}", addr);
    }
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("{}{}", addr.trim_end_matches('/'), path)
}
