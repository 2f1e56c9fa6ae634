// Passive traffic monitor: a promiscuous AF_PACKET socket on a secondary
// interface, per-IP-pair packet accounting enriched with recently observed
// DNS answers, and a 2-second summary publication cadence.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{info, warn};

use crate::dns::{self, RecordData};
use crate::error::FenceError;
use crate::events::{Event, PairCategory, PairCount};
use crate::packet::{self, DNS_PORT};
use crate::publisher::HttpPublisher;

/// How often aggregated pair counts are published.
pub const SUMMARY_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on cached address -> domain entries (FIFO eviction).
const DNS_CACHE_CAPACITY: usize = 10_000;

/// Upper bound on distinct tracked pairs; past it, new pairs are ignored.
const PAIR_TABLE_CAPACITY: usize = 65_536;

const ETH_P_ALL: u16 = 0x0003;
const SOL_PACKET: i32 = 263;
const PACKET_ADD_MEMBERSHIP: i32 = 1;
const PACKET_MR_PROMISC: u16 = 1;

const RECV_BUFFER_SIZE: usize = 65_536;

// ---------------------------------------------------------------------------
// DNS answer cache
// ---------------------------------------------------------------------------

/// Maps an answer address (string form) to the most recently observed
/// question domain. Bounded; the oldest-inserted key is evicted first.
#[derive(Debug, Default)]
pub struct DnsNameCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl DnsNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: String, domain: String) {
        if self.entries.insert(address.clone(), domain).is_none() {
            self.order.push_back(address);
            while self.entries.len() > DNS_CACHE_CAPACITY {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.entries.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// If `frame` is a DNS response (UDP source port 53, IPv4 or IPv6), cache
/// each A/AAAA answer address against the first question's domain.
pub fn cache_dns_answers(frame: &[u8], cache: &mut DnsNameCache) {
    let Some(udp) = packet::udp_slice(frame) else {
        return;
    };
    if udp.source_port != DNS_PORT || udp.payload.is_empty() {
        return;
    }
    let Ok(msg) = dns::decode(udp.payload) else {
        return;
    };
    if msg.answers.is_empty() || msg.questions.is_empty() {
        return;
    }
    let domain = msg.questions[0]
        .name
        .strip_suffix('.')
        .unwrap_or(&msg.questions[0].name);
    if domain.is_empty() {
        return;
    }
    for answer in &msg.answers {
        match &answer.data {
            RecordData::A(addr) => cache.insert(addr.to_string(), domain.to_string()),
            RecordData::Aaaa(addr) => cache.insert(addr.to_string(), domain.to_string()),
            RecordData::Other => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Pair accounting
// ---------------------------------------------------------------------------

/// A pair key canonicalised to internal/external order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPair {
    pub key: String,
    pub internal: String,
    pub external: String,
    pub category: PairCategory,
    pub direction: PairDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairDirection {
    Incoming,
    Outgoing,
}

/// Loopback, link-local, or RFC1918 (10/8, 172.16/12, 192.168/16,
/// 169.254/16). Unparseable strings are treated as public.
pub fn is_private_ip(addr: &str) -> bool {
    let Ok(ip) = addr.parse::<std::net::IpAddr>() else {
        return false;
    };
    match ip {
        std::net::IpAddr::V4(v4) => {
            if v4.is_loopback() || v4.is_link_local() {
                return true;
            }
            let o = v4.octets();
            o[0] == 10
                || (o[0] == 172 && (16..=31).contains(&o[1]))
                || (o[0] == 192 && o[1] == 168)
                || (o[0] == 224 && o[1] == 0 && o[2] == 0)
        }
        std::net::IpAddr::V6(v6) => {
            if v6.is_loopback() {
                return true;
            }
            let seg = v6.segments();
            (seg[0] & 0xffc0) == 0xfe80 || (seg[0] & 0xff0f) == 0xff02
        }
    }
}

/// Canonicalise a (src, dst) observation.
///
/// Private->public traffic is `external`/outgoing, public->private
/// `external`/incoming. When both sides share a category the pair is ordered
/// lexicographically and the direction says which way this packet went
/// relative to that order.
pub fn canonical_pair(src: &str, dst: &str) -> CanonicalPair {
    let src_private = is_private_ip(src);
    let dst_private = is_private_ip(dst);

    let (internal, external, category, direction) = match (src_private, dst_private) {
        (true, false) => (src, dst, PairCategory::External, PairDirection::Outgoing),
        (false, true) => (dst, src, PairCategory::External, PairDirection::Incoming),
        (true, true) | (false, false) => {
            let category = if src_private {
                PairCategory::Internal
            } else {
                PairCategory::External
            };
            if src <= dst {
                (src, dst, category, PairDirection::Outgoing)
            } else {
                (dst, src, category, PairDirection::Incoming)
            }
        }
    };

    let tag = match category {
        PairCategory::Internal => "internal",
        PairCategory::External => "external",
    };

    CanonicalPair {
        key: format!("{}|{}|{}", tag, internal, external),
        internal: internal.to_string(),
        external: external.to_string(),
        category,
        direction,
    }
}

#[derive(Debug)]
struct PairStats {
    internal: String,
    external: String,
    category: PairCategory,
    incoming: u64,
    outgoing: u64,
    domain: String,
}

/// Cumulative per-pair counters, keyed canonically. Counters are never
/// reset; summaries report process-lifetime totals.
#[derive(Debug, Default)]
pub struct PairTable {
    pairs: HashMap<String, PairStats>,
}

impl PairTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one packet from `src` to `dst`, picking up a cached domain for
    /// the external side when one is known.
    pub fn record(&mut self, src: &str, dst: &str, cache: &DnsNameCache) {
        let pair = canonical_pair(src, dst);
        if !self.pairs.contains_key(&pair.key) && self.pairs.len() >= PAIR_TABLE_CAPACITY {
            return;
        }
        let stats = self.pairs.entry(pair.key).or_insert_with(|| PairStats {
            internal: pair.internal,
            external: pair.external,
            category: pair.category,
            incoming: 0,
            outgoing: 0,
            domain: String::new(),
        });
        match pair.direction {
            PairDirection::Incoming => stats.incoming += 1,
            PairDirection::Outgoing => stats.outgoing += 1,
        }
        if let Some(domain) = cache.get(&stats.external) {
            stats.domain = domain.to_string();
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All aggregates, sorted by total packets descending, ties broken by
    /// `internal->external` ascending.
    pub fn summary(&self) -> Vec<PairCount> {
        let mut out: Vec<PairCount> = self
            .pairs
            .values()
            .map(|stats| PairCount {
                category: stats.category,
                internal: stats.internal.clone(),
                external: stats.external.clone(),
                external_domain: stats.domain.clone(),
                incoming: stats.incoming,
                outgoing: stats.outgoing,
            })
            .collect();
        out.sort_by(|a, b| {
            let total_a = a.incoming + a.outgoing;
            let total_b = b.incoming + b.outgoing;
            total_b.cmp(&total_a).then_with(|| {
                let label_a = format!("{}->{}", a.internal, a.external);
                let label_b = format!("{}->{}", b.internal, b.external);
                label_a.cmp(&label_b)
            })
        });
        out
    }
}

// ---------------------------------------------------------------------------
// Capture loop
// ---------------------------------------------------------------------------

/// The monitor's raw socket plus its accounting state.
pub struct Monitor {
    fd: OwnedFd,
    iface: String,
    buffer: Vec<u8>,
    pairs: PairTable,
    cache: DnsNameCache,
}

impl Monitor {
    /// Bring `iface` up and open a promiscuous AF_PACKET socket bound to it.
    pub fn open(iface: &str) -> Result<Self, FenceError> {
        let raw = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                i32::from(ETH_P_ALL.to_be()),
            )
        };
        if raw < 0 {
            return Err(FenceError::Capture(format!(
                "socket(AF_PACKET): {}",
                io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let if_index = crate::xsk::interface_index(iface)?;
        set_link_up(&fd, iface);

        let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = ETH_P_ALL.to_be();
        sll.sll_ifindex = if_index as i32;
        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(FenceError::Capture(format!(
                "bind(AF_PACKET, {}): {}",
                iface,
                io::Error::last_os_error()
            )));
        }

        enable_promiscuous(&fd, iface, if_index);

        info!("monitor reading packets on {} (ifindex={})", iface, if_index);

        Ok(Self {
            fd,
            iface: iface.to_string(),
            buffer: vec![0u8; RECV_BUFFER_SIZE],
            pairs: PairTable::new(),
            cache: DnsNameCache::new(),
        })
    }

    /// Read frames until `shutdown` is set, publishing a pair summary every
    /// [`SUMMARY_INTERVAL`].
    pub fn run(
        &mut self,
        publisher: &HttpPublisher,
        shutdown: &AtomicBool,
    ) -> Result<(), FenceError> {
        let mut last_publish = Instant::now();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("monitor loop stopping");
                return Ok(());
            }

            let mut pfd = libc::pollfd {
                fd: self.fd.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let ret = unsafe { libc::poll(&mut pfd, 1, -1) };
            if ret < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(FenceError::Poll(err));
            }
            if (pfd.revents & libc::POLLIN) == 0 {
                continue;
            }

            let n = unsafe {
                libc::recvfrom(
                    self.fd.as_raw_fd(),
                    self.buffer.as_mut_ptr() as *mut libc::c_void,
                    self.buffer.len(),
                    0,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(FenceError::Capture(format!(
                    "recvfrom on {}: {}",
                    self.iface, err
                )));
            }
            if n == 0 {
                continue;
            }

            let frame = &self.buffer[..n as usize];
            cache_dns_answers(frame, &mut self.cache);
            if let Some((src, dst)) = packet::extract_ip_pair(frame) {
                self.pairs.record(&src, &dst, &self.cache);
            }

            if last_publish.elapsed() >= SUMMARY_INTERVAL {
                if !self.pairs.is_empty() {
                    publisher.publish(Event::pair_summary(Utc::now(), self.pairs.summary()));
                }
                last_publish = Instant::now();
            }
        }
    }
}

/// Set IFF_UP on `iface`. Best effort; the capture may still work on an
/// already-up interface even when the ioctl is refused.
fn set_link_up(fd: &OwnedFd, iface: &str) {
    #[repr(C)]
    struct IfReqFlags {
        name: [u8; libc::IFNAMSIZ],
        flags: libc::c_short,
        _pad: [u8; 22],
    }

    let mut req = IfReqFlags {
        name: [0; libc::IFNAMSIZ],
        flags: 0,
        _pad: [0; 22],
    };
    let bytes = iface.as_bytes();
    if bytes.len() >= libc::IFNAMSIZ {
        warn!("interface name {} too long for ioctl", iface);
        return;
    }
    req.name[..bytes.len()].copy_from_slice(bytes);

    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), libc::SIOCGIFFLAGS, &mut req) };
    if ret < 0 {
        warn!(
            "SIOCGIFFLAGS on {}: {}",
            iface,
            io::Error::last_os_error()
        );
        return;
    }
    if (req.flags & libc::IFF_UP as libc::c_short) != 0 {
        return;
    }
    req.flags |= libc::IFF_UP as libc::c_short;
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), libc::SIOCSIFFLAGS, &req) };
    if ret < 0 {
        warn!(
            "link up {}: {}",
            iface,
            io::Error::last_os_error()
        );
    }
}

/// Enable promiscuous mode; degraded capture is logged, not fatal.
fn enable_promiscuous(fd: &OwnedFd, iface: &str, if_index: u32) {
    #[repr(C)]
    struct PacketMreq {
        mr_ifindex: i32,
        mr_type: u16,
        mr_alen: u16,
        mr_address: [u8; 8],
    }

    let mreq = PacketMreq {
        mr_ifindex: if_index as i32,
        mr_type: PACKET_MR_PROMISC,
        mr_alen: 0,
        mr_address: [0u8; 8],
    };
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_PACKET,
            PACKET_ADD_MEMBERSHIP,
            &mreq as *const PacketMreq as *const libc::c_void,
            std::mem::size_of::<PacketMreq>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        warn!(
            "PACKET_MR_PROMISC on {}: {} (continuing without promiscuous mode)",
            iface,
            io::Error::last_os_error()
        );
    }
}
