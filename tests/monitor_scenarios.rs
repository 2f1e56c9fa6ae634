//! End-to-end monitor scenarios: DNS responses feed the answer cache,
//! observed frames feed the pair table, and the published summary reflects
//! both.

mod common;

use std::net::Ipv4Addr;

use dnsfence::events::PairCategory;
use dnsfence::monitor::{cache_dns_answers, DnsNameCache, PairTable};
use dnsfence::packet::extract_ip_pair;

use common::{dns_a_response, udp4_frame};

#[test]
fn response_enriches_later_pair_counts() {
    let mut cache = DnsNameCache::new();
    let mut pairs = PairTable::new();

    // A resolver answers news.example -> 93.184.216.34 ...
    let response = udp4_frame(
        Ipv4Addr::new(1, 1, 1, 1),
        53,
        Ipv4Addr::new(10, 0, 0, 5),
        54321,
        &dns_a_response(7, "news.example.", Ipv4Addr::new(93, 184, 216, 34)),
    );
    cache_dns_answers(&response, &mut cache);
    assert_eq!(cache.get("93.184.216.34"), Some("news.example"));

    // ... and the host then talks to that address: 3 frames out, 1 back.
    let out = udp4_frame(
        Ipv4Addr::new(10, 0, 0, 5),
        40000,
        Ipv4Addr::new(93, 184, 216, 34),
        443,
        b"x",
    );
    let back = udp4_frame(
        Ipv4Addr::new(93, 184, 216, 34),
        443,
        Ipv4Addr::new(10, 0, 0, 5),
        40000,
        b"y",
    );
    for _ in 0..3 {
        let (src, dst) = extract_ip_pair(&out).unwrap();
        pairs.record(&src, &dst, &cache);
    }
    let (src, dst) = extract_ip_pair(&back).unwrap();
    pairs.record(&src, &dst, &cache);

    let summary = pairs.summary();
    assert_eq!(summary.len(), 1);
    let pair = &summary[0];
    assert_eq!(pair.category, PairCategory::External);
    assert_eq!(pair.internal, "10.0.0.5");
    assert_eq!(pair.external, "93.184.216.34");
    assert_eq!(pair.external_domain, "news.example");
    assert_eq!(pair.outgoing, 3);
    assert_eq!(pair.incoming, 1);
}

#[test]
fn two_private_hosts_aggregate_under_one_internal_key() {
    let cache = DnsNameCache::new();
    let mut pairs = PairTable::new();

    // First packet observed 10.0.0.7 -> 10.0.0.2: against lexicographic
    // order, so it counts as incoming.
    let first = udp4_frame(
        Ipv4Addr::new(10, 0, 0, 7),
        1234,
        Ipv4Addr::new(10, 0, 0, 2),
        5678,
        b"a",
    );
    let (src, dst) = extract_ip_pair(&first).unwrap();
    pairs.record(&src, &dst, &cache);

    let summary = pairs.summary();
    assert_eq!(summary.len(), 1);
    let pair = &summary[0];
    assert_eq!(pair.category, PairCategory::Internal);
    assert_eq!(pair.internal, "10.0.0.2");
    assert_eq!(pair.external, "10.0.0.7");
    assert_eq!(pair.incoming, 1);
    assert_eq!(pair.outgoing, 0);

    // The reverse direction lands on the same aggregate.
    let second = udp4_frame(
        Ipv4Addr::new(10, 0, 0, 2),
        5678,
        Ipv4Addr::new(10, 0, 0, 7),
        1234,
        b"b",
    );
    let (src, dst) = extract_ip_pair(&second).unwrap();
    pairs.record(&src, &dst, &cache);
    let summary = pairs.summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].outgoing, 1);
    assert_eq!(summary[0].incoming, 1);
}

#[test]
fn summaries_rank_busiest_pairs_first() {
    let cache = DnsNameCache::new();
    let mut pairs = PairTable::new();

    for _ in 0..5 {
        pairs.record("10.0.0.5", "8.8.8.8", &cache);
    }
    pairs.record("10.0.0.5", "1.1.1.1", &cache);
    pairs.record("10.0.0.6", "9.9.9.9", &cache);

    let summary = pairs.summary();
    assert_eq!(summary[0].external, "8.8.8.8");
    // One-packet tie: "10.0.0.5->1.1.1.1" sorts before "10.0.0.6->9.9.9.9".
    assert_eq!(summary[1].external, "1.1.1.1");
    assert_eq!(summary[2].external, "9.9.9.9");
}
