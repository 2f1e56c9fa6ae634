//! End-to-end classification scenarios: a synthetic frame goes through the
//! same classify-then-mark path the inspector's hot loop runs, and the
//! decision, event and frame bytes are checked together.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use dnsfence::events::{Action, EventKind};
use dnsfence::inspector::{classify, Verdict};
use dnsfence::packet::apply_loop_marker;
use dnsfence::policy::PolicySet;

use common::{arp_frame, dns_query, ipv4_checksum_valid, udp4_frame};

fn client() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 5)
}

fn resolver() -> Ipv4Addr {
    Ipv4Addr::new(1, 1, 1, 1)
}

#[test]
fn blocked_query_goes_to_the_drop_path() {
    let policy = PolicySet::new(["ads.example"]);
    let frame = udp4_frame(client(), 54321, resolver(), 53, &dns_query(1, "ads.example."));

    let (verdict, event) = classify(&frame, &policy, Utc::now());

    assert_eq!(verdict, Verdict::Drop);
    let ev = event.expect("a dns event per decision");
    assert_eq!(ev.kind, EventKind::Dns);
    assert_eq!(ev.action, Some(Action::Block));
    assert_eq!(ev.reason, "domain blocked");
    assert_eq!(ev.domain, "ads.example");
    assert_eq!(ev.source_ip, "10.0.0.5");
    assert_eq!(ev.destination_ip, "1.1.1.1");
    assert_eq!(ev.direction, "query");
    assert_eq!(ev.transport, "udp");
}

#[test]
fn allowed_query_is_marked_and_forwarded() {
    let policy = PolicySet::new(["ads.example"]);
    let mut frame = udp4_frame(client(), 54321, resolver(), 53, &dns_query(2, "news.example."));

    let (verdict, event) = classify(&frame, &policy, Utc::now());
    assert_eq!(verdict, Verdict::Forward);
    let ev = event.expect("a dns event per decision");
    assert_eq!(ev.action, Some(Action::Allow));
    assert_eq!(ev.reason, "passed");
    assert_eq!(ev.domain, "news.example");

    apply_loop_marker(&mut frame);
    // IP identification field carries the low 16 bits of the "KIDS" magic,
    // and the repaired header checksum verifies.
    assert_eq!(frame[18], 0x44);
    assert_eq!(frame[19], 0x53);
    assert!(ipv4_checksum_valid(&frame[14..34]));
}

#[test]
fn marking_twice_is_stable() {
    let policy = PolicySet::new(Vec::<&str>::new());
    let mut frame = udp4_frame(client(), 54321, resolver(), 53, &dns_query(3, "news.example."));
    let (verdict, _) = classify(&frame, &policy, Utc::now());
    assert_eq!(verdict, Verdict::Forward);

    apply_loop_marker(&mut frame);
    let once = frame.clone();
    apply_loop_marker(&mut frame);
    assert_eq!(frame, once);
    assert!(ipv4_checksum_valid(&frame[14..34]));
}

#[test]
fn arp_frame_is_forwarded_without_event_or_marker() {
    let policy = PolicySet::new(["ads.example"]);
    let mut frame = arp_frame();
    let before = frame.clone();

    let (verdict, event) = classify(&frame, &policy, Utc::now());
    assert_eq!(verdict, Verdict::Forward);
    assert!(event.is_none());

    apply_loop_marker(&mut frame);
    assert_eq!(frame, before, "marker must not touch non-IPv4 frames");
}

#[test]
fn policy_replacement_applies_to_the_next_decision() {
    let policy = Arc::new(PolicySet::new(["ads.example"]));
    let frame = udp4_frame(client(), 54321, resolver(), 53, &dns_query(4, "ads.example."));

    let (verdict, _) = classify(&frame, &policy, Utc::now());
    assert_eq!(verdict, Verdict::Drop);

    policy.replace(["other.example"]);
    let (verdict, _) = classify(&frame, &policy, Utc::now());
    assert_eq!(verdict, Verdict::Forward);
}
