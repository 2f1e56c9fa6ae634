//! In-line DNS policy enforcement on kernel-bypass packet I/O.
//!
//! The crate ships two binaries sharing this library:
//!
//! - `dnsfence-inspector` binds an AF_XDP socket to a physical interface
//!   queue (fed by a pre-loaded XDP redirect program), classifies every
//!   frame as DNS-over-UDP or not, and either re-transmits the frame with a
//!   loop-prevention marker or silently recycles its buffer (drop).
//! - `dnsfence-monitor` reads every frame off a secondary interface in
//!   promiscuous mode, aggregates per-IP-pair packet counts enriched with
//!   recently observed DNS answers, and publishes periodic summaries.
//!
//! Both publish decision/summary events to an HTTP control plane through a
//! bounded fire-and-forget queue.

pub mod bpf;
pub mod config;
pub mod dns;
pub mod error;
pub mod events;
pub mod inspector;
pub mod monitor;
pub mod packet;
pub mod policy;
pub mod publisher;
pub mod xsk;
