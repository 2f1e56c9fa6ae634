// Inspector fast path: refill the fill ring, poll for frames, classify each
// as forward-or-drop, mark and retransmit the survivors.
//
// Loop invariant: at the top of every iteration each frame this process owns
// is either posted to the fill ring, posted to the tx ring, waiting in the
// rx/completion rings, or on the free stack. Every rx descriptor is routed
// to exactly one of tx or fill before the loop blocks again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::bpf::XskMapHandle;
use crate::error::FenceError;
use crate::events::{Action, Event, EventKind};
use crate::packet::{self, FrameDirection};
use crate::policy::PolicySet;
use crate::publisher::HttpPublisher;
use crate::xsk::{FrameDesc, XskSocket, FRAME_SIZE, RX_RING_SIZE};

/// Name of the XSKMAP exposed by the pre-loaded XDP redirect program.
pub const XSK_MAP_NAME: &str = "xsk_map";

/// Receive poll timeout in milliseconds.
pub const FILL_POLL_MS: i32 = 1000;

/// Where a classified frame goes: back on the wire, or back to the fill
/// ring without transmit (the drop path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Drop,
}

/// Classify one frame against the policy set.
///
/// Frames that do not parse as DNS are forwarded silently. DNS frames
/// always produce an event; a query for a blocked domain is dropped,
/// everything else (other queries, all responses) is forwarded.
pub fn classify(
    frame: &[u8],
    policy: &PolicySet,
    now: DateTime<Utc>,
) -> (Verdict, Option<Event>) {
    let parsed = match packet::parse_dns_frame(frame) {
        Ok(parsed) => parsed,
        Err(_) => return (Verdict::Forward, None),
    };

    let mut ev = Event::new(EventKind::Dns, now);
    ev.source_ip = parsed.source.to_string();
    ev.destination_ip = parsed.destination.to_string();
    ev.transport = parsed.transport().to_string();
    ev.direction = parsed.direction.as_str().to_string();
    ev.domain = parsed.domain.clone();
    ev.source_port = parsed.source_port;
    ev.destination_port = parsed.destination_port;

    if parsed.direction == FrameDirection::Query
        && !parsed.domain.is_empty()
        && policy.contains(&parsed.domain)
    {
        ev.action = Some(Action::Block);
        ev.reason = "domain blocked".to_string();
        (Verdict::Drop, Some(ev))
    } else {
        ev.action = Some(Action::Allow);
        ev.reason = "passed".to_string();
        (Verdict::Forward, Some(ev))
    }
}

/// The inspector's socket, kernel map registration and policy handle.
pub struct Inspector {
    socket: XskSocket,
    xsk_map: XskMapHandle,
    policy: Arc<PolicySet>,
    queue_id: u32,
}

impl Inspector {
    /// Find the redirect program's map, create and register the AF_XDP
    /// socket on `ifindex`/`queue_id`, and prime the fill ring.
    pub fn new(ifindex: u32, queue_id: u32, policy: Arc<PolicySet>) -> Result<Self, FenceError> {
        let xsk_map = XskMapHandle::find(XSK_MAP_NAME)?;
        let mut socket = XskSocket::new(ifindex, queue_id)?;
        xsk_map.set(queue_id, socket.fd())?;

        let free = socket.free_fill_slots();
        let initial = socket.take_free_descs(free);
        if !initial.is_empty() {
            socket.fill(&initial);
        }

        Ok(Self {
            socket,
            xsk_map,
            policy,
            queue_id,
        })
    }

    /// Run the hot loop until `shutdown` is set. Ring errors other than
    /// signal interruption are fatal and end the loop.
    pub fn run(
        &mut self,
        publisher: &HttpPublisher,
        shutdown: &AtomicBool,
    ) -> Result<(), FenceError> {
        let mut allow: Vec<FrameDesc> = Vec::with_capacity(256);
        let mut reuse: Vec<FrameDesc> = Vec::with_capacity(256);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("inspector loop stopping");
                return Ok(());
            }

            // Starving the kernel of receive buffers is the dominant
            // data-loss mode, so top up the fill ring first.
            let free = self.socket.free_fill_slots();
            if free > 0 {
                let descs = self.socket.take_free_descs(free);
                if !descs.is_empty() {
                    self.socket.fill(&descs);
                }
            }

            let num_rx = match self.socket.poll(FILL_POLL_MS) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FenceError::Poll(e)),
            };
            if num_rx == 0 {
                continue;
            }

            let rx_descs = self.socket.receive(num_rx.min(RX_RING_SIZE as usize));
            if rx_descs.is_empty() {
                continue;
            }

            allow.clear();
            reuse.clear();
            let now = Utc::now();

            for mut desc in rx_descs {
                let (verdict, event) = classify(self.socket.frame(&desc), &self.policy, now);
                if let Some(ev) = event {
                    publisher.publish(ev);
                }
                match verdict {
                    Verdict::Forward => allow.push(desc),
                    Verdict::Drop => {
                        desc.len = FRAME_SIZE;
                        reuse.push(desc);
                    }
                }
            }

            if !allow.is_empty() {
                for desc in &allow {
                    packet::apply_loop_marker(self.socket.frame_mut(desc));
                }
                self.socket.transmit(&allow)?;
            }

            if !reuse.is_empty() {
                self.socket.fill(&reuse);
            }

            let completed = self.socket.complete();
            if completed > 0 {
                debug!("reaped {} tx completions", completed);
            }
        }
    }
}

impl Drop for Inspector {
    fn drop(&mut self) {
        if let Err(e) = self.xsk_map.remove(self.queue_id) {
            warn!(
                "unregister queue {} from {}: {}",
                self.queue_id,
                self.xsk_map.name(),
                e
            );
        }
    }
}
