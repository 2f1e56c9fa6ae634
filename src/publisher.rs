// Fire-and-forget event delivery to the control plane.
//
// The hot path enqueues into a bounded channel and never blocks; a single
// worker thread drains the queue and POSTs each event as JSON. Delivery is
// best-effort: a full queue, a failed request or a non-2xx response drops
// the event without affecting forwarding latency.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, warn};

use crate::events::Event;

/// Capacity of the in-memory event queue.
const QUEUE_DEPTH: usize = 256;

/// Per-request timeout for event POSTs.
const POST_TIMEOUT: Duration = Duration::from_secs(5);

/// Asynchronous HTTP publisher with a bounded queue.
pub struct HttpPublisher {
    tx: Option<Sender<Event>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl HttpPublisher {
    /// Start a publisher targeting `endpoint`, spawning its worker thread.
    pub fn new(endpoint: String) -> Self {
        let (tx, rx) = bounded::<Event>(QUEUE_DEPTH);

        let worker = thread::Builder::new()
            .name("dnsfence-publisher".into())
            .spawn(move || {
                let client = match reqwest::blocking::Client::builder()
                    .timeout(POST_TIMEOUT)
                    .build()
                {
                    Ok(client) => client,
                    Err(e) => {
                        warn!("event publisher disabled, client init failed: {}", e);
                        // Drain and discard so producers never notice.
                        for _ in rx.iter() {}
                        return;
                    }
                };

                for ev in rx.iter() {
                    match client.post(&endpoint).json(&ev).send() {
                        Ok(resp) if resp.status().is_success() => {}
                        Ok(resp) => {
                            debug!("event publish status {}", resp.status());
                        }
                        Err(e) => {
                            debug!("event publish to {}: {}", endpoint, e);
                        }
                    }
                }
            })
            .ok();

        Self {
            tx: Some(tx),
            worker,
        }
    }

    /// Enqueue an event without blocking; drops silently when the queue is
    /// full or the publisher is closed.
    pub fn publish(&self, ev: Event) {
        if let Some(tx) = &self.tx {
            match tx.try_send(ev) {
                Ok(()) | Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }

    /// Close the queue and wait for the worker to flush remaining events.
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for HttpPublisher {
    fn drop(&mut self) {
        self.close();
    }
}
