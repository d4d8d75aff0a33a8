//! Scriptable byte transport for tests.

use async_trait::async_trait;
use courier_core::Checksum;
use courier_server::transport::{ByteTransport, DeliveryReceipt, DeliveryRequest, TransportError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the mock should do when asked to deliver to one recipient.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
#[derive(Clone)]
pub enum MockOutcome {
    /// Echo the claimed digest back, so verification passes.
    EchoClaim,
    /// Succeed after sleeping, keeping the delivery in flight for a while.
    Delayed(Duration),
    /// Report this digest instead, failing verification when it differs.
    Digest(Checksum),
    /// Fail as unreachable.
    Unreachable,
    /// Fail as timed out.
    Timeout,
}

/// Byte transport whose per-recipient outcomes are scripted by the test.
/// Unscripted recipients succeed (claim echoed back).
pub struct MockTransport {
    outcomes: Mutex<HashMap<String, MockOutcome>>,
    attempts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Script the outcome for one recipient.
    pub fn script(&self, recipient: &str, outcome: MockOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(recipient.to_string(), outcome);
    }

    /// Recipients that delivery was attempted to, in attempt order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Highest number of deliveries that were ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ByteTransport for MockTransport {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<DeliveryReceipt, TransportError> {
        self.attempts
            .lock()
            .unwrap()
            .push(request.recipient.clone());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&request.recipient)
            .cloned();

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let result = match outcome {
            None | Some(MockOutcome::EchoClaim) => Ok(DeliveryReceipt {
                digest: request.checksum.clone(),
                bytes_sent: request.filesize,
            }),
            Some(MockOutcome::Delayed(pause)) => {
                tokio::time::sleep(pause).await;
                Ok(DeliveryReceipt {
                    digest: request.checksum.clone(),
                    bytes_sent: request.filesize,
                })
            }
            Some(MockOutcome::Digest(digest)) => Ok(DeliveryReceipt {
                digest: digest.clone(),
                bytes_sent: request.filesize,
            }),
            Some(MockOutcome::Unreachable) => Err(TransportError::Unreachable(format!(
                "{} is not listening",
                request.recipient
            ))),
            Some(MockOutcome::Timeout) => Err(TransportError::Timeout(Duration::from_secs(30))),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
