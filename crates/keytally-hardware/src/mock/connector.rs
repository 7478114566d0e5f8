//! Mock connector handing out queued transports.

use crate::error::{HardwareError, Result};
use crate::mock::transport::{MockTransport, MockTransportHandle};
use crate::traits::Connector;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<VecDeque<MockTransport>>,
    failures: AtomicUsize,
    attempts: AtomicUsize,
    attached: AtomicUsize,
}

/// Connector returning transports attached through its handle.
///
/// With nothing queued, `connect` fails with `NoDeviceFound`, which is what
/// the real connector reports while the keypad is unplugged.
///
/// # Examples
///
/// ```
/// use keytally_hardware::mock::MockConnector;
/// use keytally_hardware::traits::Connector;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut connector, handle) = MockConnector::new();
///     assert!(connector.connect().await.is_err());
///
///     let _device = handle.attach();
///     assert!(connector.connect().await.is_ok());
/// }
/// ```
#[derive(Debug)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    pub fn new() -> (Self, MockConnectorHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockConnectorHandle { shared },
        )
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&mut self) -> Result<MockTransport> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .shared
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HardwareError::no_device(None));
        }

        self.shared
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| HardwareError::no_device(None))
    }
}

/// Handle controlling a [`MockConnector`].
#[derive(Debug, Clone)]
pub struct MockConnectorHandle {
    shared: Arc<Shared>,
}

impl MockConnectorHandle {
    /// Plug in a device: queue a new transport and return its handle.
    pub fn attach(&self) -> MockTransportHandle {
        let n = self.shared.attached.fetch_add(1, Ordering::SeqCst);
        let (transport, handle) = MockTransport::new(format!("mock{n}"));
        self.shared
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(transport);
        handle
    }

    /// Fail the next `n` connect attempts regardless of the queue.
    pub fn fail_next(&self, n: usize) {
        self.shared.failures.store(n, Ordering::SeqCst);
    }

    /// Number of connect attempts so far.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}
