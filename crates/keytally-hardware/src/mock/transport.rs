//! Mock keypad link.

use crate::error::{HardwareError, Result};
use crate::traits::Transport;
use keytally_protocol::IndicatorCommand;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default idle poll of the mock link.
const MOCK_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
enum MockInput {
    Data(Vec<u8>),
    Fail(String),
}

/// Mock transport simulating the keypad end of the link.
///
/// # Examples
///
/// ```
/// use keytally_hardware::mock::MockTransport;
/// use keytally_hardware::traits::Transport;
///
/// #[tokio::main]
/// async fn main() -> keytally_hardware::Result<()> {
///     let (mut transport, handle) = MockTransport::new("mock0");
///
///     handle.send_line("BTN:3");
///     let mut buf = [0u8; 64];
///     let n = transport.read_available(&mut buf).await?;
///     assert_eq!(&buf[..n], b"BTN:3\n");
///
///     transport.write(b"LED:ALL:0,0,0\n").await?;
///     assert_eq!(handle.written_lines(), vec!["LED:ALL:0,0,0"]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    input_rx: mpsc::UnboundedReceiver<MockInput>,
    pending: VecDeque<u8>,
    written: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl MockTransport {
    /// Create a transport and the handle controlling it.
    pub fn new(name: impl Into<String>) -> (Self, MockTransportHandle) {
        let name = name.into();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let transport = Self {
            name: name.clone(),
            input_rx,
            pending: VecDeque::new(),
            written: Arc::clone(&written),
            fail_writes: Arc::clone(&fail_writes),
            poll_interval: MOCK_POLL_INTERVAL,
        };

        let handle = MockTransportHandle {
            name,
            input_tx,
            written,
            fail_writes,
        };

        (transport, handle)
    }

    /// Override the idle poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn take_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.pending.is_empty() {
            return Ok(self.take_pending(buf));
        }

        match self.input_rx.try_recv() {
            Ok(MockInput::Data(bytes)) => {
                self.pending.extend(bytes);
                Ok(self.take_pending(buf))
            }
            Ok(MockInput::Fail(message)) => Err(HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                message,
            ))),
            Err(mpsc::error::TryRecvError::Empty) => {
                tokio::time::sleep(self.poll_interval).await;
                Ok(0)
            }
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(HardwareError::disconnected(&self.name))
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }

        let text = String::from_utf8_lossy(data);
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        written.extend(
            text.split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
        Ok(())
    }
}

/// Handle for driving a [`MockTransport`].
///
/// Dropping every handle makes the transport report a disconnect.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    name: String,
    input_tx: mpsc::UnboundedSender<MockInput>,
    written: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockTransportHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a line as if the device had printed it.
    pub fn send_line(&self, line: &str) {
        self.send_bytes(format!("{line}\n").as_bytes());
    }

    /// Queue raw bytes, e.g. a partial line.
    pub fn send_bytes(&self, bytes: &[u8]) {
        let _ = self.input_tx.send(MockInput::Data(bytes.to_vec()));
    }

    /// Make the next read fail, as an unplugged device would.
    pub fn fail_read(&self, message: &str) {
        let _ = self.input_tx.send(MockInput::Fail(message.to_string()));
    }

    /// Make every write fail until reset.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lines written by the host so far.
    pub fn written_lines(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Written lines parsed back into indicator commands.
    ///
    /// Lines that are not indicator commands are skipped.
    pub fn written_commands(&self) -> Vec<IndicatorCommand> {
        self.written_lines()
            .iter()
            .filter_map(|line| line.parse().ok())
            .collect()
    }

    /// Forget the lines written so far.
    pub fn clear_written(&self) {
        self.written.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_idle_returns_zero() {
        let (mut transport, _handle) = MockTransport::new("mock");
        let mut buf = [0u8; 8];
        assert_eq!(transport.read_available(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_in_small_chunks() {
        let (mut transport, handle) = MockTransport::new("mock");
        handle.send_line("BTN:9:LONG");

        let mut buf = [0u8; 4];
        let mut collected = Vec::new();
        loop {
            let n = transport.read_available(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"BTN:9:LONG\n");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let (mut transport, handle) = MockTransport::new("mock");
        handle.fail_read("unplugged");

        let mut buf = [0u8; 8];
        let err = transport.read_available(&mut buf).await.unwrap_err();
        assert!(matches!(err, HardwareError::Io(_)));
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects() {
        let (mut transport, handle) = MockTransport::new("mock");
        drop(handle);

        let mut buf = [0u8; 8];
        let err = transport.read_available(&mut buf).await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_written_commands() {
        let (mut transport, handle) = MockTransport::new("mock");
        transport.write(b"LED:STOP\nLED:ALL:0,0,0\n").await.unwrap();
        transport.write(b"PING\n").await.unwrap();

        assert_eq!(handle.written_lines().len(), 3);
        assert_eq!(
            handle.written_commands(),
            vec![IndicatorCommand::StopAnimation, IndicatorCommand::CLEAR]
        );

        handle.clear_written();
        assert!(handle.written_lines().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure() {
        let (mut transport, handle) = MockTransport::new("mock");
        handle.set_write_failure(true);
        assert!(transport.write(b"LED:STOP\n").await.is_err());

        handle.set_write_failure(false);
        assert!(transport.write(b"LED:STOP\n").await.is_ok());
        assert_eq!(handle.written_lines(), vec!["LED:STOP"]);
    }
}
