//! UDP framing: one datagram per serialized record, no header.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::TransportError;

/// Fire-and-forget sender: publishes each record as a single datagram.
///
/// The socket is non-blocking; a full send buffer or an unreachable peer
/// drops the frame silently. The stream is lossy by contract and the next
/// frame is 10 ms away.
#[derive(Debug)]
pub struct UdpTelemetrySender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTelemetrySender {
    /// Bind an ephemeral local port and aim at `target`.
    pub fn new(target: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_nonblocking(true)?;
        info!(%target, "telemetry UDP sender ready");
        Ok(Self { socket, target })
    }

    /// Send one record image. Loss is tolerated; errors are logged at
    /// debug level and swallowed.
    pub fn send_record(&self, bytes: &[u8]) {
        if let Err(e) = self.socket.send_to(bytes, self.target) {
            if e.kind() != io::ErrorKind::WouldBlock {
                debug!("telemetry datagram dropped: {e}");
            }
        }
    }

    /// The configured destination.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Polling receiver for the record stream.
#[derive(Debug)]
pub struct UdpTelemetryReceiver {
    socket: UdpSocket,
}

impl UdpTelemetryReceiver {
    /// Bind the configured port on all interfaces.
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        info!(port, "telemetry UDP receiver bound");
        Ok(Self { socket })
    }

    /// Non-blocking poll for one datagram. `Ok(None)` when nothing is
    /// queued.
    pub fn try_recv(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.socket.recv(buf) {
            Ok(len) => Ok(Some(len)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Poll for one datagram until `timeout` elapses. `Ok(None)` on
    /// timeout.
    pub fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_recv(buf)? {
                Some(len) => return Ok(Some(len)),
                None => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    /// Local address the receiver is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_send_and_receive_one_datagram() -> TestResult {
        let receiver = UdpTelemetryReceiver::bind(0)?;
        let target = receiver.local_addr()?;
        let sender = UdpTelemetrySender::new(target)?;

        let payload = [7u8; 176];
        sender.send_record(&payload);

        let mut buf = [0u8; 512];
        let len = receiver
            .recv_timeout(&mut buf, Duration::from_secs(2))?
            .ok_or("no datagram within timeout")?;
        assert_eq!(len, payload.len());
        assert_eq!(&buf[..len], &payload[..]);
        Ok(())
    }

    #[test]
    fn test_try_recv_empty_socket() -> TestResult {
        let receiver = UdpTelemetryReceiver::bind(0)?;
        let mut buf = [0u8; 64];
        assert!(receiver.try_recv(&mut buf)?.is_none());
        Ok(())
    }

    #[test]
    fn test_sender_tolerates_unreachable_target() -> TestResult {
        // No listener on the far side; the send must not error out.
        let sender = UdpTelemetrySender::new("127.0.0.1:9".parse()?)?;
        sender.send_record(&[0u8; 16]);
        Ok(())
    }
}
