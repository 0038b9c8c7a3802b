//! UDP receiver for the sensor bridge
//!
//! The socket is bound on the caller's thread so a port conflict is reported
//! before anything is spawned. The receive loop then runs on its own thread
//! and publishes every well-formed datagram to the `SignalChannel`.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use super::channel::SignalChannel;
use super::datagram::{MAX_DATAGRAM_LEN, parse_datagram};
use crate::error::{Error, Result};

/// How long a blocked receive waits before re-checking the stop flag
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Datagram counters (shared with the receive thread)
#[derive(Debug, Default)]
pub struct ReceiverStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
}

impl ReceiverStats {
    /// Datagrams parsed and published
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Datagrams discarded as malformed
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Receive calls that failed for reasons other than the poll timeout
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Running UDP receive loop
pub struct DatagramReceiver {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
    handle: Option<JoinHandle<()>>,
}

impl DatagramReceiver {
    /// Bind `addr` and start receiving into `channel`
    pub fn spawn(addr: SocketAddr, channel: SignalChannel) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|source| Error::Bind { addr, source })?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ReceiverStats::default());

        let handle = {
            let stop = stop.clone();
            let stats = stats.clone();
            std::thread::Builder::new()
                .name("hr-receiver".to_string())
                .spawn(move || receive_loop(socket, channel, &stop, &stats))?
        };

        log::info!("Listening for heart rate datagrams on {}", local_addr);

        Ok(Self {
            local_addr,
            stop,
            stats,
            handle: Some(handle),
        })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop, wait for the thread and release the socket
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        if handle.join().is_err() {
            log::error!("Receiver thread panicked");
        }
        log::info!(
            "Receiver on {} stopped ({} accepted, {} rejected)",
            self.local_addr,
            self.stats.accepted(),
            self.stats.rejected()
        );
    }
}

impl Drop for DatagramReceiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Blocking receive loop; owns the socket so it is closed when the loop exits
fn receive_loop(
    socket: UdpSocket,
    channel: SignalChannel,
    stop: &AtomicBool,
    stats: &ReceiverStats,
) {
    // One spare byte: a read that fills it came from an oversized datagram
    let mut buf = [0u8; MAX_DATAGRAM_LEN + 1];

    while !stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) if len > MAX_DATAGRAM_LEN => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                log::trace!("Discarded oversized datagram from {}", from);
            }
            Ok((len, from)) => match parse_datagram(&buf[..len]) {
                Some(sample) => {
                    channel.publish(sample);
                    stats.accepted.fetch_add(1, Ordering::Relaxed);
                    log::trace!(
                        "HR={} RR={} from {}",
                        sample.heart_rate,
                        sample.rr_interval,
                        from
                    );
                }
                None => {
                    stats.rejected.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Discarded malformed datagram ({} bytes) from {}", len, from);
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("Receive error: {}", e);
            }
        }
    }
}
