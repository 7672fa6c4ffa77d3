//! Single-consumer TCP relay for RTCM3 correction blocks.
//!
//! One relay serves exactly one consumer:
//!
//! 1. `bind` the listener
//! 2. `accept` one connection, bounded by the accept timeout
//! 3. discard every block queued before the connection existed
//! 4. forward new blocks verbatim, in FIFO order, until stop or disconnect
//!
//! No framing is added. A failed write ends the session; reconnecting
//! requires a new relay.

use crate::core::types::RunState;
use crate::error::{RelayError, Result};
use crate::streaming::queue::CorrectionQueue;
use log::{debug, info, warn};
use std::io::{self, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sleep between non-blocking accept attempts
const ACCEPT_POLL_INTERVAL_MS: u64 = 10;
/// Bound on one queue wait, so the stop flag is observed promptly
const QUEUE_POLL_INTERVAL_MS: u64 = 50;
/// Bound on one blocked socket write, for a consumer that stopped reading
const WRITE_TIMEOUT_MS: u64 = 100;

/// Outcome of a finished relay session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub consumer: SocketAddr,
    /// Blocks dropped at connect time
    pub discarded: usize,
    pub blocks_sent: u64,
    pub bytes_sent: u64,
}

pub struct CorrectionRelay {
    listener: TcpListener,
    queue: CorrectionQueue,
    run_state: Arc<RunState>,
    accept_timeout: Duration,
}

impl CorrectionRelay {
    /// Bind the listening socket
    pub fn bind<A: ToSocketAddrs>(
        address: A,
        queue: CorrectionQueue,
        run_state: Arc<RunState>,
        accept_timeout: Duration,
    ) -> std::result::Result<Self, RelayError> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        info!("Correction relay listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            queue,
            run_state,
            accept_timeout,
        })
    }

    pub fn local_addr(&self) -> std::result::Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the single consumer
    pub fn accept(&self) -> std::result::Result<(TcpStream, SocketAddr), RelayError> {
        let deadline = Instant::now() + self.accept_timeout;
        loop {
            if self.run_state.is_stopped() {
                return Err(RelayError::Stopped);
            }
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    stream.set_nonblocking(false)?;
                    stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to disable Nagle for {}: {}", addr, e);
                    }
                    info!("Correction consumer connected: {}", addr);
                    return Ok((stream, addr));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(RelayError::Io(e)),
            }
            if Instant::now() >= deadline {
                warn!(
                    "No correction consumer within {} ms",
                    self.accept_timeout.as_millis()
                );
                return Err(RelayError::AcceptTimeout(self.accept_timeout));
            }
            thread::sleep(Duration::from_millis(ACCEPT_POLL_INTERVAL_MS));
        }
    }

    /// Run one session: accept, drop the backlog, forward until stop or disconnect.
    ///
    /// The queue is closed when the session ends, whatever the outcome, so a
    /// producer outliving the relay does not accumulate blocks.
    pub fn serve(self) -> std::result::Result<RelayStats, RelayError> {
        let result = self.session();
        let dropped = self.queue.close();
        if dropped > 0 {
            debug!("Dropped {} undelivered correction blocks", dropped);
        }
        result
    }

    fn session(&self) -> std::result::Result<RelayStats, RelayError> {
        let (mut stream, consumer) = self.accept()?;

        let discarded = self.queue.flush();
        if discarded > 0 {
            info!("Discarded {} stale correction blocks", discarded);
        }

        let mut stats = RelayStats {
            consumer,
            discarded,
            blocks_sent: 0,
            bytes_sent: 0,
        };
        let poll = Duration::from_millis(QUEUE_POLL_INTERVAL_MS);

        while !self.run_state.is_stopped() {
            let Some(block) = self.queue.pop_timeout(poll) else {
                continue;
            };
            match self.write_block(&mut stream, &block) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Stop requested with a partially written block");
                    break;
                }
                Err(e) => {
                    info!(
                        "Correction consumer {} disconnected after {} blocks",
                        consumer, stats.blocks_sent
                    );
                    return Err(RelayError::ConsumerDisconnected(e));
                }
            }
            stats.blocks_sent += 1;
            stats.bytes_sent += block.len() as u64;
            debug!("Relayed {} bytes to {}", block.len(), consumer);
        }

        info!(
            "Correction relay exiting ({} blocks, {} bytes sent)",
            stats.blocks_sent, stats.bytes_sent
        );
        Ok(stats)
    }

    /// Write one whole block, resuming after write timeouts until stop is requested.
    /// Returns false if stop interrupted the block.
    fn write_block(&self, stream: &mut TcpStream, block: &[u8]) -> io::Result<bool> {
        let mut remaining = block;
        while !remaining.is_empty() {
            match stream.write(remaining) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => remaining = &remaining[n..],
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    if self.run_state.is_stopped() {
                        return Ok(false);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Run [`serve`](Self::serve) on the `rtcm-relay` thread
    pub fn spawn(self) -> Result<JoinHandle<std::result::Result<RelayStats, RelayError>>> {
        let handle = thread::Builder::new()
            .name("rtcm-relay".to_string())
            .spawn(move || self.serve())?;
        Ok(handle)
    }
}
