//! Transport layer for I/O abstraction

use crate::error::Result;

pub mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::{
    discover_receiver_port, select_receiver_port, DeviceSelector, PortDescriptor,
    SerialTransport,
};

/// Byte-oriented duplex channel to the receiver
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Number of bytes ready to be read without blocking
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Write the whole buffer, retrying short writes
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(crate::error::Error::Transport(
                    "transport accepted zero bytes".to_string(),
                ));
            }
            data = &data[n..];
        }
        self.flush()
    }
}
