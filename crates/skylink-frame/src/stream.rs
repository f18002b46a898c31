//! Timeout control for byte streams that support it.

use std::io;
use std::time::Duration;

/// A byte stream whose blocking reads and writes can be bounded.
///
/// Connections rely on a read timeout so their reader loop notices a stop
/// request even when the link is quiet.
pub trait StreamTimeouts {
    /// Set read timeout on the underlying stream.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Set write timeout on the underlying stream.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl StreamTimeouts for std::net::TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::net::TcpStream::set_write_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl StreamTimeouts for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout)
    }
}

/// Returns true for the error kinds a timed-out blocking read produces.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
