//! Device nodes and files opened as connection streams.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::stream::StreamTimeouts;

/// A serial device node (or any file) usable as a connection stream.
///
/// `File` has no read timeout of its own, so reads and writes poll the
/// descriptor first when a timeout is set. A reader loop over a quiet tty
/// then returns `TimedOut` periodically and can observe a stop request.
///
/// On non-Unix targets timeouts are recorded but reads block.
#[derive(Debug)]
pub struct Device {
    file: File,
    // Nanoseconds; zero means no timeout.
    read_timeout: AtomicU64,
    write_timeout: AtomicU64,
}

#[derive(Clone, Copy)]
enum Readiness {
    Read,
    Write,
}

impl Device {
    /// Open `path` for reading and writing.
    pub fn open(path: &Path) -> io::Result<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(Self::from_file)
    }

    /// Open `path` for reading only.
    pub fn open_read_only(path: &Path) -> io::Result<Self> {
        File::open(path).map(Self::from_file)
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file,
            read_timeout: AtomicU64::new(0),
            write_timeout: AtomicU64::new(0),
        }
    }

    /// Another handle on the same device. Timeouts are not shared.
    pub fn try_clone(&self) -> io::Result<Self> {
        self.file.try_clone().map(Self::from_file)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        load_timeout(&self.read_timeout)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        load_timeout(&self.write_timeout)
    }
}

impl StreamTimeouts for Device {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        store_timeout(&self.read_timeout, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        store_timeout(&self.write_timeout, timeout)
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(timeout) = self.read_timeout() {
            wait_ready(&self.file, Readiness::Read, timeout)?;
        }
        self.file.read(buf)
    }
}

impl Write for Device {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(timeout) = self.write_timeout() {
            wait_ready(&self.file, Readiness::Write, timeout)?;
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn store_timeout(slot: &AtomicU64, timeout: Option<Duration>) -> io::Result<()> {
    let nanos = match timeout {
        None => 0,
        Some(timeout) if timeout.is_zero() => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot set a zero duration timeout",
            ));
        }
        Some(timeout) => u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX),
    };
    slot.store(nanos, Ordering::Relaxed);
    Ok(())
}

fn load_timeout(slot: &AtomicU64) -> Option<Duration> {
    match slot.load(Ordering::Relaxed) {
        0 => None,
        nanos => Some(Duration::from_nanos(nanos)),
    }
}

#[cfg(unix)]
fn wait_ready(file: &File, readiness: Readiness, timeout: Duration) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let events = match readiness {
        Readiness::Read => libc::POLLIN,
        Readiness::Write => libc::POLLOUT,
    };
    let mut pollfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis().max(1)).unwrap_or(libc::c_int::MAX);

    loop {
        // SAFETY: `pollfd` is a valid, initialized pollfd and the count is 1;
        // the descriptor stays open for the duration of the call.
        let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
        if rc > 0 {
            return Ok(());
        }
        if rc == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "device timed out"));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn wait_ready(_file: &File, _readiness: Readiness, _timeout: Duration) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn this_source() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("src/device.rs")
    }

    #[test]
    fn timeouts_round_trip() {
        let device = Device::open_read_only(&this_source()).unwrap();
        assert!(device.read_timeout().is_none());

        device
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        device
            .set_write_timeout(Some(Duration::from_millis(30)))
            .unwrap();
        assert_eq!(device.read_timeout(), Some(Duration::from_millis(20)));
        assert_eq!(device.write_timeout(), Some(Duration::from_millis(30)));

        device.set_read_timeout(None).unwrap();
        assert!(device.read_timeout().is_none());

        let err = device.set_read_timeout(Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn regular_file_reads_through_timeout() {
        let mut device = Device::open_read_only(&this_source()).unwrap();
        device
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"//");
    }

    #[test]
    #[cfg(unix)]
    fn quiet_stream_times_out_then_reads() {
        use std::os::fd::OwnedFd;
        use std::os::unix::net::UnixStream;

        let (near, mut far) = UnixStream::pair().unwrap();
        let mut device = Device::from_file(File::from(OwnedFd::from(near)));
        device
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 4];
        let err = device.read(&mut buf).unwrap_err();
        assert!(crate::stream::is_timeout(&err));

        far.write_all(&[0x7E, 0x01]).unwrap();
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x7E, 0x01]);
    }
}
