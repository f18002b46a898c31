//! One reader thread per serial link, plus an owned registry of links.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::codec::{FrameConfig, DEFAULT_READ_TIMEOUT};
use crate::dispatch::{FrameListener, ListenerId, ListenerRegistry};
use crate::error::{FrameError, Result};
use crate::reader::FrameReader;
use crate::stream::{is_timeout, StreamTimeouts};
use crate::writer::FrameWriter;

/// Lifecycle of a connection's reader loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Reader loop is consuming bytes.
    Running,
    /// Stopped on request.
    Stopped,
    /// The stream reached EOF.
    Closed,
    /// An I/O failure ended the reader loop.
    Errored,
}

impl ConnectionStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Running,
            1 => Self::Stopped,
            2 => Self::Closed,
            _ => Self::Errored,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Stopped => 1,
            Self::Closed => 2,
            Self::Errored => 3,
        }
    }
}

struct Shared {
    running: AtomicBool,
    status: AtomicU8,
}

impl Shared {
    fn set_status(&self, status: ConnectionStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

type BoxedWriter = Box<dyn Write + Send>;

/// A live link: a dedicated reader thread feeding listeners, and a writer
/// serialized behind a mutex.
///
/// Stopping sets a liveness flag checked between reads. The blocking read
/// itself is not interruptible; [`Connection::spawn_timed`] applies
/// `FrameConfig::read_timeout` (or [`DEFAULT_READ_TIMEOUT`]) to the stream
/// so `stop()` returns promptly on a quiet link. Plain `spawn` leaves the
/// stream as given.
pub struct Connection {
    name: String,
    listeners: ListenerRegistry,
    writer: Mutex<FrameWriter<BoxedWriter>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start the reader loop for `reader`; frames go to this connection's
    /// listeners, `send` goes to `writer`.
    pub fn spawn<R, W>(
        name: impl Into<String>,
        reader: R,
        writer: W,
        config: FrameConfig,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::spawn_with(name, reader, writer, config, ListenerRegistry::new())
    }

    /// Like [`spawn`](Self::spawn), with listeners registered before the
    /// first byte is read.
    pub fn spawn_with<R, W>(
        name: impl Into<String>,
        reader: R,
        writer: W,
        config: FrameConfig,
        listeners: ListenerRegistry,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let name = name.into();
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            status: AtomicU8::new(ConnectionStatus::Running.as_u8()),
        });

        let frame_reader = FrameReader::with_config(reader, config.clone());
        let handle = {
            let listeners = listeners.clone();
            let shared = Arc::clone(&shared);
            let thread_name = name.clone();
            std::thread::Builder::new()
                .name(format!("skylink-rx-{name}"))
                .spawn(move || run_reader(&thread_name, frame_reader, &listeners, &shared))?
        };

        tracing::info!(connection = %name, "connection started");

        let writer: BoxedWriter = Box::new(writer);
        Ok(Self {
            name,
            listeners,
            writer: Mutex::new(FrameWriter::with_config(writer, config)),
            shared,
            handle: Some(handle),
        })
    }

    /// Like [`spawn_with`](Self::spawn_with), after setting the reader's
    /// timeout to `config.read_timeout`, or [`DEFAULT_READ_TIMEOUT`] when
    /// unset.
    pub fn spawn_timed<R, W>(
        name: impl Into<String>,
        reader: R,
        writer: W,
        config: FrameConfig,
        listeners: ListenerRegistry,
    ) -> Result<Self>
    where
        R: Read + StreamTimeouts + Send + 'static,
        W: Write + Send + 'static,
    {
        let timeout = config.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);
        reader.set_read_timeout(Some(timeout))?;
        Self::spawn_with(name, reader, writer, config, listeners)
    }

    /// Connection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current reader loop status.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.shared.status.load(Ordering::SeqCst))
    }

    /// Whether the reader loop is still consuming bytes.
    pub fn is_running(&self) -> bool {
        self.status() == ConnectionStatus::Running
    }

    /// Listener registry for frames received on this link.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Register a frame listener.
    pub fn subscribe(&self, listener: impl FrameListener + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Remove a frame listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Encode and transmit one frame. Concurrent callers are serialized.
    pub fn send(&self, address: u16, rtr: bool, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| FrameError::WriterPoisoned)?;
        writer.send(address, rtr, payload)
    }

    /// Ask the reader loop to stop without waiting for it.
    pub fn signal_stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    /// Stop the reader loop and wait for its thread to exit.
    pub fn stop(mut self) -> ConnectionStatus {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(connection = %self.name, "reader thread panicked");
                self.shared.set_status(ConnectionStatus::Errored);
            }
        }
        self.status()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn run_reader<R: Read>(
    name: &str,
    mut reader: FrameReader<R>,
    listeners: &ListenerRegistry,
    shared: &Shared,
) {
    while shared.running.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Ok(frame) => {
                tracing::trace!(
                    connection = name,
                    address = frame.address,
                    rtr = frame.rtr,
                    length = frame.length(),
                    "frame received"
                );
                listeners.dispatch(&frame);
            }
            Err(FrameError::Io(err)) if is_timeout(&err) => continue,
            Err(FrameError::ConnectionClosed) => {
                tracing::info!(connection = name, "stream closed");
                shared.set_status(ConnectionStatus::Closed);
                return;
            }
            Err(err) => {
                tracing::error!(connection = name, error = %err, "reader loop failed");
                shared.set_status(ConnectionStatus::Errored);
                return;
            }
        }
    }

    let stats = reader.stats();
    tracing::info!(
        connection = name,
        frames = stats.frames,
        checksum_failures = stats.checksum_failures,
        "connection stopped"
    );
    shared.set_status(ConnectionStatus::Stopped);
}

/// Owned set of named connections with explicit open/close.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn and register a connection under `name`.
    pub fn open<R, W>(
        &mut self,
        name: &str,
        reader: R,
        writer: W,
        config: FrameConfig,
    ) -> Result<&Connection>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        self.open_with(name, reader, writer, config, ListenerRegistry::new())
    }

    /// Spawn and register a connection whose listeners are already attached.
    pub fn open_with<R, W>(
        &mut self,
        name: &str,
        reader: R,
        writer: W,
        config: FrameConfig,
        listeners: ListenerRegistry,
    ) -> Result<&Connection>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        if self.connections.contains_key(name) {
            return Err(FrameError::ConnectionExists(name.to_string()));
        }
        let connection = Connection::spawn_with(name, reader, writer, config, listeners)?;
        Ok(self.connections.entry(name.to_string()).or_insert(connection))
    }

    /// Like [`open_with`](Self::open_with), through [`Connection::spawn_timed`].
    pub fn open_timed<R, W>(
        &mut self,
        name: &str,
        reader: R,
        writer: W,
        config: FrameConfig,
        listeners: ListenerRegistry,
    ) -> Result<&Connection>
    where
        R: Read + StreamTimeouts + Send + 'static,
        W: Write + Send + 'static,
    {
        if self.connections.contains_key(name) {
            return Err(FrameError::ConnectionExists(name.to_string()));
        }
        let connection = Connection::spawn_timed(name, reader, writer, config, listeners)?;
        Ok(self.connections.entry(name.to_string()).or_insert(connection))
    }

    /// Look up a connection.
    pub fn get(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    /// Registered connection names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.connections.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Stop and remove one connection, returning its final status.
    pub fn close(&mut self, name: &str) -> Option<ConnectionStatus> {
        self.connections.remove(name).map(Connection::stop)
    }

    /// Stop every connection.
    pub fn close_all(&mut self) -> Vec<(String, ConnectionStatus)> {
        let connections = std::mem::take(&mut self.connections);
        for connection in connections.values() {
            connection.signal_stop();
        }
        connections
            .into_iter()
            .map(|(name, connection)| (name, connection.stop()))
            .collect()
    }

    /// True when any registered connection has stopped reading.
    pub fn any_finished(&self) -> bool {
        self.connections.values().any(|c| !c.is_running())
    }

    /// True when no registered connection is still reading.
    pub fn all_finished(&self) -> bool {
        self.connections.values().all(|c| !c.is_running())
    }
}
