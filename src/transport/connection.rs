//! # Connection
//!
//! An owned, blocking, duplex endpoint to a single peer.
//!
//! A [`Connection`] splits its transport into a buffered read half and a
//! write half, each behind its own lock, so one thread can read while another
//! writes. On top of the raw byte operations it exposes typed I/O through the
//! [`Archive`] trait: [`Connection::save`] and [`Connection::load`] for single
//! values, [`Connection::writer`] and [`Connection::reader`] for handles that
//! keep the lock across several values.
//!
//! ```rust,no_run
//! use peerlink::Connection;
//!
//! let conn = Connection::connect("127.0.0.1", 7400, "tracker")?;
//! let mut greeting = String::from("hello");
//! conn.save(&mut greeting)?;
//!
//! let mut peers: Vec<u32> = Vec::new();
//! conn.load(&mut peers)?;
//! # Ok::<(), peerlink::error::ProtocolError>(())
//! ```
//!
//! Every construction mode runs the endianness handshake before returning.
//! Any transport failure marks the connection disconnected; after that every
//! operation fails with [`ProtocolError::ConnectionClosed`] without touching
//! the socket.

use crate::config::ConnectionConfig;
use crate::core::archive::Archive;
use crate::core::kind::Archived;
use crate::core::primitive::Primitive;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::handshake::exchange_endianness;
use crate::transport::Transport;
use crate::utils::metrics::Metrics;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, trace, warn};

/// A connected peer with independent read and write locks
pub struct Connection<S: Transport = TcpStream> {
    name: String,
    peer: String,
    logging: AtomicBool,
    connected: AtomicBool,
    closed: AtomicBool,
    my_little_endian: bool,
    contact_little_endian: bool,
    protocol_version: u32,
    max_length: usize,
    staging_limit: usize,
    reader: Mutex<BufReader<S>>,
    writer: Mutex<S>,
    // Third handle so shutdown never waits on a lock held by a blocked reader
    control: S,
    metrics: Metrics,
}

impl Connection<TcpStream> {
    /// Connect to `host:port` with the default configuration
    ///
    /// # Errors
    /// See [`Connection::connect_with_config`]
    pub fn connect(host: &str, port: u16, name: &str) -> Result<Self> {
        Self::connect_with_config(host, port, name, &ConnectionConfig::default())
    }

    /// Resolve `host:port` and connect to the first address that answers
    ///
    /// Each resolved address gets `config.connect_timeout`.
    ///
    /// # Errors
    /// - `ProtocolError::ConfigError` if `config` is invalid
    /// - `ProtocolError::Io` if resolution fails or no address accepts the connection
    /// - any error of the endianness handshake
    #[instrument(skip(config))]
    pub fn connect_with_config(
        host: &str,
        port: u16,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        check_config(config)?;

        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => {
                    info!(%addr, "Connected");
                    return Self::establish(stream, name, config);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, constants::ERR_NO_ADDRESS)
        });
        warn!(error = %err, "Could not connect");
        Err(ProtocolError::Io(err))
    }

    /// Wait for one inbound connection on `listener` with the default configuration
    ///
    /// # Errors
    /// See [`Connection::accept_with_config`]
    pub fn accept(listener: &TcpListener, name: &str) -> Result<Self> {
        Self::accept_with_config(listener, name, &ConnectionConfig::default())
    }

    /// Block until `listener` yields a connection, then wrap it
    ///
    /// # Errors
    /// - `ProtocolError::ConfigError` if `config` is invalid
    /// - `ProtocolError::Io` if accepting fails
    /// - any error of the endianness handshake
    #[instrument(skip(listener, config))]
    pub fn accept_with_config(
        listener: &TcpListener,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        check_config(config)?;

        let (stream, addr) = listener.accept()?;
        info!(%addr, "Accepted connection");
        Self::establish(stream, name, config)
    }
}

impl<S: Transport> Connection<S> {
    /// Take ownership of an already-connected transport with the default configuration
    ///
    /// # Errors
    /// See [`Connection::adopt_with_config`]
    pub fn adopt(stream: S, name: &str) -> Result<Self> {
        Self::adopt_with_config(stream, name, &ConnectionConfig::default())
    }

    /// Take ownership of an already-connected transport
    ///
    /// # Errors
    /// - `ProtocolError::ConfigError` if `config` is invalid
    /// - `ProtocolError::Io` if the transport cannot be split
    /// - any error of the endianness handshake
    #[instrument(skip(stream, config))]
    pub fn adopt_with_config(stream: S, name: &str, config: &ConnectionConfig) -> Result<Self> {
        check_config(config)?;
        info!(peer = %stream.peer_label(), "Adopting transport");
        Self::establish(stream, name, config)
    }

    fn establish(mut stream: S, name: &str, config: &ConnectionConfig) -> Result<Self> {
        stream.set_nodelay(config.nodelay)?;
        let control = stream.try_clone()?;
        let mut read_half = BufReader::new(stream.try_clone()?);
        let peer = stream.peer_label();

        let agreement =
            exchange_endianness(&mut read_half, &mut stream, cfg!(target_endian = "little"))?;

        info!(
            name,
            peer = %peer,
            my_little_endian = agreement.my_little_endian,
            contact_little_endian = agreement.contact_little_endian,
            "Connection established"
        );

        Ok(Self {
            name: name.to_string(),
            peer,
            logging: AtomicBool::new(config.logging),
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            my_little_endian: agreement.my_little_endian,
            contact_little_endian: agreement.contact_little_endian,
            protocol_version: config.protocol_version,
            max_length: config.max_length,
            staging_limit: config.write_staging_limit,
            reader: Mutex::new(read_half),
            writer: Mutex::new(stream),
            control,
            metrics: Metrics::new(),
        })
    }

    /// Write all of `data` and flush it, returning the byte count
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the connection already failed
    /// - `ProtocolError::Io` on transport failure; the connection is marked disconnected
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.check_connected()?;
        let mut stream = self.lock_writer()?;

        if let Err(e) = stream.write_all(data).and_then(|()| stream.flush()) {
            return Err(self.fail(e));
        }

        self.metrics.bytes_written(data.len());
        if self.is_logging() {
            trace!(name = %self.name, bytes = data.len(), "write");
        }
        Ok(data.len())
    }

    /// Fill the whole of `buf`, blocking until enough bytes arrive
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the peer closes first or the connection already failed
    /// - `ProtocolError::Io` on transport failure
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_connected()?;
        let mut stream = self.lock_reader()?;

        if let Err(e) = stream.read_exact(buf) {
            return Err(self.fail(e));
        }

        self.metrics.read_completed(buf.len());
        if self.is_logging() {
            trace!(name = %self.name, bytes = buf.len(), "read");
        }
        Ok(buf.len())
    }

    /// Read up to and including the next `\n`, or until `buf` is full
    ///
    /// Returns the number of bytes stored in `buf`.
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the peer closes before the line ends
    /// - `ProtocolError::Io` on transport failure
    pub fn read_line(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_connected()?;
        let mut stream = self.lock_reader()?;

        let mut filled = 0;
        while filled < buf.len() {
            let available = match stream.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e)),
            };
            if available.is_empty() {
                return Err(self.fail(io::ErrorKind::UnexpectedEof.into()));
            }

            let window = &available[..available.len().min(buf.len() - filled)];
            let (take, line_done) = match window.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (window.len(), false),
            };
            buf[filled..filled + take].copy_from_slice(&window[..take]);
            stream.consume(take);
            filled += take;

            if line_done {
                break;
            }
        }

        self.metrics.line_read(filled);
        if self.is_logging() {
            trace!(name = %self.name, bytes = filled, "read_line");
        }
        Ok(filled)
    }

    /// Save one value and flush it
    ///
    /// A value that fails to archive sends nothing, unless part of it was
    /// already flushed at the staging limit; the connection is then marked
    /// disconnected since the peer holds a partial record.
    ///
    /// # Errors
    /// Any archive or transport error; see [`Connection::writer`]
    pub fn save<T: Archived>(&self, value: &mut T) -> Result<()> {
        let mut writer = self.writer()?;
        if let Err(e) = writer.save(value) {
            writer.discard();
            if writer.flushed > 0 {
                self.abandon_partial(writer.flushed);
            }
            return Err(e);
        }
        writer.flush()?;

        self.metrics.value_saved();
        if self.is_logging() {
            trace!(name = %self.name, kind = %T::KIND, "save");
        }
        Ok(())
    }

    /// Load one value in place
    ///
    /// # Errors
    /// Any archive or transport error; see [`Connection::reader`]
    pub fn load<T: Archived>(&self, value: &mut T) -> Result<()> {
        let mut reader = self.reader()?;
        reader.load(value)?;

        self.metrics.value_loaded();
        if self.is_logging() {
            trace!(name = %self.name, kind = %T::KIND, "load");
        }
        Ok(())
    }

    /// Lock the write half for a sequence of saves
    ///
    /// Nothing written through the handle interleaves with writes from other
    /// threads. Staged bytes are flushed on [`ConnectionWriter::flush`], when
    /// the staging limit is reached, and when the handle is dropped. Call
    /// [`ConnectionWriter::discard`] after a failed save to keep its staged
    /// prefix off the wire.
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the connection already failed
    /// - `ProtocolError::LockPoisoned` if a writer panicked while holding the lock
    pub fn writer(&self) -> Result<ConnectionWriter<'_, S>> {
        self.check_connected()?;
        let stream = self.lock_writer()?;
        Ok(ConnectionWriter {
            conn: self,
            stream,
            staging: BytesMut::with_capacity(self.staging_limit.min(4096)),
            flushed: 0,
        })
    }

    /// Lock the read half for a sequence of loads
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the connection already failed
    /// - `ProtocolError::LockPoisoned` if a reader panicked while holding the lock
    pub fn reader(&self) -> Result<ConnectionReader<'_, S>> {
        self.check_connected()?;
        let stream = self.lock_reader()?;
        Ok(ConnectionReader {
            conn: self,
            stream,
            scratch: Vec::new(),
        })
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the remote end
    pub fn peer_addr(&self) -> &str {
        &self.peer
    }

    /// Whether no transport failure has been observed and `close` was not called
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Whether per-operation trace events are emitted
    pub fn is_logging(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Turn per-operation trace events on or off
    pub fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Relaxed);
    }

    /// Byte order this side announced
    pub fn my_little_endian(&self) -> bool {
        self.my_little_endian
    }

    /// Byte order the peer announced
    pub fn contact_little_endian(&self) -> bool {
        self.contact_little_endian
    }

    /// Whether loaded multi-byte primitives are byte-swapped
    pub fn needs_swap(&self) -> bool {
        self.my_little_endian != self.contact_little_endian
    }

    /// Version handed to composite `serialize` calls
    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Traffic counters for this connection
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shut the transport down in both directions
    ///
    /// Threads blocked in `read` on either side are woken. Calling `close`
    /// more than once has no further effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.connected.store(false, Ordering::Release);

        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            // The peer may already have torn the socket down
            debug!(name = %self.name, error = %e, "Shutdown failed");
        }
        info!(name = %self.name, peer = %self.peer, "Connection closed");
        self.metrics.log_metrics(&self.name);
    }

    fn check_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ProtocolError::ConnectionClosed)
        }
    }

    /// Mark the connection failed after an incomplete record reached the peer
    fn abandon_partial(&self, sent: usize) {
        if self.connected.swap(false, Ordering::AcqRel) {
            warn!(name = %self.name, peer = %self.peer, sent, "Partial record sent");
        }
    }

    /// Mark the connection failed and translate the transport error
    fn fail(&self, err: io::Error) -> ProtocolError {
        self.metrics.io_error();
        if self.connected.swap(false, Ordering::AcqRel) {
            warn!(name = %self.name, peer = %self.peer, error = %err, "Connection lost");
        }

        match err.kind() {
            io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(err),
        }
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, S>> {
        self.writer
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_WRITE_LOCK))
    }

    fn lock_reader(&self) -> Result<MutexGuard<'_, BufReader<S>>> {
        self.reader
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_READ_LOCK))
    }
}

impl<S: Transport> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: Transport> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("peer", &self.peer)
            .field("connected", &self.is_connected())
            .field("my_little_endian", &self.my_little_endian)
            .field("contact_little_endian", &self.contact_little_endian)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}

fn check_config(config: &ConnectionConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::ConfigError(errors.join("; ")))
    }
}

/// Saving archive holding the write lock of a [`Connection`]
pub struct ConnectionWriter<'a, S: Transport> {
    conn: &'a Connection<S>,
    stream: MutexGuard<'a, S>,
    staging: BytesMut,
    flushed: usize,
}

impl<S: Transport> ConnectionWriter<'_, S> {
    /// Push staged bytes to the socket
    ///
    /// # Errors
    /// - `ProtocolError::ConnectionClosed` if the connection already failed
    /// - `ProtocolError::Io` on transport failure
    pub fn flush(&mut self) -> Result<()> {
        if self.staging.is_empty() {
            return Ok(());
        }
        self.conn.check_connected()?;

        let len = self.staging.len();
        let outcome = self
            .stream
            .write_all(&self.staging)
            .and_then(|()| self.stream.flush());
        self.staging.clear();

        match outcome {
            Ok(()) => {
                self.flushed += len;
                self.conn.metrics.bytes_written(len);
                if self.conn.is_logging() {
                    trace!(name = %self.conn.name, bytes = len, "flush");
                }
                Ok(())
            }
            Err(e) => Err(self.conn.fail(e)),
        }
    }

    /// Bytes staged but not yet flushed
    pub fn staged(&self) -> usize {
        self.staging.len()
    }

    /// Bytes this handle has pushed to the socket so far
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    /// Drop staged bytes without sending them
    pub fn discard(&mut self) {
        self.staging.clear();
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.staging.len() >= self.conn.staging_limit {
            self.flush()?;
        }
        Ok(())
    }
}

impl<S: Transport> Archive for ConnectionWriter<'_, S> {
    const LOADING: bool = false;

    fn version(&self) -> u32 {
        self.conn.protocol_version
    }

    fn max_length(&self) -> usize {
        u32::MAX as usize
    }

    fn primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()> {
        value.put(&mut self.staging);
        self.flush_if_full()
    }

    fn bytes(&mut self, data: &mut Vec<u8>, len: usize) -> Result<()> {
        debug_assert_eq!(data.len(), len);
        self.staging.put_slice(data);
        self.flush_if_full()
    }
}

impl<S: Transport> Drop for ConnectionWriter<'_, S> {
    fn drop(&mut self) {
        if self.staging.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(name = %self.conn.name, error = %e, "Dropping staged bytes");
        }
    }
}

impl<S: Transport> fmt::Debug for ConnectionWriter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWriter")
            .field("name", &self.conn.name)
            .field("staged", &self.staging.len())
            .field("flushed", &self.flushed)
            .finish()
    }
}

/// Loading archive holding the read lock of a [`Connection`]
pub struct ConnectionReader<'a, S: Transport> {
    conn: &'a Connection<S>,
    stream: MutexGuard<'a, BufReader<S>>,
    scratch: Vec<u8>,
}

impl<S: Transport> Archive for ConnectionReader<'_, S> {
    const LOADING: bool = true;

    fn version(&self) -> u32 {
        self.conn.protocol_version
    }

    fn max_length(&self) -> usize {
        self.conn.max_length
    }

    fn primitive<P: Primitive>(&mut self, value: &mut P) -> Result<()> {
        self.conn.check_connected()?;

        self.scratch.resize(P::SIZE, 0);
        if let Err(e) = self.stream.read_exact(&mut self.scratch) {
            return Err(self.conn.fail(e));
        }
        self.conn.metrics.bytes_loaded(P::SIZE);

        *value = P::get(&self.scratch, self.conn.needs_swap())?;
        Ok(())
    }

    fn bytes(&mut self, data: &mut Vec<u8>, len: usize) -> Result<()> {
        self.conn.check_connected()?;

        data.clear();
        let stream: &mut BufReader<S> = &mut self.stream;
        let read = match stream.take(len as u64).read_to_end(data) {
            Ok(read) => read,
            Err(e) => return Err(self.conn.fail(e)),
        };
        self.conn.metrics.bytes_loaded(read);

        if read < len {
            return Err(self.conn.fail(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(())
    }
}

impl<S: Transport> fmt::Debug for ConnectionReader<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionReader")
            .field("name", &self.conn.name)
            .field("needs_swap", &self.conn.needs_swap())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::kind::Serializable;
    use crate::protocol::handshake::{encode_marker, LITTLE_ENDIAN_MARKER};
    use crate::try_field;
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    /// Adopt one end of a socket pair, playing the peer's side of the handshake by hand
    fn adopted(peer_little_endian: bool) -> (Connection<UnixStream>, UnixStream) {
        adopted_with(peer_little_endian, &ConnectionConfig::default())
    }

    fn adopted_with(
        peer_little_endian: bool,
        config: &ConnectionConfig,
    ) -> (Connection<UnixStream>, UnixStream) {
        let (local, mut remote) = UnixStream::pair().unwrap();
        remote.write_all(&[encode_marker(peer_little_endian)]).unwrap();

        let conn = Connection::adopt_with_config(local, "unit", config).unwrap();

        let mut marker = [0u8; 1];
        remote.read_exact(&mut marker).unwrap();
        (conn, remote)
    }

    /// Archives a header, then trips over a field no archive can carry
    struct Stamped {
        header: Vec<u8>,
        taken_at: Instant,
    }

    impl Serializable for Stamped {
        fn serialize<A: Archive>(&mut self, ar: &mut A, _version: u32) -> Result<()> {
            ar.field(&mut self.header)?;
            try_field!(ar, &mut self.taken_at)
        }
    }

    #[test]
    fn test_adopt_records_both_byte_orders() {
        let (conn, _remote) = adopted(false);
        assert_eq!(conn.my_little_endian(), cfg!(target_endian = "little"));
        assert!(!conn.contact_little_endian());
        assert_eq!(conn.needs_swap(), cfg!(target_endian = "little"));
        assert!(conn.is_connected());
    }

    #[test]
    fn test_writer_stages_until_flush() {
        let (conn, mut remote) = adopted(cfg!(target_endian = "little"));

        let mut writer = conn.writer().unwrap();
        writer.save(&mut 0xAABBu16).unwrap();
        assert_eq!(writer.staged(), 2);
        writer.flush().unwrap();
        assert_eq!(writer.staged(), 0);
        drop(writer);

        let mut raw = [0u8; 2];
        remote.read_exact(&mut raw).unwrap();
        assert_eq!(raw, 0xAABBu16.to_ne_bytes());
    }

    #[test]
    fn test_writer_flushes_on_drop() {
        let (conn, mut remote) = adopted(cfg!(target_endian = "little"));

        {
            let mut writer = conn.writer().unwrap();
            writer.field(&mut 1u8).unwrap().field(&mut 2u8).unwrap();
        }

        let mut raw = [0u8; 2];
        remote.read_exact(&mut raw).unwrap();
        assert_eq!(raw, [1, 2]);
        assert_eq!(conn.metrics().snapshot().bytes_sent, 2);
    }

    #[test]
    fn test_close_is_idempotent_and_fails_fast() {
        let (conn, _remote) = adopted(true);
        conn.close();
        conn.close();

        assert!(!conn.is_connected());
        assert!(matches!(
            conn.write(b"x").unwrap_err(),
            ProtocolError::ConnectionClosed
        ));
        assert!(matches!(
            conn.writer().unwrap_err(),
            ProtocolError::ConnectionClosed
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_handshake() {
        let (local, _remote) = UnixStream::pair().unwrap();
        let config = ConnectionConfig {
            max_length: 0,
            ..ConnectionConfig::default()
        };
        let err = Connection::adopt_with_config(local, "bad", &config).unwrap_err();
        assert!(matches!(err, ProtocolError::ConfigError(_)));
    }

    #[test]
    fn test_logging_flag_toggles() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        remote.write_all(&[LITTLE_ENDIAN_MARKER]).unwrap();
        let config = ConnectionConfig {
            logging: true,
            ..ConnectionConfig::default()
        };
        let conn = Connection::adopt_with_config(local, "chatty", &config).unwrap();

        assert!(conn.is_logging());
        conn.set_logging(false);
        assert!(!conn.is_logging());
    }

    #[test]
    fn test_failed_save_sends_nothing() {
        let (conn, mut remote) = adopted(cfg!(target_endian = "little"));

        let mut stamped = Stamped {
            header: vec![0xAA, 0xBB, 0xCC, 0xDD],
            taken_at: Instant::now(),
        };
        let err = conn.save(&mut stamped).unwrap_err();
        assert!(matches!(err, ProtocolError::Classification { .. }));
        assert!(conn.is_connected());
        assert_eq!(conn.metrics().snapshot().bytes_sent, 0);

        // The next record is the first thing on the wire
        conn.save(&mut 7u8).unwrap();
        remote
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut raw = [0u8; 8];
        let read = remote.read(&mut raw).unwrap();
        assert_eq!(&raw[..read], &[7]);
    }

    #[test]
    fn test_failed_save_after_partial_flush_disconnects() {
        let config = ConnectionConfig {
            write_staging_limit: 64,
            ..ConnectionConfig::default()
        };
        let (conn, mut remote) = adopted_with(cfg!(target_endian = "little"), &config);

        let mut stamped = Stamped {
            header: vec![0x5A; 100],
            taken_at: Instant::now(),
        };
        let err = conn.save(&mut stamped).unwrap_err();
        assert!(matches!(err, ProtocolError::Classification { .. }));
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.save(&mut 1u8).unwrap_err(),
            ProtocolError::ConnectionClosed
        ));

        let mut prefix = [0u8; 64];
        remote.read_exact(&mut prefix).unwrap();
        assert_eq!(&prefix[..4], &100u32.to_ne_bytes());
    }

    #[test]
    fn test_discard_keeps_staged_bytes_off_the_wire() {
        let (conn, mut remote) = adopted(cfg!(target_endian = "little"));

        {
            let mut writer = conn.writer().unwrap();
            writer.save(&mut 0xDEAD_BEEFu32).unwrap();
            writer.discard();
            assert_eq!(writer.staged(), 0);
            writer.save(&mut 9u8).unwrap();
        }

        let mut raw = [0u8; 1];
        remote.read_exact(&mut raw).unwrap();
        assert_eq!(raw, [9]);
        assert_eq!(conn.metrics().snapshot().bytes_sent, 1);
    }
}
