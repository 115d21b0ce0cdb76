//! # Transport Layer
//!
//! Blocking duplex byte streams and the [`Connection`](connection::Connection)
//! that owns one.
//!
//! ## Transports
//! - **TCP**: `std::net::TcpStream`, used by active connect and passive accept
//! - **Unix sockets**: `std::os::unix::net::UnixStream`, adoptable on Unix
//!
//! Any stream that can be cloned into independent read and write handles
//! can back a connection by implementing [`Transport`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

pub mod connection;

/// A connected, blocking, duplex byte stream
///
/// Handles produced by `try_clone` must refer to the same underlying socket,
/// so one can be read while another is written.
pub trait Transport: Read + Write + Send + Sync + Sized + 'static {
    /// Create another handle to the same socket
    fn try_clone(&self) -> io::Result<Self>;

    /// Shut down one or both directions of the socket
    fn shutdown(&self, how: Shutdown) -> io::Result<()>;

    /// Describe the remote end for logging
    fn peer_label(&self) -> String;

    /// Set TCP_NODELAY where the transport supports it
    fn set_nodelay(&self, _nodelay: bool) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        TcpStream::shutdown(self, how)
    }

    fn peer_label(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| String::from("unknown"))
    }

    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, nodelay)
    }
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn try_clone(&self) -> io::Result<Self> {
        std::os::unix::net::UnixStream::try_clone(self)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, how)
    }

    fn peer_label(&self) -> String {
        match self.peer_addr() {
            Ok(addr) => match addr.as_pathname() {
                Some(path) => path.display().to_string(),
                None => String::from("unix:unnamed"),
            },
            Err(_) => String::from("unknown"),
        }
    }
}
