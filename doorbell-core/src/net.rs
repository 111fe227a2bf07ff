//! `std::net` implementations of the transport seams.
//!
//! Every socket runs non-blocking so a tick never waits on the network,
//! except for the bounded request-line read and linger of [`TcpConnection`].

use core::net::SocketAddrV4;
use core::time::Duration;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Instant;

use crate::hal::{DatagramSocket, RequestConnection, RequestServer};

fn not_bound() -> io::Error {
    io::Error::new(ErrorKind::NotConnected, "socket is not bound")
}

fn is_transient(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Non-blocking UDP socket bound to a fixed local endpoint.
#[derive(Debug)]
pub struct UdpTransport {
    local: SocketAddrV4,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn bind(local: SocketAddrV4) -> io::Result<Self> {
        let mut transport = Self {
            local,
            socket: None,
        };
        transport.open()?;
        Ok(transport)
    }

    #[must_use]
    pub const fn local(&self) -> SocketAddrV4 {
        self.local
    }

    /// Address the OS actually bound, which differs from `local` for port 0.
    pub fn bound_addr(&self) -> io::Result<SocketAddr> {
        self.socket.as_ref().ok_or_else(not_bound)?.local_addr()
    }

    fn open(&mut self) -> io::Result<()> {
        self.socket = None;
        let socket = UdpSocket::bind(self.local)?;
        socket.set_nonblocking(true)?;
        self.socket = Some(socket);
        Ok(())
    }
}

impl DatagramSocket for UdpTransport {
    type Error = io::Error;

    fn send_to(&mut self, payload: &[u8], peer: SocketAddrV4) -> io::Result<()> {
        let socket = self.socket.as_ref().ok_or_else(not_bound)?;
        socket.send_to(payload, peer).map(|_| ())
    }

    fn try_recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        let socket = self.socket.as_ref().ok_or_else(not_bound)?;
        match socket.recv_from(buffer) {
            Ok((len, _)) => Ok(Some(len)),
            Err(error) if error.kind() == ErrorKind::WouldBlock => Ok(None),
            // Windows reports an earlier unreachable peer on the next read.
            Err(error) if error.kind() == ErrorKind::ConnectionReset => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn rebind(&mut self) -> io::Result<()> {
        self.open()
    }
}

/// Non-blocking TCP listener serving one connection per poll.
#[derive(Debug)]
pub struct TcpRequestServer {
    local: SocketAddrV4,
    listener: Option<TcpListener>,
}

impl TcpRequestServer {
    pub fn bind(local: SocketAddrV4) -> io::Result<Self> {
        let mut server = Self {
            local,
            listener: None,
        };
        server.open()?;
        Ok(server)
    }

    #[must_use]
    pub const fn local(&self) -> SocketAddrV4 {
        self.local
    }

    /// Address the OS actually bound, which differs from `local` for port 0.
    pub fn bound_addr(&self) -> io::Result<SocketAddr> {
        self.listener.as_ref().ok_or_else(not_bound)?.local_addr()
    }

    fn open(&mut self) -> io::Result<()> {
        self.listener = None;
        let listener = TcpListener::bind(self.local)?;
        listener.set_nonblocking(true)?;
        self.listener = Some(listener);
        Ok(())
    }
}

impl RequestServer for TcpRequestServer {
    type Connection = TcpConnection;
    type Error = io::Error;

    fn try_accept(&mut self) -> io::Result<Option<TcpConnection>> {
        let listener = self.listener.as_ref().ok_or_else(not_bound)?;
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(TcpConnection { stream }))
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn rebind(&mut self) -> io::Result<()> {
        self.open()
    }
}

/// One accepted client of [`TcpRequestServer`].
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl RequestConnection for TcpConnection {
    type Error = io::Error;

    fn read_line(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut len = 0;
        let mut byte = [0_u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.stream.set_read_timeout(Some(remaining))?;

            match self.stream.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => {
                    if byte[0] != b'\r' && len < buffer.len() {
                        buffer[len] = byte[0];
                        len += 1;
                    }
                }
                Err(error) if is_transient(&error) => break,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }

        Ok(len)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    fn close(mut self, linger: Duration) {
        // Best effort: the response is already written.
        let _ = self.stream.flush();
        let _ = self.stream.shutdown(Shutdown::Write);
        if linger.is_zero() {
            return;
        }

        // Give the client up to `linger` to read the response and hang up.
        let deadline = Instant::now() + linger;
        let mut scratch = [0_u8; 64];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.stream.set_read_timeout(Some(remaining)).is_err() {
                break;
            }
            match self.stream.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}
