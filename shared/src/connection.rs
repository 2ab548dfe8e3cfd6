//! Blocking TCP transport with all-or-nothing send/receive semantics.
//!
//! Two capability types share one underlying socket representation:
//! [`Acceptor`] can bind, listen and accept; [`Connection`] can connect,
//! send and receive. Each value exclusively owns its OS handle. Neither
//! type is `Clone`, so a handle is never shared behind the caller's back.
//!
//! Disconnection is part of the normal protocol: an orderly peer close
//! surfaces as [`NetError::Disconnected`] from [`Connection::recv_exact`],
//! not as a generic I/O failure.

use crate::error::NetError;
use std::io::{self, Read, Write};
use std::mem;
use std::net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::time::Duration;

/// One established duplex byte-stream connection.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    connected: bool,
}

impl Connection {
    /// Establishes an outbound connection and disables Nagle coalescing;
    /// every frame the protocol sends is small and latency-sensitive.
    pub fn connect(host: &str, port: u16) -> Result<Self, NetError> {
        let ip = parse_ip(host).map_err(NetError::Connect)?;
        let stream =
            TcpStream::connect(SocketAddr::new(ip, port)).map_err(NetError::Connect)?;
        stream.set_nodelay(true).map_err(NetError::Connect)?;
        Ok(Self {
            stream,
            connected: true,
        })
    }

    fn from_accepted(stream: TcpStream) -> Result<Self, NetError> {
        stream.set_nodelay(true).map_err(NetError::Accept)?;
        Ok(Self {
            stream,
            connected: true,
        })
    }

    /// Blocks until the buffer is completely filled.
    ///
    /// An orderly close before any byte of a non-empty request yields
    /// [`NetError::Disconnected`] and marks the connection as dead.
    pub fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), NetError> {
        if buf.is_empty() {
            return Ok(());
        }
        match self.stream.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.connected = false;
                Err(NetError::Disconnected)
            }
            Err(e) => Err(NetError::Read(e)),
        }
    }

    /// Blocks until every byte has been handed to the kernel.
    pub fn send_all(&mut self, buf: &[u8]) -> Result<(), NetError> {
        self.stream.write_all(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                self.connected = false;
            }
            NetError::Write(e)
        })
    }

    /// Shuts the connection down. Safe to call more than once.
    pub fn close(&mut self) {
        if self.connected {
            let _ = self.stream.shutdown(Shutdown::Both);
            self.connected = false;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bounds blocking reads; `None` restores the default blocking-forever
    /// behavior. Only tests use this; the server never sets one.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), NetError> {
        self.stream.set_read_timeout(timeout).map_err(NetError::Read)
    }
}

impl AsRawFd for Connection {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// A listening socket: the server-side capability half.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Acceptor {
    /// Binds and listens on `host:port` with `SO_REUSEADDR` set.
    ///
    /// The socket is built through libc because the reuse flag must be set
    /// between `socket()` and `bind()`, which `std::net` cannot express.
    pub fn bind(host: &str, port: u16, backlog: i32) -> Result<Self, NetError> {
        let ip = parse_ip(host).map_err(NetError::Bind)?;
        let addr = SocketAddr::new(ip, port);

        let domain = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };
        let fd = unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) };
        if fd < 0 {
            return Err(NetError::Bind(io::Error::last_os_error()));
        }
        // Owned from here on so error paths close the fd.
        let listener = unsafe { TcpListener::from_raw_fd(fd) };

        let one: libc::c_int = 1;
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &one as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(NetError::Bind(io::Error::last_os_error()));
        }

        let (storage, len) = sockaddr_storage(addr);
        let rc = unsafe {
            libc::bind(fd, &storage as *const _ as *const libc::sockaddr, len)
        };
        if rc != 0 {
            return Err(NetError::Bind(io::Error::last_os_error()));
        }
        let rc = unsafe { libc::listen(fd, backlog) };
        if rc != 0 {
            return Err(NetError::Listen(io::Error::last_os_error()));
        }

        let local_addr = listener.local_addr().map_err(NetError::Bind)?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Blocks until an inbound connection arrives.
    pub fn accept(&self) -> Result<(Connection, SocketAddr), NetError> {
        let (stream, peer) = self.listener.accept().map_err(NetError::Accept)?;
        Ok((Connection::from_accepted(stream)?, peer))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl AsRawFd for Acceptor {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

fn parse_ip(host: &str) -> Result<IpAddr, io::Error> {
    host.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid IP address: {host}"),
        )
    })
}

fn sockaddr_storage(addr: SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr {
                    // Octets are already in network order in memory.
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                },
                sin_zero: [0; 8],
            };
            unsafe {
                std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in, sin);
            }
            (storage, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                },
                sin6_scope_id: v6.scope_id(),
            };
            unsafe {
                std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in6, sin6);
            }
            (storage, mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
        }
    }
}
