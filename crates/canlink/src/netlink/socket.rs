//! Low-level async rtnetlink socket.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::{Error, Result};

/// Default receive timeout for a single exchange.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Default socket buffer size, large enough for a link dump with all CAN attributes.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Socket settings applied each time a channel is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// How long to wait for a reply before giving up.
    pub recv_timeout: Duration,
    /// Kernel send buffer size (SO_SNDBUF).
    pub send_buffer: usize,
    /// Kernel receive buffer size (SO_RCVBUF), also the user-space read size.
    pub recv_buffer: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            send_buffer: DEFAULT_BUFFER_SIZE,
            recv_buffer: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl SocketConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the receive timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the send buffer size.
    pub fn send_buffer(mut self, size: usize) -> Self {
        self.send_buffer = size;
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer(mut self, size: usize) -> Self {
        self.recv_buffer = size;
        self
    }
}

/// Async `NETLINK_ROUTE` socket bound to a kernel-assigned port, no groups.
///
/// The file descriptor is closed when the socket is dropped.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
    config: SocketConfig,
}

impl NetlinkSocket {
    /// Open a route socket with the given settings.
    pub fn new(config: SocketConfig) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        socket.set_non_blocking(true)?;

        set_send_buffer(socket.as_raw_fd(), buffer_size(config.send_buffer)?)?;
        socket.set_rx_buf_sz(buffer_size(config.recv_buffer)?)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK gives better error messages; older kernels lack it
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket)?;
        tracing::trace!(pid, "opened rtnetlink socket");

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
            config,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the settings this socket was opened with.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Send a message.
    pub async fn send(&self, msg: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    let sent = result?;
                    tracing::trace!(bytes = sent, "sent netlink message");
                    return Ok(sent);
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram, waiting at most the configured timeout.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let timeout = self.config.recv_timeout;
        tokio::time::timeout(timeout, self.recv_inner())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn recv_inner(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.config.recv_buffer);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            // MSG_TRUNC makes recv report the full datagram length
            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, libc::MSG_TRUNC)) {
                Ok(result) => {
                    let n = result?;
                    tracing::trace!(bytes = n, "received netlink message");
                    check_datagram_len(n, buf.len())?;
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

/// Fail if the kernel had more bytes for this datagram than were read.
fn check_datagram_len(datagram: usize, read: usize) -> Result<()> {
    if datagram > read {
        tracing::warn!(datagram, read, "netlink reply larger than receive buffer");
        return Err(Error::Truncated {
            expected: datagram,
            actual: read,
        });
    }
    Ok(())
}

fn buffer_size(size: usize) -> Result<libc::c_int> {
    libc::c_int::try_from(size)
        .map_err(|_| Error::InvalidMessage(format!("socket buffer too large: {}", size)))
}

fn set_send_buffer(fd: RawFd, value: libc::c_int) -> Result<()> {
    // SAFETY: fd is an open socket owned by the caller and value outlives the call.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
