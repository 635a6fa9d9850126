//! Request/response exchange over a per-operation rtnetlink socket.
//!
//! A [`Connection`] holds only settings. Every operation opens its own
//! socket, performs exactly one request/reply exchange and closes the socket
//! when it returns, on success and error alike. Nothing is retried here.

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NLMSG_HDRLEN, NlMsgError, NlMsgHdr, NlMsgType, is_well_formed};
use super::nav::{LinkView, find_link};
use super::request::get_link_request;
use super::socket::{NetlinkSocket, SocketConfig};

/// Handle for issuing rtnetlink requests.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    config: SocketConfig,
}

impl Connection {
    /// Create a connection with default socket settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection with custom socket settings.
    pub fn with_config(config: SocketConfig) -> Self {
        Self { config }
    }

    /// Get the socket settings.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Send one request on a fresh socket and return the raw reply.
    pub async fn exchange(&self, mut builder: MessageBuilder) -> Result<Vec<u8>> {
        let socket = NetlinkSocket::new(self.config)?;
        let seq = socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(socket.pid());

        let msg = builder.finish();
        tracing::debug!(seq, len = msg.len(), "sending rtnetlink request");
        socket.send(&msg).await?;

        socket.recv_msg().await
    }

    /// Send a request that expects an ACK only (no data response).
    pub async fn request_ack(&self, builder: MessageBuilder) -> Result<()> {
        let reply = self.exchange(builder).await?;
        parse_ack(&reply)
    }

    /// Query one interface by index.
    ///
    /// Returns `Ok(None)` when the kernel reports no such device or the
    /// reply carries no link message for `index`.
    pub async fn get_link(&self, index: i32) -> Result<Option<LinkReply>> {
        let reply = self.exchange(get_link_request(index)).await?;
        check_link_reply(&reply)?;

        if find_link(&reply, index).is_none() {
            tracing::debug!(index, "no link message in reply");
            return Ok(None);
        }
        Ok(Some(LinkReply { buf: reply, index }))
    }
}

/// An owned `RTM_GETLINK` reply known to contain a link for its index.
#[derive(Debug, Clone)]
pub struct LinkReply {
    buf: Vec<u8>,
    index: i32,
}

impl LinkReply {
    /// Wrap a raw reply buffer; `None` if it has no link for `index`.
    pub fn new(buf: Vec<u8>, index: i32) -> Option<Self> {
        find_link(&buf, index)?;
        Some(Self { buf, index })
    }

    /// Interface index this reply was matched against.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the matched link message.
    pub fn link(&self) -> Option<LinkView<'_>> {
        find_link(&self.buf, self.index)
    }
}

/// Interpret the reply to a request sent with `NLM_F_ACK`.
///
/// The reply must be a single `NLMSG_ERROR` message large enough to carry an
/// error record. Status 0 is success; any other status becomes
/// [`Error::Kernel`] carrying the positive errno, whatever its sign. Any other
/// message type is a protocol violation.
pub fn parse_ack(buf: &[u8]) -> Result<()> {
    let header = NlMsgHdr::from_bytes(buf)?;
    if !is_well_formed(header, buf.len()) {
        return Err(Error::InvalidMessage(format!(
            "invalid message length: {} (have {} bytes)",
            header.nlmsg_len,
            buf.len()
        )));
    }

    let min_len = NLMSG_HDRLEN + NlMsgError::SIZE;
    if (header.nlmsg_len as usize) < min_len {
        return Err(Error::Truncated {
            expected: min_len,
            actual: header.nlmsg_len as usize,
        });
    }

    if !header.is_error() {
        return Err(Error::Protocol {
            expected: NlMsgType::ERROR,
            actual: header.nlmsg_type,
        });
    }

    let err = NlMsgError::from_bytes(&buf[NLMSG_HDRLEN..header.nlmsg_len as usize])?;
    tracing::debug!(status = err.error, "received ack");
    if err.is_ack() {
        Ok(())
    } else {
        Err(Error::from_errno(err.error))
    }
}

/// Surface kernel errors carried in a read reply.
///
/// ENODEV and ENOENT mean the interface is gone and are left for the caller
/// to report as "not found".
fn check_link_reply(buf: &[u8]) -> Result<()> {
    for (header, payload) in MessageIter::new(buf) {
        if !header.is_error() {
            continue;
        }
        let err = NlMsgError::from_bytes(payload)?;
        if err.is_ack() {
            continue;
        }
        let err = Error::from_errno(err.error);
        if err.is_not_found() {
            tracing::debug!("kernel reports no such interface");
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}
