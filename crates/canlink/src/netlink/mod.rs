//! rtnetlink codec and client for CAN interfaces.
//!
//! The layers build on each other:
//!
//! - [`message`] and [`attr`]: alignment arithmetic, message and attribute
//!   headers, and a lenient flat attribute parser.
//! - [`builder`]: assembles outgoing messages with nested attributes.
//! - [`types`]: fixed-layout kernel records (`ifinfomsg`, `can_bittiming`, ...).
//! - [`nav`]: finds a link in a reply and walks
//!   `IFLA_LINKINFO` -> `IFLA_INFO_DATA` -> `IFLA_CAN_*`.
//! - [`request`]: `RTM_GETLINK` / `RTM_NEWLINK` request builders.
//! - [`connection`] and [`socket`]: one request/reply exchange per operation.
//! - [`can`]: the typed [`CanInterface`] API.
//!
//! # Quick Start
//!
//! ```ignore
//! use canlink::netlink::CanInterface;
//!
//! let can0 = CanInterface::open("can0")?;
//! if let Some(details) = can0.details().await? {
//!     println!("{:?} bitrate {:?}", details.state, details.bitrate());
//! }
//! ```

pub mod attr;
pub mod builder;
pub mod can;
pub mod connection;
mod error;
pub mod message;
pub mod nav;
pub mod request;
pub mod socket;
pub mod types;

pub use attr::{Attr, AttrIter, NlAttr, find_attr, parse_attrs};
pub use builder::{MessageBuilder, NestToken};
pub use can::{CanDetails, CanInterface, Mtu};
pub use connection::{Connection, LinkReply, parse_ack};
pub use error::{Error, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use nav::{LinkView, find_can_attr, find_link, find_link_attr};
pub use request::{CanLinkChanges, get_link_request, set_link_request};
pub use socket::{NetlinkSocket, SocketConfig};
