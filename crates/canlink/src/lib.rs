//! Async rtnetlink library for configuring Linux CAN interfaces.
//!
//! This crate talks to the kernel over `NETLINK_ROUTE` to read and change
//! the bit timing, controller modes, restart policy and state of SocketCAN
//! network interfaces, the same settings `ip link set canX type can ...`
//! manages.
//!
//! # Features
//!
//! - `serde` - `Serialize` for the decoded link and CAN records
//! - `integration` - integration tests against a real `vcan` interface
//!
//! # Example
//!
//! ```ignore
//! use canlink::netlink::{CanInterface, Mtu};
//!
//! #[tokio::main]
//! async fn main() -> canlink::Result<()> {
//!     let can0 = CanInterface::open("can0")?;
//!
//!     can0.set_down().await?;
//!     can0.set_bitrate(500_000, None).await?;
//!     can0.set_mtu(Mtu::Standard).await?;
//!     can0.set_up().await?;
//!
//!     if let Some(counters) = can0.berr_counter().await? {
//!         println!("tx {} rx {}", counters.txerr, counters.rxerr);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod netlink;
pub mod util;

// Re-export common types at crate root for convenience
pub use netlink::{CanInterface, Connection, Error, Result};
