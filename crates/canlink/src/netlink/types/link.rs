//! Link (interface) message types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfInfoMsg {
    /// Address family (AF_UNSPEC for link requests).
    pub ifi_family: u8,
    /// Padding.
    pub ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Change mask: which bits of `ifi_flags` this message alters.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Size of the wire structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new, zeroed interface info message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface index.
    pub fn with_index(mut self, index: i32) -> Self {
        self.ifi_index = index;
        self
    }

    /// Request a masked update of `flag`: only that bit is changed.
    pub fn with_flag(mut self, flag: u32, on: bool) -> Self {
        self.ifi_change |= flag;
        if on {
            self.ifi_flags |= flag;
        } else {
            self.ifi_flags &= !flag;
        }
        self
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Read from the start of a buffer.
    pub fn from_bytes(data: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(data).ok().map(|(r, _)| r)
    }
}

/// Interface flags (IFF_*).
pub mod iff {
    pub const UP: u32 = 0x1;
    pub const BROADCAST: u32 = 0x2;
    pub const LOOPBACK: u32 = 0x8;
    pub const POINTOPOINT: u32 = 0x10;
    pub const RUNNING: u32 = 0x40;
    pub const NOARP: u32 = 0x80;
    pub const LOWER_UP: u32 = 0x10000;
    pub const DORMANT: u32 = 0x20000;
    pub const ECHO: u32 = 0x40000;
}

/// ARPHRD_CAN device type.
pub const ARPHRD_CAN: u16 = 280;

/// Top-level link attributes (IFLA_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IflaAttr {
    Unspec = 0,
    Address = 1,
    Broadcast = 2,
    Ifname = 3,
    Mtu = 4,
    Link = 5,
    Qdisc = 6,
    Stats = 7,
    Txqlen = 13,
    Operstate = 16,
    Linkmode = 17,
    Linkinfo = 18,
    Stats64 = 23,
    Group = 27,
    Carrier = 33,
    MinMtu = 50,
    MaxMtu = 51,
}

/// Nested link-info attributes (IFLA_INFO_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IflaInfo {
    Unspec = 0,
    Kind = 1,
    Data = 2,
    Xstats = 3,
    SlaveKind = 4,
    SlaveData = 5,
}

/// Operational state (RFC 2863).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum OperState {
    Unknown = 0,
    NotPresent = 1,
    Down = 2,
    LowerLayerDown = 3,
    Testing = 4,
    Dormant = 5,
    Up = 6,
}

impl From<u8> for OperState {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::NotPresent,
            2 => Self::Down,
            3 => Self::LowerLayerDown,
            4 => Self::Testing,
            5 => Self::Dormant,
            6 => Self::Up,
            _ => Self::Unknown,
        }
    }
}

impl OperState {
    /// Get the state name as shown by `ip link`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::NotPresent => "NOTPRESENT",
            Self::Down => "DOWN",
            Self::LowerLayerDown => "LOWERLAYERDOWN",
            Self::Testing => "TESTING",
            Self::Dormant => "DORMANT",
            Self::Up => "UP",
        }
    }
}

/// 64-bit link statistics (struct rtnl_link_stats64).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinkStats64 {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub multicast: u64,
    pub collisions: u64,
    pub rx_length_errors: u64,
    pub rx_over_errors: u64,
    pub rx_crc_errors: u64,
    pub rx_frame_errors: u64,
    pub rx_fifo_errors: u64,
    pub rx_missed_errors: u64,
    pub tx_aborted_errors: u64,
    pub tx_carrier_errors: u64,
    pub tx_fifo_errors: u64,
    pub tx_heartbeat_errors: u64,
    pub tx_window_errors: u64,
    pub rx_compressed: u64,
    pub tx_compressed: u64,
    pub rx_nohandler: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifinfomsg_layout() {
        assert_eq!(IfInfoMsg::SIZE, 16);
        let msg = IfInfoMsg::new().with_index(3);
        let bytes = msg.as_bytes();
        assert_eq!(&bytes[4..8], &3i32.to_ne_bytes());
        assert_eq!(IfInfoMsg::from_bytes(bytes), Some(&msg));
        assert!(IfInfoMsg::from_bytes(&bytes[..12]).is_none());
    }

    #[test]
    fn test_masked_flag_update() {
        let up = IfInfoMsg::new().with_flag(iff::UP, true);
        assert_eq!(up.ifi_change, iff::UP);
        assert_eq!(up.ifi_flags, iff::UP);

        let down = IfInfoMsg::new().with_flag(iff::UP, false);
        assert_eq!(down.ifi_change, iff::UP);
        assert_eq!(down.ifi_flags, 0);
    }

    #[test]
    fn test_operstate() {
        assert_eq!(OperState::from(6), OperState::Up);
        assert_eq!(OperState::from(42), OperState::Unknown);
        assert_eq!(OperState::Down.name(), "DOWN");
    }

    #[test]
    fn test_stats64_size() {
        assert_eq!(std::mem::size_of::<LinkStats64>(), 24 * 8);
    }
}
