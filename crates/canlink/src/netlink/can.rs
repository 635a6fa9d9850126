//! CAN interface configuration and status.
//!
//! [`CanInterface`] wraps one interface index. Every method performs a single
//! rtnetlink exchange on its own socket:
//!
//! ```ignore
//! use canlink::netlink::can::{CanInterface, Mtu};
//!
//! let can0 = CanInterface::open("can0")?;
//! can0.set_down().await?;
//! can0.set_bitrate(500_000, Some(875)).await?;
//! can0.set_restart_ms(100).await?;
//! can0.set_up().await?;
//!
//! if let Some(state) = can0.state().await? {
//!     println!("can0 is {}", state.name());
//! }
//! ```

use super::attr::get;
use super::connection::{Connection, LinkReply};
use super::error::{Error, Result};
use super::nav::LinkView;
use super::request::{CanLinkChanges, set_link_request};
use super::socket::SocketConfig;
use super::types::Record;
use super::types::can::{
    CanBerrCounter, CanBitTiming, CanBitTimingConst, CanClock, CanCtrlFlag, CanCtrlMode,
    CanDeviceStats, CanState, IflaCan, decode_state, decode_u16, decode_u16_array, decode_u32,
    decode_u32_array,
};
use super::types::link::{IflaAttr, IflaInfo, LinkStats64, OperState, iff};
use crate::util::ifname;

/// MTU of a CAN interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Mtu {
    /// Classic CAN frames (`struct can_frame`, 16 bytes).
    Standard,
    /// CAN FD frames (`struct canfd_frame`, 72 bytes).
    Fd,
}

impl Mtu {
    /// MTU in bytes.
    pub fn value(self) -> u32 {
        match self {
            Self::Standard => 16,
            Self::Fd => 72,
        }
    }

    /// Map a raw MTU back to a CAN frame size.
    pub fn from_value(mtu: u32) -> Option<Self> {
        match mtu {
            16 => Some(Self::Standard),
            72 => Some(Self::Fd),
            _ => None,
        }
    }
}

/// Everything a single `RTM_GETLINK` reply reports about a CAN interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanDetails {
    pub name: Option<String>,
    pub index: i32,
    /// Interface flags (IFF_*).
    pub flags: u32,
    pub mtu: Option<u32>,
    pub operstate: Option<OperState>,
    /// Link kind from `IFLA_INFO_KIND` ("can", "vcan", ...).
    pub kind: Option<String>,
    pub state: Option<CanState>,
    pub bit_timing: Option<CanBitTiming>,
    pub bit_timing_const: Option<CanBitTimingConst>,
    pub data_bit_timing: Option<CanBitTiming>,
    pub data_bit_timing_const: Option<CanBitTimingConst>,
    pub clock: Option<CanClock>,
    pub ctrl_mode: Option<CanCtrlMode>,
    pub restart_ms: Option<u32>,
    pub berr_counter: Option<CanBerrCounter>,
    pub termination: Option<u16>,
    pub termination_const: Vec<u16>,
    pub bitrate_const: Vec<u32>,
    pub data_bitrate_const: Vec<u32>,
    pub bitrate_max: Option<u32>,
    pub device_stats: Option<CanDeviceStats>,
    pub stats64: Option<LinkStats64>,
}

impl CanDetails {
    /// Collect the details from a parsed link message.
    pub fn from_link(link: &LinkView<'_>) -> Self {
        let record = |kind: IflaCan| link.can_attr(kind);

        Self {
            name: link
                .link_attr(IflaAttr::Ifname)
                .and_then(|p| get::string(p).ok())
                .map(str::to_string),
            index: link.index(),
            flags: link.info().ifi_flags,
            mtu: link.link_attr(IflaAttr::Mtu).and_then(decode_u32),
            operstate: link
                .link_attr(IflaAttr::Operstate)
                .and_then(|p| get::u8(p).ok())
                .map(OperState::from),
            kind: link
                .info_attr(IflaInfo::Kind)
                .and_then(|p| get::string(p).ok())
                .map(str::to_string),
            state: record(IflaCan::State).and_then(decode_state),
            bit_timing: record(IflaCan::BitTiming).map(CanBitTiming::decode),
            bit_timing_const: record(IflaCan::BitTimingConst).map(CanBitTimingConst::decode),
            data_bit_timing: record(IflaCan::DataBitTiming).map(CanBitTiming::decode),
            data_bit_timing_const: record(IflaCan::DataBitTimingConst)
                .map(CanBitTimingConst::decode),
            clock: record(IflaCan::Clock).map(CanClock::decode),
            ctrl_mode: record(IflaCan::CtrlMode).map(CanCtrlMode::decode),
            restart_ms: record(IflaCan::RestartMs).and_then(decode_u32),
            berr_counter: record(IflaCan::BerrCounter).map(CanBerrCounter::decode),
            termination: record(IflaCan::Termination).and_then(decode_u16),
            termination_const: record(IflaCan::TerminationConst)
                .map(decode_u16_array)
                .unwrap_or_default(),
            bitrate_const: record(IflaCan::BitrateConst)
                .map(decode_u32_array)
                .unwrap_or_default(),
            data_bitrate_const: record(IflaCan::DataBitrateConst)
                .map(decode_u32_array)
                .unwrap_or_default(),
            bitrate_max: record(IflaCan::BitrateMax).and_then(decode_u32),
            device_stats: link.info_attr(IflaInfo::Xstats).map(CanDeviceStats::decode),
            stats64: link.link_attr(IflaAttr::Stats64).map(LinkStats64::decode),
        }
    }

    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.flags & iff::UP != 0
    }

    /// Arbitration phase bitrate.
    pub fn bitrate(&self) -> Option<u32> {
        self.bit_timing.map(|bt| bt.bitrate)
    }

    /// Data phase bitrate.
    pub fn data_bitrate(&self) -> Option<u32> {
        self.data_bit_timing.map(|bt| bt.bitrate)
    }

    /// Check if CAN FD mode is enabled.
    pub fn is_fd(&self) -> bool {
        self.ctrl_mode.is_some_and(|m| m.is_set(CanCtrlFlag::Fd))
    }
}

/// A CAN network interface addressed by index.
#[derive(Debug, Clone)]
pub struct CanInterface {
    index: i32,
    conn: Connection,
}

impl CanInterface {
    /// Open an interface by name with default socket settings.
    pub fn open(name: &str) -> Result<Self> {
        Self::open_with_config(name, SocketConfig::default())
    }

    /// Open an interface by name with custom socket settings.
    pub fn open_with_config(name: &str, config: SocketConfig) -> Result<Self> {
        let index = ifname::name_to_index(name).map_err(|e| match e {
            ifname::IfError::Io(err) => Error::Io(err),
            _ => Error::InterfaceNotFound {
                name: name.to_string(),
            },
        })?;
        let index = i32::try_from(index)
            .map_err(|_| Error::InvalidMessage(format!("ifindex out of range: {}", index)))?;
        let connection = Connection::with_config(config);
        Ok(Self::with_connection(index, connection))
    }

    /// Open an interface by index with default socket settings.
    pub fn open_index(index: i32) -> Self {
        Self::with_connection(index, Connection::new())
    }

    /// Use an existing connection for an interface index.
    pub fn with_connection(index: i32, conn: Connection) -> Self {
        Self { index, conn }
    }

    /// Interface index.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Connection settings used for every exchange.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn link(&self) -> Result<Option<LinkReply>> {
        self.conn
            .get_link(self.index)
            .await
            .map_err(|e| e.with_context("get CAN link"))
    }

    async fn read<T>(&self, f: impl FnOnce(&LinkView<'_>) -> Option<T>) -> Result<Option<T>> {
        let Some(reply) = self.link().await? else {
            tracing::debug!(index = self.index, "interface not present in reply");
            return Ok(None);
        };
        Ok(reply.link().as_ref().and_then(f))
    }

    async fn read_can<T>(
        &self,
        kind: IflaCan,
        decode: impl FnOnce(&[u8]) -> Option<T>,
    ) -> Result<Option<T>> {
        self.read(|link| link.can_attr(kind).and_then(decode)).await
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Read all link and CAN properties in one exchange.
    pub async fn details(&self) -> Result<Option<CanDetails>> {
        self.read(|link| Some(CanDetails::from_link(link))).await
    }

    /// Arbitration phase bit timing.
    pub async fn bit_timing(&self) -> Result<Option<CanBitTiming>> {
        self.read_can(IflaCan::BitTiming, |p| Some(CanBitTiming::decode(p)))
            .await
    }

    /// Arbitration phase bit timing limits of the controller.
    pub async fn bit_timing_const(&self) -> Result<Option<CanBitTimingConst>> {
        self.read_can(IflaCan::BitTimingConst, |p| {
            Some(CanBitTimingConst::decode(p))
        })
        .await
    }

    /// Arbitration phase bitrate in bits/second.
    pub async fn bitrate(&self) -> Result<Option<u32>> {
        Ok(self.bit_timing().await?.map(|bt| bt.bitrate))
    }

    /// Controller clock.
    pub async fn clock(&self) -> Result<Option<CanClock>> {
        self.read_can(IflaCan::Clock, |p| Some(CanClock::decode(p)))
            .await
    }

    /// Controller error state.
    pub async fn state(&self) -> Result<Option<CanState>> {
        self.read_can(IflaCan::State, decode_state).await
    }

    /// Supported (`mask`) and enabled (`flags`) controller modes.
    pub async fn ctrl_mode(&self) -> Result<Option<CanCtrlMode>> {
        self.read_can(IflaCan::CtrlMode, |p| Some(CanCtrlMode::decode(p)))
            .await
    }

    /// Automatic bus-off restart delay in milliseconds.
    pub async fn restart_ms(&self) -> Result<Option<u32>> {
        self.read_can(IflaCan::RestartMs, decode_u32).await
    }

    /// TX/RX error counters.
    pub async fn berr_counter(&self) -> Result<Option<CanBerrCounter>> {
        self.read_can(IflaCan::BerrCounter, |p| Some(CanBerrCounter::decode(p)))
            .await
    }

    /// CAN FD data phase bit timing.
    pub async fn data_bit_timing(&self) -> Result<Option<CanBitTiming>> {
        self.read_can(IflaCan::DataBitTiming, |p| Some(CanBitTiming::decode(p)))
            .await
    }

    /// CAN FD data phase bit timing limits.
    pub async fn data_bit_timing_const(&self) -> Result<Option<CanBitTimingConst>> {
        self.read_can(IflaCan::DataBitTimingConst, |p| {
            Some(CanBitTimingConst::decode(p))
        })
        .await
    }

    /// Bus termination in Ohms.
    pub async fn termination(&self) -> Result<Option<u16>> {
        self.read_can(IflaCan::Termination, decode_u16).await
    }

    /// Termination values the controller supports.
    pub async fn termination_const(&self) -> Result<Option<Vec<u16>>> {
        self.read_can(IflaCan::TerminationConst, |p| Some(decode_u16_array(p)))
            .await
    }

    /// CAN device statistics from the link's extended stats.
    pub async fn device_stats(&self) -> Result<Option<CanDeviceStats>> {
        self.read(|link| link.info_attr(IflaInfo::Xstats).map(CanDeviceStats::decode))
            .await
    }

    /// 64-bit interface statistics.
    pub async fn stats64(&self) -> Result<Option<LinkStats64>> {
        self.read(|link| link.link_attr(IflaAttr::Stats64).map(LinkStats64::decode))
            .await
    }

    /// Interface MTU.
    pub async fn mtu(&self) -> Result<Option<u32>> {
        self.read(|link| link.link_attr(IflaAttr::Mtu).and_then(decode_u32))
            .await
    }

    /// Operational state.
    pub async fn operstate(&self) -> Result<Option<OperState>> {
        self.read(|link| {
            link.link_attr(IflaAttr::Operstate)
                .and_then(|p| get::u8(p).ok())
                .map(OperState::from)
        })
        .await
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Apply a set of changes in one request.
    ///
    /// An empty change set sends nothing.
    pub async fn apply(&self, changes: CanLinkChanges) -> Result<()> {
        if changes.is_empty() {
            tracing::debug!(index = self.index, "no CAN link changes to apply");
            return Ok(());
        }
        tracing::debug!(index = self.index, ?changes, "applying CAN link changes");
        self.conn
            .request_ack(set_link_request(self.index, &changes))
            .await
            .map_err(|e| e.with_context("set CAN link"))
    }

    /// Bring the interface up.
    pub async fn set_up(&self) -> Result<()> {
        self.apply(CanLinkChanges::new().up(true)).await
    }

    /// Bring the interface down.
    pub async fn set_down(&self) -> Result<()> {
        self.apply(CanLinkChanges::new().up(false)).await
    }

    /// Switch between classic CAN and CAN FD frame sizes.
    pub async fn set_mtu(&self, mtu: Mtu) -> Result<()> {
        self.apply(CanLinkChanges::new().mtu(mtu.value())).await
    }

    /// Set the arbitration bitrate, optionally with a sample point in
    /// tenths of a percent.
    pub async fn set_bitrate(&self, bitrate: u32, sample_point: Option<u32>) -> Result<()> {
        self.set_bit_timing(timing_for(bitrate, sample_point)).await
    }

    /// Set the full arbitration phase bit timing.
    pub async fn set_bit_timing(&self, timing: CanBitTiming) -> Result<()> {
        self.apply(CanLinkChanges::new().bit_timing(timing)).await
    }

    /// Set the CAN FD data phase bitrate.
    pub async fn set_data_bitrate(&self, bitrate: u32, sample_point: Option<u32>) -> Result<()> {
        self.set_data_bit_timing(timing_for(bitrate, sample_point))
            .await
    }

    /// Set the full CAN FD data phase bit timing.
    pub async fn set_data_bit_timing(&self, timing: CanBitTiming) -> Result<()> {
        self.apply(CanLinkChanges::new().data_bit_timing(timing))
            .await
    }

    /// Update several controller modes at once.
    pub async fn set_ctrl_modes(&self, mode: CanCtrlMode) -> Result<()> {
        self.apply(CanLinkChanges::new().ctrl_mode(mode)).await
    }

    /// Turn one controller mode on or off.
    pub async fn set_ctrl_mode(&self, flag: CanCtrlFlag, on: bool) -> Result<()> {
        self.set_ctrl_modes(CanCtrlMode::from_flag(flag, on)).await
    }

    /// Set the automatic bus-off restart delay; 0 disables it.
    pub async fn set_restart_ms(&self, ms: u32) -> Result<()> {
        self.apply(CanLinkChanges::new().restart_ms(ms)).await
    }

    /// Restart a controller that is in BUS-OFF.
    ///
    /// The kernel rejects this with EINVAL unless the interface is up and
    /// bus-off, and with EBUSY when automatic restart is enabled.
    pub async fn restart(&self) -> Result<()> {
        self.apply(CanLinkChanges::new().restart()).await
    }

    /// Set the bus termination resistance in Ohms (0 disables).
    pub async fn set_termination(&self, ohms: u16) -> Result<()> {
        self.apply(CanLinkChanges::new().termination(ohms)).await
    }
}

fn timing_for(bitrate: u32, sample_point: Option<u32>) -> CanBitTiming {
    let timing = CanBitTiming::from_bitrate(bitrate);
    match sample_point {
        Some(sp) => timing.with_sample_point(sp),
        None => timing,
    }
}
