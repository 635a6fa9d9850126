//! SocketCAN netlink types (linux/can/netlink.h).
//!
//! All records are host-endian and laid out exactly as the kernel ABI
//! defines them. They are decoded through [`Record`], which zero-extends
//! payloads from kernels that predate a trailing field.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::Record;

/// CAN-specific attributes nested in `IFLA_INFO_DATA` (IFLA_CAN_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IflaCan {
    Unspec = 0,
    BitTiming = 1,
    BitTimingConst = 2,
    Clock = 3,
    State = 4,
    CtrlMode = 5,
    RestartMs = 6,
    Restart = 7,
    BerrCounter = 8,
    DataBitTiming = 9,
    DataBitTimingConst = 10,
    Termination = 11,
    TerminationConst = 12,
    BitrateConst = 13,
    DataBitrateConst = 14,
    BitrateMax = 15,
}

impl From<u16> for IflaCan {
    fn from(val: u16) -> Self {
        match val {
            1 => Self::BitTiming,
            2 => Self::BitTimingConst,
            3 => Self::Clock,
            4 => Self::State,
            5 => Self::CtrlMode,
            6 => Self::RestartMs,
            7 => Self::Restart,
            8 => Self::BerrCounter,
            9 => Self::DataBitTiming,
            10 => Self::DataBitTimingConst,
            11 => Self::Termination,
            12 => Self::TerminationConst,
            13 => Self::BitrateConst,
            14 => Self::DataBitrateConst,
            15 => Self::BitrateMax,
            _ => Self::Unspec,
        }
    }
}

/// CAN bit-timing parameters (struct can_bittiming).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanBitTiming {
    /// Bit-rate in bits/second.
    pub bitrate: u32,
    /// Sample point in one-tenth of a percent.
    pub sample_point: u32,
    /// Time quanta (TQ) in nanoseconds.
    pub tq: u32,
    /// Propagation segment in TQs.
    pub prop_seg: u32,
    /// Phase buffer segment 1 in TQs.
    pub phase_seg1: u32,
    /// Phase buffer segment 2 in TQs.
    pub phase_seg2: u32,
    /// Synchronisation jump width in TQs.
    pub sjw: u32,
    /// Bit-rate prescaler.
    pub brp: u32,
}

impl CanBitTiming {
    /// Timing with only a bitrate; the kernel computes the rest.
    pub fn from_bitrate(bitrate: u32) -> Self {
        Self {
            bitrate,
            ..Self::default()
        }
    }

    /// Timing with a bitrate and sample point (tenths of a percent, e.g. 875).
    pub fn with_sample_point(mut self, sample_point: u32) -> Self {
        self.sample_point = sample_point;
        self
    }
}

impl Record for CanBitTiming {}

/// Hardware bit-timing limits (struct can_bittiming_const).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanBitTimingConst {
    /// Controller name, NUL padded.
    pub name: [u8; 16],
    pub tseg1_min: u32,
    pub tseg1_max: u32,
    pub tseg2_min: u32,
    pub tseg2_max: u32,
    pub sjw_max: u32,
    pub brp_min: u32,
    pub brp_max: u32,
    pub brp_inc: u32,
}

impl CanBitTimingConst {
    /// Controller name up to the first NUL.
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }
}

impl Record for CanBitTimingConst {}

/// CAN system clock (struct can_clock).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanClock {
    /// Clock frequency in Hz.
    pub freq: u32,
}

impl Record for CanClock {}

/// Bus error counters (struct can_berr_counter).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanBerrCounter {
    pub txerr: u16,
    pub rxerr: u16,
}

impl Record for CanBerrCounter {}

/// Controller mode (struct can_ctrlmode).
///
/// Only the bits set in `mask` are changed by a write; `flags` carries their
/// new values. On read, `mask` holds the modes the controller supports.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanCtrlMode {
    pub mask: u32,
    pub flags: u32,
}

impl CanCtrlMode {
    /// Create a mode update from a mask and flags.
    pub fn new(mask: u32, flags: u32) -> Self {
        Self { mask, flags }
    }

    /// Change a single mode.
    pub fn from_flag(flag: CanCtrlFlag, on: bool) -> Self {
        let mut mode = Self::default();
        mode.set(flag, on);
        mode
    }

    /// Add a mode to the update.
    pub fn set(&mut self, flag: CanCtrlFlag, on: bool) -> &mut Self {
        let bit = flag.bit();
        self.mask |= bit;
        if on {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
        self
    }

    /// Check whether a mode is enabled in `flags`.
    pub fn is_set(&self, flag: CanCtrlFlag) -> bool {
        self.flags & flag.bit() != 0
    }

    /// Enabled modes, in bit order.
    pub fn enabled(&self) -> Vec<CanCtrlFlag> {
        CanCtrlFlag::ALL
            .iter()
            .copied()
            .filter(|f| self.is_set(*f))
            .collect()
    }
}

impl Record for CanCtrlMode {}

/// CAN device statistics from `IFLA_INFO_XSTATS` (struct can_device_stats).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CanDeviceStats {
    /// Bus errors.
    pub bus_error: u32,
    /// Changes to error warning state.
    pub error_warning: u32,
    /// Changes to error passive state.
    pub error_passive: u32,
    /// Changes to bus off state.
    pub bus_off: u32,
    /// Arbitration lost errors.
    pub arbitration_lost: u32,
    /// Controller restarts.
    pub restarts: u32,
}

impl Record for CanDeviceStats {}

/// Controller mode bits (CAN_CTRLMODE_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum CanCtrlFlag {
    Loopback = 0x01,
    ListenOnly = 0x02,
    TripleSampling = 0x04,
    OneShot = 0x08,
    BerrReporting = 0x10,
    Fd = 0x20,
    PresumeAck = 0x40,
    FdNonIso = 0x80,
    CcLen8Dlc = 0x100,
    TdcAuto = 0x200,
    TdcManual = 0x400,
}

impl CanCtrlFlag {
    /// Every known mode, in bit order.
    pub const ALL: [CanCtrlFlag; 11] = [
        Self::Loopback,
        Self::ListenOnly,
        Self::TripleSampling,
        Self::OneShot,
        Self::BerrReporting,
        Self::Fd,
        Self::PresumeAck,
        Self::FdNonIso,
        Self::CcLen8Dlc,
        Self::TdcAuto,
        Self::TdcManual,
    ];

    /// Get the bit value.
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Name as printed by `ip -details link`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Loopback => "LOOPBACK",
            Self::ListenOnly => "LISTEN-ONLY",
            Self::TripleSampling => "TRIPLE-SAMPLING",
            Self::OneShot => "ONE-SHOT",
            Self::BerrReporting => "BERR-REPORTING",
            Self::Fd => "FD",
            Self::PresumeAck => "PRESUME-ACK",
            Self::FdNonIso => "FD-NON-ISO",
            Self::CcLen8Dlc => "CC-LEN8-DLC",
            Self::TdcAuto => "TDC-AUTO",
            Self::TdcManual => "TDC-MANUAL",
        }
    }
}

impl std::str::FromStr for CanCtrlFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_uppercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| format!("unknown controller mode: {}", s))
    }
}

/// CAN controller state (enum can_state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum CanState {
    /// RX/TX error count < 96
    ErrorActive = 0,
    /// RX/TX error count < 128
    ErrorWarning = 1,
    /// RX/TX error count < 256
    ErrorPassive = 2,
    /// RX/TX error count >= 256
    BusOff = 3,
    /// Device is stopped
    Stopped = 4,
    /// Device is sleeping
    Sleeping = 5,
}

impl TryFrom<u32> for CanState {
    type Error = u32;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(Self::ErrorActive),
            1 => Ok(Self::ErrorWarning),
            2 => Ok(Self::ErrorPassive),
            3 => Ok(Self::BusOff),
            4 => Ok(Self::Stopped),
            5 => Ok(Self::Sleeping),
            other => Err(other),
        }
    }
}

impl CanState {
    /// State name as printed by `ip -details link`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ErrorActive => "ERROR-ACTIVE",
            Self::ErrorWarning => "ERROR-WARNING",
            Self::ErrorPassive => "ERROR-PASSIVE",
            Self::BusOff => "BUS-OFF",
            Self::Stopped => "STOPPED",
            Self::Sleeping => "SLEEPING",
        }
    }
}

/// Termination value meaning "disabled".
pub const CAN_TERMINATION_DISABLED: u16 = 0;

/// Decode a u32 scalar, treating a short payload as absent.
pub fn decode_u32(payload: &[u8]) -> Option<u32> {
    let bytes = payload.get(..4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decode a u16 scalar, treating a short payload as absent.
pub fn decode_u16(payload: &[u8]) -> Option<u16> {
    let bytes = payload.get(..2)?;
    Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
}

/// Decode the `IFLA_CAN_STATE` payload.
pub fn decode_state(payload: &[u8]) -> Option<CanState> {
    decode_u32(payload).and_then(|v| CanState::try_from(v).ok())
}

/// Decode an array of u16 values (e.g. `IFLA_CAN_TERMINATION_CONST`).
pub fn decode_u16_array(payload: &[u8]) -> Vec<u16> {
    payload
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect()
}

/// Decode an array of u32 values (e.g. `IFLA_CAN_BITRATE_CONST`).
pub fn decode_u32_array(payload: &[u8]) -> Vec<u32> {
    payload
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
