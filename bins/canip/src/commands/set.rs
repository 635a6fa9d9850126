//! canip set / up / down / restart implementation.

use anyhow::Context;
use canlink::netlink::types::can::{CanBitTiming, CanCtrlFlag};
use canlink::netlink::{CanLinkChanges, Mtu};
use canlink::util::{parse_bitrate, parse_sample_point};
use clap::{Args, ValueEnum};

use super::open;
use crate::Options;

#[derive(Args)]
pub struct DevArg {
    /// Interface name or index.
    dev: String,
}

/// Frame size selector for `--mtu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MtuArg {
    /// Classic CAN (16 bytes).
    Standard,
    /// CAN FD (72 bytes).
    Fd,
}

impl From<MtuArg> for Mtu {
    fn from(arg: MtuArg) -> Self {
        match arg {
            MtuArg::Standard => Mtu::Standard,
            MtuArg::Fd => Mtu::Fd,
        }
    }
}

#[derive(Args)]
pub struct SetCmd {
    /// Interface name or index.
    dev: String,

    /// Bring interface up.
    #[arg(long, conflicts_with = "down")]
    up: bool,

    /// Bring interface down.
    #[arg(long)]
    down: bool,

    /// Frame size.
    #[arg(long, value_enum)]
    mtu: Option<MtuArg>,

    /// Arbitration bitrate (e.g. 500000, 500k, 1M).
    #[arg(long, value_parser = parse_bitrate)]
    bitrate: Option<u32>,

    /// Arbitration sample point (e.g. 0.875).
    #[arg(long, value_parser = parse_sample_point, requires = "bitrate")]
    sample_point: Option<u32>,

    /// CAN FD data bitrate.
    #[arg(long, value_parser = parse_bitrate)]
    dbitrate: Option<u32>,

    /// CAN FD data sample point.
    #[arg(long, value_parser = parse_sample_point, requires = "dbitrate")]
    dsample_point: Option<u32>,

    /// Controller mode change, e.g. `fd=on` or `loopback=off` (repeatable).
    #[arg(
        long = "ctrl-mode",
        value_name = "MODE=on|off",
        value_parser = parse_ctrl_mode
    )]
    ctrl_modes: Vec<(CanCtrlFlag, bool)>,

    /// Automatic bus-off restart delay in ms (0 disables).
    #[arg(long)]
    restart_ms: Option<u32>,

    /// Bus termination in Ohms (0 disables).
    #[arg(long)]
    termination: Option<u16>,
}

impl SetCmd {
    pub async fn run(self, opts: &Options) -> anyhow::Result<()> {
        let can = open(&self.dev, opts)?;
        let changes = self.changes();

        if changes.is_empty() {
            anyhow::bail!("nothing to change on {}", self.dev);
        }

        can.apply(changes)
            .await
            .with_context(|| format!("cannot configure {}", self.dev))?;
        Ok(())
    }

    fn changes(&self) -> CanLinkChanges {
        let mut changes = CanLinkChanges::new();

        if self.up {
            changes = changes.up(true);
        } else if self.down {
            changes = changes.up(false);
        }
        if let Some(mtu) = self.mtu {
            changes = changes.mtu(Mtu::from(mtu).value());
        }
        if let Some(bitrate) = self.bitrate {
            changes = changes.bit_timing(timing(bitrate, self.sample_point));
        }
        if let Some(bitrate) = self.dbitrate {
            changes = changes.data_bit_timing(timing(bitrate, self.dsample_point));
        }
        for &(flag, on) in &self.ctrl_modes {
            changes = changes.ctrl_mode_flag(flag, on);
        }
        if let Some(ms) = self.restart_ms {
            changes = changes.restart_ms(ms);
        }
        if let Some(ohms) = self.termination {
            changes = changes.termination(ohms);
        }

        changes
    }
}

fn timing(bitrate: u32, sample_point: Option<u32>) -> CanBitTiming {
    let bt = CanBitTiming::from_bitrate(bitrate);
    match sample_point {
        Some(sp) => bt.with_sample_point(sp),
        None => bt,
    }
}

fn parse_ctrl_mode(s: &str) -> Result<(CanCtrlFlag, bool), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MODE=on|off, got {}", s))?;
    let flag: CanCtrlFlag = name.parse()?;
    let on = match value {
        "on" => true,
        "off" => false,
        other => return Err(format!("expected on or off, got {}", other)),
    };
    Ok((flag, on))
}

pub async fn up(dev: &DevArg, opts: &Options) -> anyhow::Result<()> {
    open(&dev.dev, opts)?
        .set_up()
        .await
        .with_context(|| format!("cannot bring {} up", dev.dev))
}

pub async fn down(dev: &DevArg, opts: &Options) -> anyhow::Result<()> {
    open(&dev.dev, opts)?
        .set_down()
        .await
        .with_context(|| format!("cannot bring {} down", dev.dev))
}

pub async fn restart(dev: &DevArg, opts: &Options) -> anyhow::Result<()> {
    open(&dev.dev, opts)?
        .restart()
        .await
        .with_context(|| format!("cannot restart {}", dev.dev))
}
