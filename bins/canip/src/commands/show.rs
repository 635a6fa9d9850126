//! canip show / list implementation.

use std::io::{self, Write};

use anyhow::Context;
use canlink::netlink::CanDetails;
use canlink::netlink::types::can::CanBitTimingConst;
use canlink::util::list_can_interfaces;
use clap::Args;

use super::open;
use crate::{Options, OutputFormat};

#[derive(Args)]
pub struct ShowCmd {
    /// Interface name or index (all CAN interfaces if omitted).
    dev: Option<String>,
}

impl ShowCmd {
    pub async fn run(self, opts: &Options) -> anyhow::Result<()> {
        let names = match self.dev {
            Some(dev) => vec![dev],
            None => list_can_interfaces().context("cannot list interfaces")?,
        };

        let mut links = Vec::with_capacity(names.len());
        for name in &names {
            let can = open(name, opts)?;
            match can.details().await? {
                Some(details) => links.push(details),
                None => tracing::warn!(dev = %name, "interface disappeared"),
            }
        }

        let mut stdout = io::stdout().lock();
        match opts.format {
            OutputFormat::Text => {
                for details in &links {
                    print_details(&mut stdout, details, opts.stats)?;
                }
            }
            OutputFormat::Json => {
                if opts.pretty {
                    serde_json::to_writer_pretty(&mut stdout, &links)?;
                } else {
                    serde_json::to_writer(&mut stdout, &links)?;
                }
                writeln!(stdout)?;
            }
        }

        Ok(())
    }
}

/// Print CAN interface names, one per line.
pub fn list(opts: &Options) -> anyhow::Result<()> {
    let names = list_can_interfaces().context("cannot list interfaces")?;
    let mut stdout = io::stdout().lock();

    match opts.format {
        OutputFormat::Text => {
            for name in &names {
                writeln!(stdout, "{}", name)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut stdout, &names)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

fn print_details<W: Write>(w: &mut W, d: &CanDetails, stats: bool) -> io::Result<()> {
    write!(
        w,
        "{}: {}: <{}>",
        d.index,
        d.name.as_deref().unwrap_or("?"),
        if d.is_up() { "UP" } else { "DOWN" }
    )?;
    if let Some(mtu) = d.mtu {
        write!(w, " mtu {}", mtu)?;
    }
    if let Some(state) = d.operstate {
        write!(w, " state {}", state.name())?;
    }
    writeln!(w)?;

    write!(w, "    {}", d.kind.as_deref().unwrap_or("unknown"))?;
    if let Some(mode) = d.ctrl_mode {
        let names: Vec<_> = mode.enabled().iter().map(|f| f.name()).collect();
        write!(w, " <{}>", names.join(","))?;
    }
    if let Some(state) = d.state {
        write!(w, " state {}", state.name())?;
    }
    if let Some(berr) = d.berr_counter {
        write!(w, " (berr-counter tx {} rx {})", berr.txerr, berr.rxerr)?;
    }
    if let Some(ms) = d.restart_ms {
        write!(w, " restart-ms {}", ms)?;
    }
    writeln!(w)?;

    if let Some(bt) = d.bit_timing {
        writeln!(
            w,
            "\t  bitrate {} sample-point {}.{:03}",
            bt.bitrate,
            bt.sample_point / 1000,
            bt.sample_point % 1000
        )?;
        writeln!(
            w,
            "\t  tq {} prop-seg {} phase-seg1 {} phase-seg2 {} sjw {} brp {}",
            bt.tq, bt.prop_seg, bt.phase_seg1, bt.phase_seg2, bt.sjw, bt.brp
        )?;
    }
    if let Some(btc) = d.bit_timing_const {
        print_timing_const(w, &btc)?;
    }
    if let Some(dbt) = d.data_bit_timing {
        writeln!(
            w,
            "\t  dbitrate {} dsample-point {}.{:03}",
            dbt.bitrate,
            dbt.sample_point / 1000,
            dbt.sample_point % 1000
        )?;
    }
    if let Some(dbtc) = d.data_bit_timing_const {
        print_timing_const(w, &dbtc)?;
    }
    if let Some(ohms) = d.termination {
        write!(w, "\t  termination {} [", ohms)?;
        let supported: Vec<_> = d.termination_const.iter().map(u16::to_string).collect();
        writeln!(w, " {} ]", supported.join(", "))?;
    }
    if let Some(clock) = d.clock {
        writeln!(w, "\t  clock {}", clock.freq)?;
    }

    if stats {
        if let Some(s) = d.device_stats {
            writeln!(
                w,
                "\t  re-started bus-errors arbit-lost error-warn error-pass bus-off"
            )?;
            writeln!(
                w,
                "\t  {:<10} {:<10} {:<10} {:<10} {:<10} {:<10}",
                s.restarts,
                s.bus_error,
                s.arbitration_lost,
                s.error_warning,
                s.error_passive,
                s.bus_off
            )?;
        }
        if let Some(s) = d.stats64 {
            writeln!(w, "    RX:  bytes packets errors dropped")?;
            writeln!(
                w,
                "    {:>10} {:>7} {:>6} {:>7}",
                s.rx_bytes, s.rx_packets, s.rx_errors, s.rx_dropped
            )?;
            writeln!(w, "    TX:  bytes packets errors dropped")?;
            writeln!(
                w,
                "    {:>10} {:>7} {:>6} {:>7}",
                s.tx_bytes, s.tx_packets, s.tx_errors, s.tx_dropped
            )?;
        }
    }

    Ok(())
}

fn print_timing_const<W: Write>(w: &mut W, c: &CanBitTimingConst) -> io::Result<()> {
    writeln!(
        w,
        "\t  {}: tseg1 {}..{} tseg2 {}..{} sjw 1..{} brp {}..{} brp_inc {}",
        c.name(),
        c.tseg1_min,
        c.tseg1_max,
        c.tseg2_min,
        c.tseg2_max,
        c.sjw_max,
        c.brp_min,
        c.brp_max,
        c.brp_inc
    )
}
