//! CAN link integration tests.
//!
//! A vcan interface has no controller, so these tests cover the link level
//! settings it does accept and check that controller attributes are absent.

use canlink::Result;
use canlink::netlink::types::link::OperState;
use canlink::netlink::{CanLinkChanges, Mtu};

#[tokio::test]
async fn test_details_of_vcan() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    let details = can.details().await?.expect("vcan should be reported");
    assert_eq!(details.name.as_deref(), Some(vcan.name()));
    assert_eq!(details.index, can.index());
    assert_eq!(details.kind.as_deref(), Some("vcan"));
    assert!(details.mtu.and_then(Mtu::from_value).is_some());
    assert!(!details.is_up());

    // No controller behind a vcan
    assert!(details.bit_timing.is_none());
    assert!(details.state.is_none());
    assert!(details.berr_counter.is_none());

    Ok(())
}

#[tokio::test]
async fn test_up_down() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    can.set_up().await?;
    let details = can.details().await?.unwrap();
    assert!(details.is_up(), "{} should be up", vcan.name());

    let output = vcan.ip(&["link", "show", "dev", vcan.name()])?;
    assert!(output.contains("UP"), "ip should report UP: {}", output);

    can.set_down().await?;
    let details = can.details().await?.unwrap();
    assert!(!details.is_up(), "{} should be down", vcan.name());
    assert_ne!(can.operstate().await?, Some(OperState::Up));

    Ok(())
}

#[tokio::test]
async fn test_set_mtu() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    can.set_mtu(Mtu::Fd).await?;
    assert_eq!(can.mtu().await?, Some(72));

    can.set_mtu(Mtu::Standard).await?;
    assert_eq!(can.mtu().await?, Some(16));

    Ok(())
}

#[tokio::test]
async fn test_combined_changes() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    // MTU and up in one request, no CAN data attached
    can.apply(CanLinkChanges::new().mtu(Mtu::Fd.value()).up(true))
        .await?;

    let details = can.details().await?.unwrap();
    assert!(details.is_up());
    assert_eq!(details.mtu, Some(72));

    Ok(())
}

#[tokio::test]
async fn test_empty_changes_are_noop() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    let before = can.details().await?.unwrap();
    can.apply(CanLinkChanges::new()).await?;
    let after = can.details().await?.unwrap();
    assert_eq!(before.flags, after.flags);
    assert_eq!(before.mtu, after.mtu);

    Ok(())
}

#[tokio::test]
async fn test_stats64_present() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    let stats = can.stats64().await?.expect("kernel reports 64-bit stats");
    assert_eq!(stats.tx_packets, 0);
    assert_eq!(stats.rx_packets, 0);

    Ok(())
}

#[tokio::test]
async fn test_controller_reads_absent() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    assert_eq!(can.bitrate().await?, None);
    assert!(can.bit_timing_const().await?.is_none());
    assert!(can.clock().await?.is_none());
    assert!(can.ctrl_mode().await?.is_none());
    assert!(can.restart_ms().await?.is_none());
    assert!(can.data_bit_timing().await?.is_none());
    assert!(can.termination().await?.is_none());
    assert!(can.device_stats().await?.is_none());

    Ok(())
}
