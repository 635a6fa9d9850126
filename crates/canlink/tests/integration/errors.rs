//! Error reporting integration tests.

use canlink::Result;
use canlink::netlink::CanInterface;

#[tokio::test]
async fn test_open_missing_interface() -> Result<()> {
    let err = CanInterface::open("nosuchcan9").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
    Ok(())
}

#[tokio::test]
async fn test_removed_interface_reads_none() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;
    let index = can.index();
    drop(vcan);

    let can = CanInterface::open_index(index);
    assert!(can.details().await?.is_none());
    assert_eq!(can.bitrate().await?, None);

    Ok(())
}

#[tokio::test]
async fn test_bitrate_on_vcan_rejected() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    // A "can" kind request against a vcan link is refused by the kernel
    let err = can.set_bitrate(500_000, None).await.unwrap_err();
    assert!(err.errno().is_some(), "expected kernel error: {}", err);

    Ok(())
}

#[tokio::test]
async fn test_restart_on_vcan_rejected() -> Result<()> {
    require_root!();
    let vcan = require_vcan!();
    let can = vcan.interface()?;

    let err = can.restart().await.unwrap_err();
    assert!(err.errno().is_some(), "expected kernel error: {}", err);

    Ok(())
}
