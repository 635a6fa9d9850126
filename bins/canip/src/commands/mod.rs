//! canip command implementations.

pub mod set;
pub mod show;

use anyhow::Context;
use canlink::netlink::CanInterface;

use crate::Options;

/// Open an interface given by name or numeric index.
pub fn open(dev: &str, opts: &Options) -> anyhow::Result<CanInterface> {
    let can = match dev.parse::<i32>() {
        Ok(index) => CanInterface::with_connection(
            index,
            canlink::Connection::with_config(opts.socket),
        ),
        Err(_) => CanInterface::open_with_config(dev, opts.socket)
            .with_context(|| format!("cannot open {}", dev))?,
    };
    Ok(can)
}
