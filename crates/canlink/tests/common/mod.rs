//! Common test utilities for integration tests.
//!
//! Provides `TestVcan`, a virtual CAN interface that is removed on drop, and
//! helper macros for conditional test execution.

use canlink::Result;
use canlink::netlink::CanInterface;
use std::io;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for unique interface names.
static VCAN_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique vcan name for this test.
///
/// Names must fit in IFNAMSIZ, so only the low digits of the pid are used.
fn unique_vcan_name() -> String {
    let id = VCAN_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id() % 10_000;
    format!("vcl{}x{}", pid, id)
}

/// A virtual CAN interface with automatic cleanup.
///
/// ```ignore
/// let vcan = TestVcan::new()?;
/// let can = vcan.interface()?;
/// can.set_up().await?;
/// ```
pub struct TestVcan {
    name: String,
}

impl TestVcan {
    /// Create a new vcan interface with a unique name.
    ///
    /// Returns `Ok(None)` if the vcan module is unavailable.
    pub fn new() -> Result<Option<Self>> {
        let name = unique_vcan_name();

        let status = Command::new("ip")
            .args(["link", "add", "dev", &name, "type", "vcan"])
            .status()
            .map_err(|e| canlink::Error::Io(io::Error::from(e.kind())))?;

        if !status.success() {
            return Ok(None);
        }

        Ok(Some(Self { name }))
    }

    /// Get the interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the interface through the library.
    pub fn interface(&self) -> Result<CanInterface> {
        CanInterface::open(&self.name)
    }

    /// Run an `ip` command and return its output.
    pub fn ip(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("ip")
            .args(args)
            .output()
            .map_err(|e| canlink::Error::Io(io::Error::from(e.kind())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(canlink::Error::InvalidMessage(format!(
                "ip {:?} failed: {}",
                args, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Drop for TestVcan {
    fn drop(&mut self) {
        let _ = Command::new("ip")
            .args(["link", "del", "dev", &self.name])
            .status();
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

/// Create a `TestVcan` or skip the test when the vcan module is missing.
#[macro_export]
macro_rules! require_vcan {
    () => {
        match crate::common::TestVcan::new()? {
            Some(vcan) => vcan,
            None => {
                eprintln!("Skipping test: vcan module not available");
                return Ok(());
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_vcan_name() {
        let name1 = unique_vcan_name();
        let name2 = unique_vcan_name();
        assert_ne!(name1, name2);
        assert!(name1.starts_with("vcl"));
        assert!(name1.len() < 16);
    }
}
