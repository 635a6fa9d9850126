//! Shared utilities for canlink.

pub mod ifname;
pub mod parse;

pub use ifname::{list_can_interfaces, name_to_index};
pub use parse::{parse_bitrate, parse_sample_point};
