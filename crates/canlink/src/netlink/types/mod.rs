//! Wire-level types for rtnetlink link and CAN messages.

pub mod can;
pub mod link;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// A fixed-layout value carried verbatim in an attribute payload.
///
/// Decoding copies the payload into a zeroed value of the full layout, so a
/// payload from an older kernel that is shorter than the layout leaves the
/// missing trailing fields at zero, and a longer payload from a newer kernel
/// is cut to the fields this layout knows about.
pub trait Record: FromBytes + IntoBytes + Immutable + KnownLayout + Copy {
    /// Size of the layout in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Decode a value from an attribute payload.
    fn decode(payload: &[u8]) -> Self {
        let mut value = <Self as FromZeros>::new_zeroed();
        let dst = value.as_mut_bytes();
        let n = payload.len().min(dst.len());
        dst[..n].copy_from_slice(&payload[..n]);
        value
    }

    /// Encode the value as exactly [`Self::SIZE`] bytes.
    fn encode(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Record for link::LinkStats64 {}
