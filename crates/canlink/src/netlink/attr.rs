//! Netlink attribute (rtattr/nlattr) handling.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = nla_align(std::mem::size_of::<NlAttr>());

/// Header-inclusive, unpadded length of an attribute carrying `payload_len` bytes.
#[inline]
pub const fn nla_length(payload_len: usize) -> usize {
    NLA_HDRLEN + payload_len
}

/// Space an attribute carrying `payload_len` bytes occupies, padding included.
#[inline]
pub const fn nla_total_size(payload_len: usize) -> usize {
    nla_align(nla_length(payload_len))
}

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: nla_length(data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Check that the declared length fits in `available` bytes.
    pub fn is_well_formed(&self, available: usize) -> bool {
        let len = self.nla_len as usize;
        available >= NLA_HDRLEN && len >= NLA_HDRLEN && len <= available
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// A single parsed attribute: its type and unpadded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    /// Attribute type with the nested/byte-order flags masked off.
    pub kind: u16,
    /// Payload bytes, without trailing alignment padding.
    pub payload: &'a [u8],
}

/// Parse a flat list of attributes from `buf[*offset..*offset + len]`.
///
/// Returns the attributes in wire order together with the number of bytes
/// consumed. `offset` is advanced past every record taken, so a caller can
/// resume after a fixed header it parsed itself. Parsing stops at the first
/// record whose header is short or whose length does not fit, logging a
/// warning; the records before it are still returned.
pub fn parse_attrs<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> (Vec<Attr<'a>>, usize) {
    let start = *offset;
    let end = start.saturating_add(len).min(buf.len());
    let mut attrs = Vec::new();

    while *offset < end {
        let remaining = &buf[*offset..end];
        let Ok(header) = NlAttr::from_bytes(remaining) else {
            break;
        };
        if !header.is_well_formed(remaining.len()) {
            tracing::warn!(
                declared = header.nla_len,
                available = remaining.len(),
                "stopping at malformed attribute"
            );
            break;
        }

        let rec_len = header.nla_len as usize;
        attrs.push(Attr {
            kind: header.kind(),
            payload: &remaining[NLA_HDRLEN..rec_len],
        });

        *offset = (*offset + nla_align(rec_len)).min(end);
    }

    (attrs, *offset - start)
}

/// Return the payload of the first attribute of `kind`, if any.
pub fn find_attr<'a>(attrs: &[Attr<'a>], kind: u16) -> Option<&'a [u8]> {
    attrs.iter().find(|a| a.kind == kind).map(|a| a.payload)
}

/// Iterator over netlink attributes in a buffer.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let attr = NlAttr::from_bytes(self.data).ok()?;
        if !attr.is_well_formed(self.data.len()) {
            self.data = &[];
            return None;
        }

        let len = attr.nla_len as usize;
        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr.kind(), payload))
    }
}

/// Helper functions for extracting typed values from attribute payloads.
pub mod get {
    use super::*;

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Result<u8> {
        data.first()
            .copied()
            .ok_or_else(|| Error::InvalidAttribute("empty u8 attribute".into()))
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        let bytes = data
            .get(..2)
            .ok_or_else(|| Error::InvalidAttribute("truncated u16 attribute".into()))?;
        Ok(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        let bytes = data
            .get(..4)
            .ok_or_else(|| Error::InvalidAttribute("truncated u32 attribute".into()))?;
        Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Extract a u64 value (native endian).
    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        let bytes = data
            .get(..8)
            .ok_or_else(|| Error::InvalidAttribute("truncated u64 attribute".into()))?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_ne_bytes(raw))
    }

    /// Extract an i32 value (native endian).
    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        u32_ne(data).map(|v| v as i32)
    }

    /// Extract a string, stopping at the first NUL if there is one.
    pub fn string(data: &[u8]) -> Result<&str> {
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = NlAttr::new(kind, payload.len()).as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nla_align(buf.len()), 0);
        buf
    }

    #[test]
    fn test_lengths() {
        assert_eq!(NLA_HDRLEN, 4);
        assert_eq!(nla_length(5), 9);
        assert_eq!(nla_total_size(5), 12);
        assert_eq!(nla_total_size(0), 4);
        assert_eq!(nla_total_size(32), 36);
    }

    #[test]
    fn test_round_trip_payload_sizes() {
        for n in 0..=64usize {
            let payload: Vec<u8> = (0..n).map(|i| i as u8 ^ 0x5a).collect();
            let buf = encode(7, &payload);
            assert_eq!(buf.len(), nla_total_size(n));

            let mut offset = 0;
            let (attrs, consumed) = parse_attrs(&buf, &mut offset, buf.len());
            assert_eq!(attrs.len(), 1);
            assert_eq!(attrs[0].kind, 7);
            assert_eq!(attrs[0].payload, payload.as_slice());
            assert_eq!(consumed, buf.len());
            assert_eq!(offset, buf.len());
        }
    }

    #[test]
    fn test_parse_from_offset() {
        let mut buf = vec![0xee; 16];
        buf.extend_from_slice(&encode(1, &100u32.to_ne_bytes()));
        buf.extend_from_slice(&encode(2, b"can"));

        let mut offset = 16;
        let len = buf.len() - offset;
        let (attrs, consumed) = parse_attrs(&buf, &mut offset, len);
        assert_eq!(attrs.len(), 2);
        assert_eq!(consumed, 16);
        assert_eq!(offset, buf.len());
        assert_eq!(get::u32_ne(attrs[0].payload).unwrap(), 100);
        assert_eq!(attrs[1].payload, b"can");
    }

    #[test]
    fn test_truncated_tail_is_lenient() {
        let mut buf = encode(1, &[1, 2, 3, 4]);
        buf.extend_from_slice(&encode(2, &[5, 6, 7, 8, 9, 10, 11, 12]));
        // Cut the second record in half.
        buf.truncate(8 + 6);

        let mut offset = 0;
        let (attrs, consumed) = parse_attrs(&buf, &mut offset, buf.len());
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].kind, 1);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_short_header_and_bad_length() {
        let mut offset = 0;
        let (attrs, _) = parse_attrs(&[4, 0], &mut offset, 2);
        assert!(attrs.is_empty());

        // Declared length smaller than the header itself.
        let bad = [2u8, 0, 1, 0, 0, 0, 0, 0];
        let mut offset = 0;
        let (attrs, consumed) = parse_attrs(&bad, &mut offset, bad.len());
        assert!(attrs.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_len_beyond_buffer_is_clamped() {
        let buf = encode(3, &[9; 4]);
        let mut offset = 0;
        let (attrs, consumed) = parse_attrs(&buf, &mut offset, 1000);
        assert_eq!(attrs.len(), 1);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_unpadded_final_record() {
        // Kernel replies may end right after the payload of the last record.
        let mut buf = encode(1, &[1, 2, 3, 4]);
        let mut last = NlAttr::new(2, 1).as_bytes().to_vec();
        last.push(0x7f);
        buf.extend_from_slice(&last);

        let mut offset = 0;
        let (attrs, consumed) = parse_attrs(&buf, &mut offset, buf.len());
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1].payload, &[0x7f]);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_first_match_wins() {
        let mut buf = encode(5, &[1]);
        buf.extend_from_slice(&encode(5, &[2]));
        let mut offset = 0;
        let (attrs, _) = parse_attrs(&buf, &mut offset, buf.len());
        assert_eq!(find_attr(&attrs, 5), Some(&[1u8][..]));
        assert_eq!(find_attr(&attrs, 6), None);
    }

    #[test]
    fn test_nested_flag_masked() {
        let buf = encode(2 | NLA_F_NESTED, &[]);
        let mut offset = 0;
        let (attrs, _) = parse_attrs(&buf, &mut offset, buf.len());
        assert_eq!(attrs[0].kind, 2);

        let (kind, _) = AttrIter::new(&buf).next().unwrap();
        assert_eq!(kind, 2);
    }

    #[test]
    fn test_attr_iter_matches_parse() {
        let mut buf = encode(1, b"abc");
        buf.extend_from_slice(&encode(2, &[0; 8]));
        let collected: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(collected, vec![(1u16, &b"abc"[..]), (2u16, &[0u8; 8][..])]);
    }

    #[test]
    fn test_getters() {
        assert_eq!(get::u8(&[3]).unwrap(), 3);
        assert!(get::u8(&[]).is_err());
        assert_eq!(get::u16_ne(&120u16.to_ne_bytes()).unwrap(), 120);
        assert!(get::u32_ne(&[1, 2]).is_err());
        assert_eq!(get::u64_ne(&7u64.to_ne_bytes()).unwrap(), 7);
        assert!(get::u64_ne(&[0; 4]).is_err());
        assert_eq!(get::i32_ne(&(-5i32).to_ne_bytes()).unwrap(), -5);
        assert_eq!(get::string(b"can\0").unwrap(), "can");
        assert_eq!(get::string(b"vcan").unwrap(), "vcan");
    }
}
