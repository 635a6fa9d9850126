//! Lookup of link attributes in `RTM_NEWLINK` replies.
//!
//! A reply may carry several messages. The link for an interface index is
//! found by walking them in order, and its attributes are reached through up
//! to three nesting levels:
//!
//! ```text
//! ifinfomsg | IFLA_* ...
//!                IFLA_LINKINFO
//!                    IFLA_INFO_KIND "can"
//!                    IFLA_INFO_DATA
//!                        IFLA_CAN_BITTIMING, IFLA_CAN_STATE, ...
//!                    IFLA_INFO_XSTATS
//! ```
//!
//! Every lookup returns the first attribute of the requested type and `None`
//! when any level is missing.

use super::attr::{Attr, find_attr, parse_attrs};
use super::message::{MessageIter, NlMsgType};
use super::types::can::IflaCan;
use super::types::link::{IfInfoMsg, IflaAttr, IflaInfo};

/// One link message: the interface info header and its attributes.
#[derive(Debug, Clone)]
pub struct LinkView<'a> {
    info: IfInfoMsg,
    attrs: Vec<Attr<'a>>,
}

impl<'a> LinkView<'a> {
    /// Parse a link message payload (ifinfomsg followed by attributes).
    ///
    /// Returns `None` if the payload cannot hold the ifinfomsg.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        let info = *IfInfoMsg::from_bytes(payload)?;
        let mut offset = IfInfoMsg::SIZE;
        let (attrs, _) = parse_attrs(payload, &mut offset, payload.len() - IfInfoMsg::SIZE);
        Some(Self { info, attrs })
    }

    /// Interface info header.
    pub fn info(&self) -> &IfInfoMsg {
        &self.info
    }

    /// Interface index.
    pub fn index(&self) -> i32 {
        self.info.ifi_index
    }

    /// Top-level attributes in wire order.
    pub fn attrs(&self) -> &[Attr<'a>] {
        &self.attrs
    }

    /// Payload of a top-level `IFLA_*` attribute.
    pub fn link_attr(&self, kind: IflaAttr) -> Option<&'a [u8]> {
        find_attr(&self.attrs, kind as u16)
    }

    /// Attributes nested in `IFLA_LINKINFO`.
    pub fn info_attrs(&self) -> Option<Vec<Attr<'a>>> {
        let linkinfo = self.link_attr(IflaAttr::Linkinfo)?;
        Some(nested(linkinfo))
    }

    /// Payload of an `IFLA_INFO_*` attribute.
    pub fn info_attr(&self, kind: IflaInfo) -> Option<&'a [u8]> {
        find_attr(&self.info_attrs()?, kind as u16)
    }

    /// Attributes nested in `IFLA_LINKINFO` -> `IFLA_INFO_DATA`.
    pub fn can_attrs(&self) -> Option<Vec<Attr<'a>>> {
        let data = self.info_attr(IflaInfo::Data)?;
        Some(nested(data))
    }

    /// Payload of an `IFLA_CAN_*` attribute.
    pub fn can_attr(&self, kind: IflaCan) -> Option<&'a [u8]> {
        find_attr(&self.can_attrs()?, kind as u16)
    }
}

fn nested(payload: &[u8]) -> Vec<Attr<'_>> {
    let mut offset = 0;
    parse_attrs(payload, &mut offset, payload.len()).0
}

/// Find the link message for `index` in a reply buffer.
///
/// Messages of any other type, too short for an ifinfomsg, or describing a
/// different interface are skipped.
pub fn find_link(buf: &[u8], index: i32) -> Option<LinkView<'_>> {
    MessageIter::new(buf)
        .filter(|(header, _)| header.nlmsg_type == NlMsgType::RTM_NEWLINK)
        .filter_map(|(_, payload)| LinkView::parse(payload))
        .find(|link| link.index() == index)
}

/// Find a top-level link attribute for `index`.
pub fn find_link_attr(buf: &[u8], index: i32, kind: IflaAttr) -> Option<&[u8]> {
    find_link(buf, index)?.link_attr(kind)
}

/// Find a CAN attribute for `index`.
pub fn find_can_attr(buf: &[u8], index: i32, kind: IflaCan) -> Option<&[u8]> {
    find_link(buf, index)?.can_attr(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::builder::MessageBuilder;
    use crate::netlink::message::{NLM_F_MULTI, NlMsgHdr};
    use crate::netlink::types::Record;
    use crate::netlink::types::can::{CanBitTiming, decode_u32};

    fn link_message(index: i32, build: impl FnOnce(&mut MessageBuilder)) -> Vec<u8> {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWLINK, NLM_F_MULTI);
        builder.append(&IfInfoMsg::new().with_index(index));
        build(&mut builder);
        builder.finish()
    }

    fn can_link(index: i32, bitrate: u32) -> Vec<u8> {
        link_message(index, |b| {
            b.append_attr_string(IflaAttr::Ifname as u16, "can0");
            b.append_attr_u32(IflaAttr::Mtu as u16, 16);
            let linkinfo = b.nest_start(IflaAttr::Linkinfo as u16);
            b.append_attr_string(IflaInfo::Kind as u16, "can");
            let data = b.nest_start(IflaInfo::Data as u16);
            b.append_attr(
                IflaCan::BitTiming as u16,
                CanBitTiming::from_bitrate(bitrate).encode(),
            );
            b.append_attr_u32(IflaCan::RestartMs as u16, 100);
            b.nest_end(data);
            b.nest_end(linkinfo);
        })
    }

    #[test]
    fn test_end_to_end_bittiming() {
        let buf = can_link(3, 500_000);

        let payload = find_can_attr(&buf, 3, IflaCan::BitTiming).unwrap();
        assert_eq!(CanBitTiming::decode(payload).bitrate, 500_000);

        assert!(find_can_attr(&buf, 4, IflaCan::BitTiming).is_none());
    }

    #[test]
    fn test_absent_can_attr() {
        let buf = can_link(3, 500_000);
        assert!(find_can_attr(&buf, 3, IflaCan::Termination).is_none());
        assert_eq!(
            find_can_attr(&buf, 3, IflaCan::RestartMs).and_then(decode_u32),
            Some(100)
        );
    }

    #[test]
    fn test_missing_linkinfo_or_data() {
        let plain = link_message(5, |b| b.append_attr_u32(IflaAttr::Mtu as u16, 1500));
        let link = find_link(&plain, 5).unwrap();
        assert!(link.info_attrs().is_none());
        assert!(link.can_attr(IflaCan::BitTiming).is_none());

        let kind_only = link_message(6, |b| {
            let linkinfo = b.nest_start(IflaAttr::Linkinfo as u16);
            b.append_attr_string(IflaInfo::Kind as u16, "vcan");
            b.nest_end(linkinfo);
        });
        let link = find_link(&kind_only, 6).unwrap();
        assert_eq!(link.info_attr(IflaInfo::Kind), Some(&b"vcan"[..]));
        assert!(link.can_attrs().is_none());
    }

    #[test]
    fn test_top_level_attr() {
        let buf = can_link(3, 125_000);
        let mtu = find_link_attr(&buf, 3, IflaAttr::Mtu).and_then(decode_u32);
        assert_eq!(mtu, Some(16));
        assert!(find_link_attr(&buf, 3, IflaAttr::Stats64).is_none());
    }

    #[test]
    fn test_skips_other_messages() {
        let mut buf = Vec::new();
        // A non-link message first.
        buf.extend_from_slice(NlMsgHdr::new(NlMsgType::NOOP, 0).as_bytes());
        buf.extend_from_slice(&can_link(2, 250_000));
        buf.extend_from_slice(&can_link(3, 1_000_000));

        let link = find_link(&buf, 3).unwrap();
        assert_eq!(link.index(), 3);
        let bt = CanBitTiming::decode(link.can_attr(IflaCan::BitTiming).unwrap());
        assert_eq!(bt.bitrate, 1_000_000);
    }

    #[test]
    fn test_short_link_payload_skipped() {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWLINK, 0);
        builder.append_bytes(&[0u8; 8]);
        let mut buf = builder.finish();
        buf.extend_from_slice(&can_link(3, 500_000));

        assert!(find_link(&buf, 3).is_some());
    }

    #[test]
    fn test_truncated_buffer() {
        let mut buf = can_link(3, 500_000);
        buf.truncate(buf.len() - 4);
        // The declared length now exceeds the buffer: nothing is trusted.
        assert!(find_link(&buf, 3).is_none());
    }

    #[test]
    fn test_duplicate_attr_first_wins() {
        let buf = link_message(3, |b| {
            b.append_attr_u32(IflaAttr::Mtu as u16, 16);
            b.append_attr_u32(IflaAttr::Mtu as u16, 72);
        });
        let mtu = find_link_attr(&buf, 3, IflaAttr::Mtu).and_then(decode_u32);
        assert_eq!(mtu, Some(16));
    }
}
