//! Request builders for CAN link queries and updates.
//!
//! # Example
//!
//! ```ignore
//! use canlink::netlink::request::{CanLinkChanges, set_link_request};
//! use canlink::netlink::types::can::{CanBitTiming, CanCtrlFlag};
//!
//! let changes = CanLinkChanges::new()
//!     .bit_timing(CanBitTiming::from_bitrate(500_000).with_sample_point(875))
//!     .ctrl_mode_flag(CanCtrlFlag::BerrReporting, true)
//!     .restart_ms(100);
//!
//! let msg = set_link_request(3, &changes).finish();
//! ```

use super::builder::MessageBuilder;
use super::message::{NLM_F_ACK, NLM_F_REQUEST, NlMsgType};
use super::types::Record;
use super::types::can::{CanBitTiming, CanCtrlFlag, CanCtrlMode, IflaCan};
use super::types::link::{IfInfoMsg, IflaAttr, IflaInfo, iff};

/// Link kind used for real CAN controllers.
pub const CAN_KIND: &str = "can";

/// Build an `RTM_GETLINK` request for a single interface.
pub fn get_link_request(index: i32) -> MessageBuilder {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST);
    builder.append(&IfInfoMsg::new().with_index(index));
    builder
}

/// A set of CAN link properties to change in one request.
///
/// Fields left unset are not sent and keep their current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanLinkChanges {
    kind: String,
    up: Option<bool>,
    mtu: Option<u32>,
    restart_ms: Option<u32>,
    restart: bool,
    bit_timing: Option<CanBitTiming>,
    data_bit_timing: Option<CanBitTiming>,
    ctrl_mode: Option<CanCtrlMode>,
    termination: Option<u16>,
}

impl Default for CanLinkChanges {
    fn default() -> Self {
        Self {
            kind: CAN_KIND.to_string(),
            up: None,
            mtu: None,
            restart_ms: None,
            restart: false,
            bit_timing: None,
            data_bit_timing: None,
            ctrl_mode: None,
            termination: None,
        }
    }
}

impl CanLinkChanges {
    /// Create an empty change set for a `can` link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the link kind sent in `IFLA_INFO_KIND` (default `"can"`).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Bring the interface up (`true`) or down (`false`).
    pub fn up(mut self, up: bool) -> Self {
        self.up = Some(up);
        self
    }

    /// Set the MTU (16 for classic CAN, 72 for CAN FD).
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Set the automatic bus-off restart delay; 0 disables it.
    pub fn restart_ms(mut self, ms: u32) -> Self {
        self.restart_ms = Some(ms);
        self
    }

    /// Trigger a manual restart of a bus-off controller.
    pub fn restart(mut self) -> Self {
        self.restart = true;
        self
    }

    /// Set the arbitration phase bit timing.
    pub fn bit_timing(mut self, timing: CanBitTiming) -> Self {
        self.bit_timing = Some(timing);
        self
    }

    /// Set the CAN FD data phase bit timing.
    pub fn data_bit_timing(mut self, timing: CanBitTiming) -> Self {
        self.data_bit_timing = Some(timing);
        self
    }

    /// Set the controller mode mask and flags.
    pub fn ctrl_mode(mut self, mode: CanCtrlMode) -> Self {
        self.ctrl_mode = Some(mode);
        self
    }

    /// Change a single controller mode, merging with modes already requested.
    pub fn ctrl_mode_flag(mut self, flag: CanCtrlFlag, on: bool) -> Self {
        self.ctrl_mode
            .get_or_insert_with(CanCtrlMode::default)
            .set(flag, on);
        self
    }

    /// Set the bus termination resistance in Ohms (0 disables).
    pub fn termination(mut self, ohms: u16) -> Self {
        self.termination = Some(ohms);
        self
    }

    /// Check whether any `IFLA_CAN_*` attribute will be sent.
    pub fn has_can_data(&self) -> bool {
        self.restart_ms.is_some()
            || self.restart
            || self.bit_timing.is_some()
            || self.data_bit_timing.is_some()
            || self.ctrl_mode.is_some()
            || self.termination.is_some()
    }

    /// Check whether the change set would send nothing beyond the header.
    pub fn is_empty(&self) -> bool {
        self.up.is_none() && self.mtu.is_none() && !self.has_can_data()
    }

    fn append_can_data(&self, builder: &mut MessageBuilder) {
        if let Some(ref bt) = self.bit_timing {
            builder.append_attr(IflaCan::BitTiming as u16, bt.encode());
        }
        if let Some(ref bt) = self.data_bit_timing {
            builder.append_attr(IflaCan::DataBitTiming as u16, bt.encode());
        }
        if let Some(ref mode) = self.ctrl_mode {
            builder.append_attr(IflaCan::CtrlMode as u16, mode.encode());
        }
        if let Some(ms) = self.restart_ms {
            builder.append_attr_u32(IflaCan::RestartMs as u16, ms);
        }
        if self.restart {
            builder.append_attr_u32(IflaCan::Restart as u16, 1);
        }
        if let Some(ohms) = self.termination {
            builder.append_attr_u16(IflaCan::Termination as u16, ohms);
        }
    }
}

/// Build an `RTM_NEWLINK` request applying `changes` to an existing interface.
///
/// The up/down state is a masked update: only `IFF_UP` is flagged in
/// `ifi_change`. The `IFLA_LINKINFO` wrapper is emitted only when at least
/// one CAN attribute is being set.
pub fn set_link_request(index: i32, changes: &CanLinkChanges) -> MessageBuilder {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWLINK, NLM_F_REQUEST | NLM_F_ACK);

    let mut ifinfo = IfInfoMsg::new().with_index(index);
    if let Some(up) = changes.up {
        ifinfo = ifinfo.with_flag(iff::UP, up);
    }
    builder.append(&ifinfo);

    if let Some(mtu) = changes.mtu {
        builder.append_attr_u32(IflaAttr::Mtu as u16, mtu);
    }

    if changes.has_can_data() {
        let linkinfo = builder.nest_start(IflaAttr::Linkinfo as u16);
        builder.append_attr_string(IflaInfo::Kind as u16, &changes.kind);
        let data = builder.nest_start(IflaInfo::Data as u16);
        changes.append_can_data(&mut builder);
        builder.nest_end(data);
        builder.nest_end(linkinfo);
    }

    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrIter, NLA_HDRLEN, nla_total_size};
    use crate::netlink::message::{NLMSG_HDRLEN, NlMsgHdr};
    use crate::netlink::nav::find_link;
    use crate::netlink::types::can::decode_u32;

    fn ifinfo(msg: &[u8]) -> IfInfoMsg {
        *IfInfoMsg::from_bytes(&msg[NLMSG_HDRLEN..]).unwrap()
    }

    fn attrs(msg: &[u8]) -> &[u8] {
        &msg[NLMSG_HDRLEN + IfInfoMsg::SIZE..]
    }

    /// Replies carry RTM_NEWLINK too, so the navigator can read back a request.
    fn read_back(msg: &[u8], index: i32) -> crate::netlink::nav::LinkView<'_> {
        find_link(msg, index).unwrap()
    }

    #[test]
    fn test_get_link_request() {
        let msg = get_link_request(3).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN + IfInfoMsg::SIZE);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETLINK);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
        assert_eq!(header.nlmsg_len as usize, msg.len());

        let info = ifinfo(&msg);
        assert_eq!(info.ifi_index, 3);
        assert_eq!(info.ifi_family, 0);
        assert_eq!(info.ifi_change, 0);
    }

    #[test]
    fn test_set_link_header() {
        let msg = set_link_request(3, &CanLinkChanges::new()).finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWLINK);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST | NLM_F_ACK);
        assert_eq!(msg.len(), NLMSG_HDRLEN + IfInfoMsg::SIZE);
    }

    #[test]
    fn test_no_wrapper_without_can_data() {
        let changes = CanLinkChanges::new().mtu(72).up(true);
        assert!(!changes.has_can_data());

        let msg = set_link_request(3, &changes).finish();
        let payload = attrs(&msg);
        assert_eq!(payload.len(), nla_total_size(4));

        let kinds: Vec<u16> = AttrIter::new(payload).map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![IflaAttr::Mtu as u16]);
    }

    #[test]
    fn test_single_can_attr_length() {
        let changes = CanLinkChanges::new().mtu(16).restart_ms(100);
        let msg = set_link_request(3, &changes).finish();

        let top = nla_total_size(4);
        let wrappers = NLA_HDRLEN + nla_total_size(CAN_KIND.len()) + NLA_HDRLEN;
        let can = nla_total_size(4);
        assert_eq!(attrs(&msg).len(), top + wrappers + can);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, msg.len());
        assert_eq!(msg.len() % 4, 0);
    }

    #[test]
    fn test_can_attrs_read_back() {
        let changes = CanLinkChanges::new()
            .bit_timing(CanBitTiming::from_bitrate(500_000).with_sample_point(875))
            .ctrl_mode_flag(CanCtrlFlag::Fd, true)
            .ctrl_mode_flag(CanCtrlFlag::ListenOnly, false)
            .termination(120)
            .restart();
        let msg = set_link_request(7, &changes).finish();
        let link = read_back(&msg, 7);

        assert_eq!(link.info_attr(IflaInfo::Kind), Some(CAN_KIND.as_bytes()));

        let bt = CanBitTiming::decode(link.can_attr(IflaCan::BitTiming).unwrap());
        assert_eq!(bt.bitrate, 500_000);
        assert_eq!(bt.sample_point, 875);

        let mode = CanCtrlMode::decode(link.can_attr(IflaCan::CtrlMode).unwrap());
        assert_eq!(mode.mask, 0x22);
        assert_eq!(mode.flags, 0x20);

        let term = link.can_attr(IflaCan::Termination).unwrap();
        assert_eq!(term, &120u16.to_ne_bytes());

        assert_eq!(
            link.can_attr(IflaCan::Restart).and_then(decode_u32),
            Some(1)
        );
        assert!(link.can_attr(IflaCan::RestartMs).is_none());
        assert!(link.link_attr(IflaAttr::Mtu).is_none());
    }

    #[test]
    fn test_custom_kind() {
        let changes = CanLinkChanges::new().kind("vcan").restart_ms(0);
        let msg = set_link_request(1, &changes).finish();
        let link = read_back(&msg, 1);
        assert_eq!(link.info_attr(IflaInfo::Kind), Some(&b"vcan"[..]));
    }

    #[test]
    fn test_up_down_masked() {
        let msg = set_link_request(3, &CanLinkChanges::new().up(true)).finish();
        let info = ifinfo(&msg);
        assert_eq!(info.ifi_change, iff::UP);
        assert_eq!(info.ifi_flags, iff::UP);

        let msg = set_link_request(3, &CanLinkChanges::new().up(false)).finish();
        let info = ifinfo(&msg);
        assert_eq!(info.ifi_change, iff::UP);
        assert_eq!(info.ifi_flags, 0);

        let msg = set_link_request(3, &CanLinkChanges::new().restart_ms(5)).finish();
        let info = ifinfo(&msg);
        assert_eq!(info.ifi_change, 0);
        assert_eq!(info.ifi_flags, 0);
    }

    #[test]
    fn test_top_level_before_linkinfo() {
        let changes = CanLinkChanges::new().restart_ms(10).mtu(72);
        let msg = set_link_request(3, &changes).finish();
        let kinds: Vec<u16> = AttrIter::new(attrs(&msg)).map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![IflaAttr::Mtu as u16, IflaAttr::Linkinfo as u16]);
    }

    #[test]
    fn test_is_empty() {
        assert!(CanLinkChanges::new().is_empty());
        assert!(!CanLinkChanges::new().up(false).is_empty());
        assert!(!CanLinkChanges::new().termination(0).is_empty());
    }
}
