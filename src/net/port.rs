//! 端口
//!
//! 端口归属唯一的节点，最多与另一个端口绑定；`connected` 与绑定记录一一对应，
//! 只能由 [`Network`](super::Network) 的 bind/unbind 修改。

use super::id::{LinkId, NodeId, PortRef};
use super::mac::MacAddr;

#[derive(Debug, Clone)]
pub struct Port {
    owner: NodeId,
    number: u8,
    mac: MacAddr,
    pub(crate) link: Option<(LinkId, PortRef)>,
    pub(crate) sent: u64,
    pub(crate) received: u64,
}

impl Port {
    pub(crate) fn new(owner: NodeId, number: u8, mac: MacAddr) -> Self {
        Self {
            owner,
            number,
            mac,
            link: None,
            sent: 0,
            received: 0,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// 端口号，从 1 开始
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn port_ref(&self) -> PortRef {
        PortRef::new(self.owner, self.number)
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// 对端端口（未绑定时为 None）
    pub fn peer(&self) -> Option<PortRef> {
        self.link.map(|(_, peer)| peer)
    }

    pub fn link_id(&self) -> Option<LinkId> {
        self.link.map(|(id, _)| id)
    }

    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    pub fn received_count(&self) -> u64 {
        self.received
    }
}
