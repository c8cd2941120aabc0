//! 节点
//!
//! 路由器与主机共用 [`Node`] 外壳（id、地址、端口），差异部分放在 [`NodeKind`] 里，
//! 报文处理按变体分派（见 `deliver_packet.rs`）。

use std::collections::{BTreeSet, HashSet};

use super::id::{AsId, NodeId, PortRef};
use super::mac::MacAllocator;
use super::port::Port;
use super::routing::{RoutingProtocol, RoutingTable};

/// 路由器默认端口数
pub const DEFAULT_ROUTER_PORTS: u8 = 6;

#[derive(Debug)]
pub enum NodeKind {
    Router(RouterState),
    Host(HostState),
}

/// 路由器私有状态
#[derive(Debug, Default)]
pub struct RouterState {
    pub routing: RoutingTable,
    pub(crate) protocols: BTreeSet<RoutingProtocol>,
    // 已泛洪过的控制报文 id，分当前和上一代两份，每个时钟节拍轮换一次
    pub(crate) seen_control: HashSet<u64>,
    pub(crate) seen_previous: HashSet<u64>,
}

impl RouterState {
    pub fn enabled_protocols(&self) -> impl Iterator<Item = RoutingProtocol> + '_ {
        self.protocols.iter().copied()
    }

    /// 首次见到该控制报文时返回 true 并记下
    pub(crate) fn first_sighting(&mut self, pkt_id: u64) -> bool {
        !self.seen_previous.contains(&pkt_id) && self.seen_control.insert(pkt_id)
    }

    /// 丢弃上一代记录，当前记录降为上一代
    pub(crate) fn rotate_control_history(&mut self) {
        self.seen_previous = std::mem::take(&mut self.seen_control);
    }

    pub fn control_history_len(&self) -> usize {
        self.seen_control.len() + self.seen_previous.len()
    }
}

/// 主机私有状态
#[derive(Debug, Default)]
pub struct HostState {
    /// 通过租约获得的地址；只能接受一次
    pub(crate) leased: Option<String>,
}

impl HostState {
    pub fn leased_address(&self) -> Option<&str> {
        self.leased.as_deref()
    }
}

#[derive(Debug)]
pub struct Node {
    id: NodeId,
    asn: AsId,
    address: String,
    ports: Vec<Port>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn router(
        id: NodeId,
        asn: AsId,
        address: impl Into<String>,
        port_count: u8,
        macs: &mut MacAllocator,
    ) -> Self {
        let ports = (1..=port_count)
            .map(|n| Port::new(id, n, macs.allocate()))
            .collect();
        Self {
            id,
            asn,
            address: address.into(),
            ports,
            kind: NodeKind::Router(RouterState::default()),
        }
    }

    pub(crate) fn host(
        id: NodeId,
        asn: AsId,
        address: impl Into<String>,
        macs: &mut MacAllocator,
    ) -> Self {
        Self {
            id,
            asn,
            address: address.into(),
            ports: vec![Port::new(id, 1, macs.allocate())],
            kind: NodeKind::Host(HostState::default()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// 所属自治系统
    pub fn asn(&self) -> AsId {
        self.asn
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_router(&self) -> bool {
        matches!(self.kind, NodeKind::Router(_))
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, NodeKind::Host(_))
    }

    pub fn as_router(&self) -> Option<&RouterState> {
        match &self.kind {
            NodeKind::Router(r) => Some(r),
            NodeKind::Host(_) => None,
        }
    }

    pub fn as_router_mut(&mut self) -> Option<&mut RouterState> {
        match &mut self.kind {
            NodeKind::Router(r) => Some(r),
            NodeKind::Host(_) => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostState> {
        match &self.kind {
            NodeKind::Host(h) => Some(h),
            NodeKind::Router(_) => None,
        }
    }

    /// 只读端口序列
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, number: u8) -> Option<&Port> {
        self.ports.iter().find(|p| p.number() == number)
    }

    pub(crate) fn port_mut(&mut self, number: u8) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.number() == number)
    }

    /// 第一个未连接的端口
    pub fn available_port(&self) -> Option<&Port> {
        self.ports.iter().find(|p| !p.is_connected())
    }

    pub fn connected_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_connected())
    }

    /// 已连接端口的对端
    pub fn neighbors(&self) -> impl Iterator<Item = PortRef> + '_ {
        self.ports.iter().filter_map(Port::peer)
    }

    /// 接受租约地址。已接受过不同地址时拒绝并返回 `false`。
    pub(crate) fn adopt_leased_address(&mut self, address: &str) -> bool {
        let NodeKind::Host(host) = &mut self.kind else {
            return false;
        };
        match host.leased.as_deref() {
            Some(prev) if prev != address => false,
            Some(_) => true,
            None => {
                host.leased = Some(address.to_string());
                self.address = address.to_string();
                true
            }
        }
    }
}
