//! 网络
//!
//! 节点以 id 为键存放在 arena 中，端口之间只通过 [`PortRef`] 互相引用；
//! 绑定/解绑、发送与统计都经由这里完成。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::deliver_packet::DeliverPacket;
use super::id::{AsId, LinkId, NodeId, PortRef};
use super::link::Link;
use super::mac::MacAllocator;
use super::metrics::Metrics;
use super::node::{Node, RouterState};
use super::packet::{Packet, PacketKind, Payload};
use crate::dhcp::LeaseServer;
use crate::error::{Error, Result};
use crate::sim::Simulator;
use tracing::{debug, info, trace, warn};

#[derive(Default)]
pub struct Network {
    nodes: BTreeMap<NodeId, Node>,
    links: Vec<Option<Link>>,
    macs: MacAllocator,
    next_pkt_id: u64,
    pub(crate) lease_servers: BTreeMap<AsId, LeaseServer>,
    metrics: Arc<Metrics>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用外部共享的统计收集器
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// 添加路由器
    pub fn add_router(
        &mut self,
        id: NodeId,
        asn: AsId,
        address: impl Into<String>,
        port_count: u8,
    ) -> Result<NodeId> {
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        let node = Node::router(id, asn, address, port_count, &mut self.macs);
        debug!(node = %id, asn, address = %node.address(), port_count, "添加路由器");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// 添加主机（单端口）
    pub fn add_host(&mut self, id: NodeId, asn: AsId, address: impl Into<String>) -> Result<NodeId> {
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        let node = Node::host(id, asn, address, &mut self.macs);
        debug!(node = %id, asn, address = %node.address(), "添加主机");
        self.nodes.insert(id, node);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// 按 id 升序遍历所有节点
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn routers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_router())
    }

    pub(crate) fn routers_mut(&mut self) -> impl Iterator<Item = &mut RouterState> {
        self.nodes.values_mut().filter_map(|n| n.as_router_mut())
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_host())
    }

    pub fn node_by_address(&self, address: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.address() == address)
    }

    /// 所有路由器的控制报文去重记录轮换一代
    pub fn rotate_control_history(&mut self) {
        for state in self.routers_mut() {
            state.rotate_control_history();
        }
    }

    pub fn mac_count(&self) -> usize {
        self.macs.len()
    }

    /// 当前所有绑定
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|l| (LinkId(i), l)))
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0).and_then(Option::as_ref)
    }

    /// 节点邻接表（只含已绑定的链路）
    pub fn adjacency(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (_, link) in self.links() {
            let (x, y) = link.endpoints();
            adj.entry(x).or_default().push(y);
            adj.entry(y).or_default().push(x);
        }
        adj
    }

    /// 两个节点之间是否已有绑定
    pub fn are_linked(&self, x: NodeId, y: NodeId) -> bool {
        self.links().any(|(_, l)| {
            let (a, b) = l.endpoints();
            (a == x && b == y) || (a == y && b == x)
        })
    }

    fn port(&self, r: PortRef) -> Option<&super::port::Port> {
        self.nodes.get(&r.node)?.port(r.port)
    }

    fn port_mut(&mut self, r: PortRef) -> Option<&mut super::port::Port> {
        self.nodes.get_mut(&r.node)?.port_mut(r.port)
    }

    /// 绑定两个端口。任一端口不存在或已绑定时失败，且不改变任何状态。
    #[tracing::instrument(skip(self), fields(a = %a, b = %b))]
    pub fn bind(&mut self, a: PortRef, b: PortRef) -> Result<LinkId> {
        if a == b {
            warn!("拒绝自绑定");
            return Err(Error::SelfBinding(a));
        }
        for r in [a, b] {
            match self.port(r) {
                None => {
                    warn!(port = %r, "端口不存在");
                    return Err(Error::PortNotFound(r));
                }
                Some(p) if p.is_connected() => {
                    warn!(port = %r, peer = ?p.peer(), "端口已绑定");
                    return Err(Error::PortAlreadyBound(r));
                }
                Some(_) => {}
            }
        }

        let id = LinkId(self.links.len());
        self.links.push(Some(Link::new(a, b)));
        if let Some(p) = self.port_mut(a) {
            p.link = Some((id, b));
        }
        if let Some(p) = self.port_mut(b) {
            p.link = Some((id, a));
        }
        info!(link = id.0, "🔗 端口绑定");
        Ok(id)
    }

    /// 用两个节点各自的第一个空闲端口建立绑定
    pub fn bind_nodes(&mut self, x: NodeId, y: NodeId) -> Result<LinkId> {
        let free = |net: &Self, id: NodeId| -> Result<PortRef> {
            let node = net.node(id).ok_or(Error::NodeNotFound(id))?;
            node.available_port()
                .map(|p| p.port_ref())
                .ok_or(Error::NoFreePort(id))
        };
        let a = free(self, x)?;
        let b = free(self, y)?;
        self.bind(a, b)
    }

    /// 解除绑定。两端口当前并未互相绑定时失败。
    #[tracing::instrument(skip(self), fields(a = %a, b = %b))]
    pub fn unbind(&mut self, a: PortRef, b: PortRef) -> Result<()> {
        let link_id = match self.port(a).and_then(|p| p.link) {
            Some((id, peer)) if peer == b => id,
            _ => {
                warn!("端口未互相绑定");
                return Err(Error::NotBound(a, b));
            }
        };
        self.links[link_id.0] = None;
        for r in [a, b] {
            if let Some(p) = self.port_mut(r) {
                p.link = None;
            }
        }
        info!(link = link_id.0, "✂️  解除绑定");
        Ok(())
    }

    /// 分配新的报文 id 并构造报文
    pub fn make_packet(&mut self, payload: &Payload, origin: impl Into<String>) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, payload, origin)
    }

    /// 丢弃报文；数据报文计入丢包统计
    pub(crate) fn drop_packet(&mut self, mut pkt: Packet, reason: &str) {
        pkt.dropped = true;
        if pkt.kind == PacketKind::Data {
            self.metrics.record_dropped();
        }
        debug!(pkt_id = pkt.id, kind = ?pkt.kind, ttl = pkt.ttl, reason, "🗑️  丢弃报文");
    }

    /// 从端口发出报文：计数、消耗一跳，并在对端调度到达事件。
    ///
    /// 端口未连接或 TTL 耗尽时报文被丢弃，返回 `false`。
    #[tracing::instrument(skip(self, pkt, sim), fields(from = %from, pkt_id = pkt.id))]
    pub fn send(&mut self, from: PortRef, mut pkt: Packet, sim: &mut Simulator) -> bool {
        let Some((link_id, peer)) = self.port(from).and_then(|p| p.link) else {
            self.drop_packet(pkt, "port not connected");
            return false;
        };
        if !pkt.take_hop() {
            self.drop_packet(pkt, "ttl exhausted");
            return false;
        }
        if let Some(p) = self.port_mut(from) {
            p.sent += 1;
        }

        let now = sim.now();
        let Some(link) = self.links.get_mut(link_id.0).and_then(Option::as_mut) else {
            self.drop_packet(pkt, "stale link");
            return false;
        };
        let dep = link.depart(from, now);
        if dep.waited_cycles > 0 {
            pkt.wait_cycles = pkt.wait_cycles.saturating_add(dep.waited_cycles);
            pkt.queue_wait_cycles = pkt.queue_wait_cycles.saturating_add(1);
        }
        trace!(to = %peer, arrive = %dep.arrive, waited = dep.waited_cycles, ttl = pkt.ttl, "调度到达");
        sim.schedule(dep.arrive, DeliverPacket { to: peer, pkt });
        true
    }

    /// 由主机注入一个数据报文（计入发送统计）
    pub fn inject(&mut self, host: NodeId, pkt: Packet, sim: &mut Simulator) -> Result<bool> {
        let node = self.node(host).ok_or(Error::NodeNotFound(host))?;
        let port = node
            .ports()
            .first()
            .map(|p| p.port_ref())
            .ok_or(Error::NoFreePort(host))?;
        if pkt.kind == PacketKind::Data {
            self.metrics.record_sent();
        }
        Ok(self.send(port, pkt, sim))
    }
}
