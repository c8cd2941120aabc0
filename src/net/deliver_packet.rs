//! 报文到达与节点处理
//!
//! 端口之间的交付永远经过事件队列，不直接调用对端，从而避免收发双方的重入。

use super::id::{NodeId, PortRef};
use super::net_world::NetWorld;
use super::network::Network;
use super::node::NodeKind;
use super::packet::{Packet, PacketKind, Payload};
use crate::sim::{Event, Simulator, World};
use std::net::IpAddr;
use tracing::{debug, info, trace, warn};

/// 事件：报文到达某个端口
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: PortRef,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = %self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            warn!("DeliverPacket 投递到了非 NetWorld 世界");
            return;
        };
        w.net.deliver(to, pkt, sim);
    }
}

impl Network {
    /// 报文到达端口：计数、记录轨迹，然后按节点类型处理
    pub fn deliver(&mut self, to: PortRef, mut pkt: Packet, sim: &mut Simulator) {
        let Some(node) = self.node_mut(to.node) else {
            self.drop_packet(pkt, "unknown node");
            return;
        };
        if let Some(p) = node.port_mut(to.port) {
            p.received += 1;
        }
        pkt.path.push(node.address().to_string());
        let is_router = node.is_router();
        trace!(node = %to.node, hops = pkt.hops(), "📨 报文到达");

        if is_router {
            self.router_receive(to, pkt, sim);
        } else {
            self.host_receive(to.node, pkt);
        }
    }

    /// 主机不转发：只接收发给自己的数据和匹配自己的租约报价
    fn host_receive(&mut self, host: NodeId, pkt: Packet) {
        let payload = match pkt.parsed() {
            Ok(p) => p,
            Err(err) => {
                warn!(%err, "主机收到非法报文");
                self.metrics().record_rejected();
                self.drop_packet(pkt, "malformed");
                return;
            }
        };
        let Some(node) = self.node_mut(host) else {
            return;
        };
        match payload {
            Payload::Data { dest, .. } => {
                if dest == node.address() {
                    info!(host = %host, pkt_id = pkt.id, hops = pkt.hops(), "✅ 数据报文送达");
                    self.metrics().record_received(&pkt);
                } else {
                    self.drop_packet(pkt, "host does not forward");
                }
            }
            Payload::DhcpOffer { address, client_id } if client_id == host.0 => {
                let old = node.address().to_string();
                if node.adopt_leased_address(&address) {
                    info!(host = %host, %address, "主机接受租约地址");
                    if old != address {
                        self.readdress(&old, &address);
                    }
                } else {
                    debug!(host = %host, %address, "已持有其他租约地址，忽略报价");
                }
            }
            _ => trace!(host = %host, "忽略控制报文"),
        }
    }

    fn router_receive(&mut self, at: PortRef, pkt: Packet, sim: &mut Simulator) {
        let Some(node) = self.node_mut(at.node) else {
            return;
        };
        let address = node.address().to_string();
        let asn = node.asn();
        if pkt.kind == PacketKind::Control {
            let NodeKind::Router(state) = &mut node.kind else {
                return;
            };
            if !state.first_sighting(pkt.id) {
                trace!(router = %at.node, pkt_id = pkt.id, "重复的控制报文");
                return;
            }
        }
        self.metrics().record_router_usage(&address);

        let payload = match pkt.parsed() {
            Ok(p) => p,
            Err(err) => {
                warn!(router = %at.node, %err, "路由器收到非法报文");
                self.metrics().record_rejected();
                self.drop_packet(pkt, "malformed");
                return;
            }
        };

        match payload {
            Payload::Data { dest, .. } => {
                if dest == address {
                    self.metrics().record_received(&pkt);
                    return;
                }
                match self.route_port(at.node, &dest) {
                    Some(out) => {
                        self.send(PortRef::new(at.node, out), pkt, sim);
                    }
                    None => self.drop_packet(pkt, "no route"),
                }
            }
            Payload::DhcpRequest { .. } if self.serves_leases(asn, at.node) => {
                if self.serve_lease_request(asn, &pkt.payload, sim).is_err() {
                    self.drop_packet(pkt, "lease request rejected");
                }
            }
            Payload::DhcpRequest { .. } | Payload::DhcpOffer { .. } => {
                self.flood_control(at.node, pkt, at.port, sim);
            }
        }
    }

    /// 路由器把报文送往 `dest` 时应使用的出端口：先看直连邻居，再查 IP 转发表，
    /// 最后按地址查主机路由。
    pub fn route_port(&self, router: NodeId, dest: &str) -> Option<u8> {
        let node = self.node(router)?;
        let port_to = |addr: &str| {
            node.connected_ports().find_map(|p| {
                let peer = p.peer()?;
                (self.node(peer.node)?.address() == addr).then_some(p.number())
            })
        };
        if let Some(port) = port_to(dest) {
            return Some(port);
        }
        let table = &node.as_router()?.routing;
        let by_ip = dest
            .parse::<IpAddr>()
            .ok()
            .and_then(|ip| table.lookup(ip))
            .and_then(|route| port_to(&route.next_hop.to_string()));
        if by_ip.is_some() {
            return by_ip;
        }
        let via = table.host_route(dest)?;
        node.connected_ports()
            .find_map(|p| (p.peer()?.node == via).then_some(p.number()))
    }
}
