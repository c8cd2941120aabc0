//! 广播扇出
//!
//! 把同一个报文从节点的每个已连接端口发出（可排除到达端口）。
//! 各副本共享报文 id，便于下游路由器做重复抑制。

use super::id::{NodeId, PortRef};
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::{debug, trace};

impl Network {
    /// 从 `node` 的每个已连接端口（`except` 除外）发出 `pkt` 的副本，返回成功发出的份数
    pub fn forward_broadcast(
        &mut self,
        node: NodeId,
        pkt: Packet,
        except: Option<u8>,
        sim: &mut Simulator,
    ) -> usize {
        let ports: Vec<PortRef> = match self.node(node) {
            Some(n) => n
                .connected_ports()
                .filter(|p| Some(p.number()) != except)
                .map(|p| p.port_ref())
                .collect(),
            None => return 0,
        };
        if ports.is_empty() {
            debug!(node = %node, pkt_id = pkt.id, "没有可广播的端口");
            return 0;
        }
        let mut sent = 0;
        for port in ports {
            if self.send(port, pkt.clone(), sim) {
                sent += 1;
            }
        }
        debug!(node = %node, pkt_id = pkt.id, copies = sent, "📣 广播");
        sent
    }

    /// 路由器转发控制报文：只发往同一 AS 内的邻居，且不回发到到达端口
    pub(crate) fn flood_control(
        &mut self,
        node: NodeId,
        pkt: Packet,
        arrival: u8,
        sim: &mut Simulator,
    ) -> usize {
        let Some(me) = self.node(node) else {
            return 0;
        };
        let asn = me.asn();
        let ports: Vec<PortRef> = me
            .connected_ports()
            .filter(|p| p.number() != arrival)
            .filter(|p| {
                p.peer()
                    .and_then(|peer| self.node(peer.node))
                    .is_some_and(|n| n.asn() == asn)
            })
            .map(|p| p.port_ref())
            .collect();
        let mut sent = 0;
        for port in ports {
            if self.send(port, pkt.clone(), sim) {
                sent += 1;
            }
        }
        trace!(node = %node, pkt_id = pkt.id, copies = sent, "AS 内泛洪");
        sent
    }
}
