//! 路由协议边界
//!
//! 本仿真不实现 RIP/OSPF/BGP 本身。路由器只记录"某协议已启用"，并把启用事件通知给
//! 外部的 [`RoutingEngine`]；引擎通过 `add_route` 往各路由器的转发表写条目。
//!
//! [`ShortestPathEngine`] 是一个按最短跳数计算的参考引擎，让数据报文在没有真实
//! 协议实现时也能被转发。

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::{self, Write as _};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::id::NodeId;
use super::network::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingProtocol {
    Rip,
    Ospf,
    Bgp,
}

impl fmt::Display for RoutingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutingProtocol::Rip => "RIP",
            RoutingProtocol::Ospf => "OSPF",
            RoutingProtocol::Bgp => "BGP",
        };
        f.write_str(s)
    }
}

/// 转发表条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: IpAddr,
    pub prefix_len: u8,
    pub next_hop: IpAddr,
    pub metric: u32,
    pub protocol: RoutingProtocol,
}

impl Route {
    fn matches(&self, dst: IpAddr) -> bool {
        match (self.destination, dst) {
            (IpAddr::V4(net), IpAddr::V4(d)) => {
                let mask = prefix_mask::<32>(self.prefix_len) as u32;
                u32::from(net) & mask == u32::from(d) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(d)) => {
                let mask = prefix_mask::<128>(self.prefix_len);
                u128::from(net) & mask == u128::from(d) & mask
            }
            _ => false,
        }
    }
}

fn prefix_mask<const BITS: u32>(prefix_len: u8) -> u128 {
    let len = u32::from(prefix_len).min(BITS);
    if len == 0 {
        return 0;
    }
    let ones = u128::MAX << (128 - len);
    ones >> (128 - BITS)
}

/// 路由器转发表
///
/// `routes` 是按 IP 前缀匹配的协议表；`host_routes` 以地址字符串为键，记录到某个
/// 节点地址的下一跳邻居。地址不一定能解析为 IP（id 超过 255，或租约改写后的地址），
/// 这类目的地只能靠后者转发。
#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    routes: Vec<Route>,
    host_routes: BTreeMap<String, (NodeId, u32)>,
}

impl RoutingTable {
    /// 添加或替换 `(destination, prefix_len)` 对应的条目。
    /// 已有条目的度量更小时保留原条目，返回 `false`。
    pub fn add_route(
        &mut self,
        destination: IpAddr,
        prefix_len: u8,
        next_hop: IpAddr,
        metric: u32,
        protocol: RoutingProtocol,
    ) -> bool {
        let route = Route {
            destination,
            prefix_len,
            next_hop,
            metric,
            protocol,
        };
        match self
            .routes
            .iter_mut()
            .find(|r| r.destination == destination && r.prefix_len == prefix_len)
        {
            Some(existing) if existing.metric < metric => false,
            Some(existing) => {
                *existing = route;
                true
            }
            None => {
                self.routes.push(route);
                true
            }
        }
    }

    /// 最长前缀匹配，前缀相同时取度量最小者
    pub fn lookup(&self, dst: IpAddr) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|r| r.matches(dst))
            .max_by(|a, b| {
                a.prefix_len
                    .cmp(&b.prefix_len)
                    .then_with(|| b.metric.cmp(&a.metric))
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 记录到 `address` 的下一跳邻居；已有条目的度量更小时保留原条目。
    pub fn add_host_route(&mut self, address: impl Into<String>, via: NodeId, metric: u32) -> bool {
        match self.host_routes.entry(address.into()) {
            Entry::Occupied(e) if e.get().1 < metric => false,
            Entry::Occupied(mut e) => {
                e.insert((via, metric));
                true
            }
            Entry::Vacant(e) => {
                e.insert((via, metric));
                true
            }
        }
    }

    /// 按地址字符串精确查找下一跳邻居
    pub fn host_route(&self, address: &str) -> Option<NodeId> {
        self.host_routes.get(address).map(|&(via, _)| via)
    }

    pub fn host_routes(&self) -> impl Iterator<Item = (&str, NodeId, u32)> {
        self.host_routes
            .iter()
            .map(|(addr, &(via, metric))| (addr.as_str(), via, metric))
    }

    /// 节点地址变更后把地址路由迁移到新地址
    pub(crate) fn readdress(&mut self, old: &str, new: &str) -> bool {
        let Some(entry) = self.host_routes.remove(old) else {
            return false;
        };
        self.host_routes.insert(new.to_string(), entry);
        true
    }

    /// 文本形式的转发表
    pub fn render(&self) -> String {
        let mut out = String::from("destination        next_hop           metric proto\n");
        for r in &self.routes {
            let dst = format!("{}/{}", r.destination, r.prefix_len);
            let _ = writeln!(out, "{dst:<18} {:<18} {:>6} {}", r.next_hop, r.metric, r.protocol);
        }
        for (addr, via, metric) in self.host_routes() {
            let _ = writeln!(out, "{addr:<18} {:<18} {metric:>6} host", via.to_string());
        }
        out
    }
}

/// 外部路由引擎
pub trait RoutingEngine {
    /// 某路由器启用了 `protocol`；引擎可借 `net.add_route` 写入条目。
    fn on_enabled(&mut self, net: &mut Network, router: NodeId, protocol: RoutingProtocol);
}

/// 参考引擎：在已绑定的链路上做 BFS，为每个可达节点地址安装 /32（或 /128）主机路由。
#[derive(Debug, Default)]
pub struct ShortestPathEngine;

impl ShortestPathEngine {
    /// 以 `router` 为根计算到每个节点的第一跳与跳数
    fn first_hops(net: &Network, router: NodeId) -> HashMap<NodeId, (NodeId, u32)> {
        let mut out: HashMap<NodeId, (NodeId, u32)> = HashMap::new();
        let mut q: VecDeque<NodeId> = VecDeque::new();
        let adj = net.adjacency();

        out.insert(router, (router, 0));
        q.push_back(router);
        while let Some(v) = q.pop_front() {
            let (first, dist) = out[&v];
            for &next in adj.get(&v).into_iter().flatten() {
                if out.contains_key(&next) {
                    continue;
                }
                // 主机不转发，只能作为终点
                let first_hop = if v == router { next } else { first };
                out.insert(next, (first_hop, dist.saturating_add(1)));
                if net.node(next).is_some_and(|n| n.is_router()) {
                    q.push_back(next);
                }
            }
        }
        out.remove(&router);
        out
    }
}

impl RoutingEngine for ShortestPathEngine {
    fn on_enabled(&mut self, net: &mut Network, router: NodeId, protocol: RoutingProtocol) {
        let hops = Self::first_hops(net, router);
        let mut planned: BTreeMap<NodeId, (String, NodeId, Option<(IpAddr, IpAddr)>, u32)> =
            BTreeMap::new();
        for (dst, (first, dist)) in hops {
            let (Some(dst_node), Some(first_node)) = (net.node(dst), net.node(first)) else {
                continue;
            };
            let ips = match (
                dst_node.address().parse::<IpAddr>(),
                first_node.address().parse::<IpAddr>(),
            ) {
                (Ok(dst_ip), Ok(hop_ip)) => Some((dst_ip, hop_ip)),
                _ => None,
            };
            planned.insert(dst, (dst_node.address().to_string(), first, ips, dist));
        }

        let mut installed = 0usize;
        let mut by_address = 0usize;
        for (address, first, ips, dist) in planned.into_values() {
            if net
                .add_host_route(router, address, first, dist)
                .unwrap_or(false)
            {
                by_address += 1;
            }
            let Some((dst_ip, hop_ip)) = ips else {
                continue;
            };
            let full = if dst_ip.is_ipv4() { 32 } else { 128 };
            if net
                .add_route(router, dst_ip, full, hop_ip, dist, protocol)
                .unwrap_or(false)
            {
                installed += 1;
            }
        }
        debug!(router = %router, %protocol, installed, by_address, "最短路径路由已安装");
    }
}

impl Network {
    /// 在路由器上启用协议并通知引擎
    pub fn enable_protocol(
        &mut self,
        router: NodeId,
        protocol: RoutingProtocol,
        engine: &mut dyn RoutingEngine,
    ) -> crate::error::Result<()> {
        let state = self
            .node_mut(router)
            .and_then(|n| n.as_router_mut())
            .ok_or(crate::error::Error::NodeNotFound(router))?;
        state.protocols.insert(protocol);
        info!(router = %router, %protocol, "启用路由协议");
        engine.on_enabled(self, router, protocol);
        Ok(())
    }

    /// 往路由器转发表写入条目
    pub fn add_route(
        &mut self,
        router: NodeId,
        destination: IpAddr,
        prefix_len: u8,
        next_hop: IpAddr,
        metric: u32,
        protocol: RoutingProtocol,
    ) -> crate::error::Result<bool> {
        let state = self
            .node_mut(router)
            .and_then(|n| n.as_router_mut())
            .ok_or(crate::error::Error::NodeNotFound(router))?;
        Ok(state
            .routing
            .add_route(destination, prefix_len, next_hop, metric, protocol))
    }

    /// 往路由器写入按地址匹配的主机路由
    pub fn add_host_route(
        &mut self,
        router: NodeId,
        address: impl Into<String>,
        via: NodeId,
        metric: u32,
    ) -> crate::error::Result<bool> {
        let state = self
            .node_mut(router)
            .and_then(|n| n.as_router_mut())
            .ok_or(crate::error::Error::NodeNotFound(router))?;
        Ok(state.routing.add_host_route(address, via, metric))
    }

    /// 节点换地址后，所有路由器上指向旧地址的主机路由改到新地址
    pub(crate) fn readdress(&mut self, old: &str, new: &str) -> usize {
        let moved = self
            .routers_mut()
            .map(|state| state.routing.readdress(old, new))
            .filter(|&moved| moved)
            .count();
        debug!(old, new, routers = moved, "主机路由随地址迁移");
        moved
    }

    /// 把路由器的转发表打到日志，并返回文本
    pub fn print_routing_table(&self, router: NodeId) -> Option<String> {
        let node = self.node(router)?;
        let table = node.as_router()?.routing.render();
        info!(router = %router, address = %node.address(), "转发表\n{table}");
        Some(table)
    }
}
