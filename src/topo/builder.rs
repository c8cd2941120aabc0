//! 单个自治系统的拓扑构建
//!
//! 顺序：创建路由器（跳过故障路由器）→ 创建主机并接到网关 → 按拓扑类型布线。
//! 单个网关或单条绑定失败只记录日志并跳过，不影响其余部分。

use tracing::{error, info, warn};

use super::id_range::IdRange;
use super::mesh::{MESH_COLUMNS, grid_pairs};
use super::ring_star::ring_star_pairs;
use crate::config::{AsConfig, TopologyType};
use crate::error::{Error, Result};
use crate::net::{AsId, Network, NodeId};

/// 地址前缀，编码 AS 编号：AS 1 为 `192.168.100.`
pub fn address_prefix(as_id: AsId) -> String {
    format!("192.168.{}.", (u64::from(as_id) + 99) % 256)
}

#[derive(Debug)]
pub struct TopologyBuilder {
    as_id: AsId,
    node_count: u32,
    config: AsConfig,
    range: IdRange,
    prefix: String,
    routers: Vec<NodeId>,
    hosts: Vec<NodeId>,
}

impl TopologyBuilder {
    /// 校验配置与 id 段。`index` 是该 AS 在配置中的位置，仅用于错误信息。
    pub fn new(index: usize, config: &AsConfig, range: IdRange) -> Result<Self> {
        let (as_id, node_count) = config.validate(index)?;
        if range.as_id != as_id || range.router_count() != node_count {
            return Err(Error::RouterRangeMismatch {
                as_id,
                start: range.router_start,
                end: range.router_end,
                node_count,
            });
        }
        Ok(Self {
            as_id,
            node_count,
            config: config.clone(),
            range,
            prefix: address_prefix(as_id),
            routers: Vec::new(),
            hosts: Vec::new(),
        })
    }

    pub fn as_id(&self) -> AsId {
        self.as_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn id_range(&self) -> &IdRange {
        &self.range
    }

    pub fn config(&self) -> &AsConfig {
        &self.config
    }

    pub fn routers(&self) -> &[NodeId] {
        &self.routers
    }

    pub fn hosts(&self) -> &[NodeId] {
        &self.hosts
    }

    /// 执行全部三个阶段
    pub fn build(&mut self, net: &mut Network) -> usize {
        self.create_routers(net);
        self.create_hosts(net);
        self.setup_topology(net)
    }

    /// 在路由器段内按顺序创建 `node_count` 台路由器，故障路由器整体略过
    pub fn create_routers(&mut self, net: &mut Network) -> usize {
        let ports = self.config.router_port_count;
        for id in self.range.routers().take(self.node_count as usize) {
            if self.config.broken_routers.contains(&id) {
                warn!(as_id = self.as_id, router = id, "跳过故障路由器");
                continue;
            }
            let address = format!("{}{}", self.prefix, id);
            match net.add_router(NodeId(id), self.as_id, address, ports) {
                Ok(node) => self.routers.push(node),
                Err(err) => error!(as_id = self.as_id, router = id, %err, "创建路由器失败"),
            }
        }
        info!(as_id = self.as_id, routers = self.routers.len(), "路由器创建完成");
        self.routers.len()
    }

    /// 为每个网关下的用户创建主机，并绑定到网关的下一个空闲端口
    pub fn create_hosts(&mut self, net: &mut Network) -> usize {
        let gateways = self.config.gateways.clone();
        for gw in &gateways {
            let gateway = NodeId(gw.node);
            if !self.routers.contains(&gateway) {
                error!(as_id = self.as_id, gateway = gw.node, "网关路由器不存在，跳过");
                continue;
            }
            for &user in &gw.users {
                if let Err(err) = self.create_host(net, gateway, user) {
                    warn!(as_id = self.as_id, gateway = gw.node, user, %err, "创建主机失败，跳过");
                }
            }
        }
        info!(as_id = self.as_id, hosts = self.hosts.len(), "主机创建完成");
        self.hosts.len()
    }

    fn create_host(&mut self, net: &mut Network, gateway: NodeId, user: i64) -> Result<NodeId> {
        let id = u32::try_from(user)
            .ok()
            .filter(|&id| id > 0)
            .ok_or(Error::InvalidUserId(user))?;
        if !self.range.contains_client(id) {
            return Err(Error::ClientOutOfRange {
                as_id: self.as_id,
                client_id: id,
            });
        }
        let free = net
            .node(gateway)
            .ok_or(Error::NodeNotFound(gateway))?
            .available_port()
            .map(|p| p.port_ref())
            .ok_or(Error::NoFreePort(gateway))?;

        let host = net.add_host(NodeId(id), self.as_id, format!("{}{}", self.prefix, id))?;
        let host_port = net
            .node(host)
            .and_then(|n| n.ports().first())
            .map(|p| p.port_ref())
            .ok_or(Error::NodeNotFound(host))?;
        net.bind(host_port, free)?;
        self.hosts.push(host);
        Ok(host)
    }

    /// 按拓扑类型布线，返回成功建立的绑定数
    pub fn setup_topology(&mut self, net: &mut Network) -> usize {
        let pairs = match self.config.topology_type {
            TopologyType::Mesh => grid_pairs(&self.routers, MESH_COLUMNS, false),
            TopologyType::Torus => grid_pairs(&self.routers, MESH_COLUMNS, true),
            TopologyType::RingStar => {
                let plan = ring_star_pairs(&self.routers);
                plan.ring.into_iter().chain(plan.spokes).collect()
            }
        };

        let mut bound = 0;
        for (a, b) in pairs {
            match net.bind_nodes(a, b) {
                Ok(_) => bound += 1,
                Err(err) => warn!(as_id = self.as_id, a = %a, b = %b, %err, "布线失败"),
            }
        }
        info!(
            as_id = self.as_id,
            topology = ?self.config.topology_type,
            bindings = bound,
            "拓扑布线完成"
        );
        bound
    }
}
