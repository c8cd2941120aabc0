//! 自治系统与跨 AS 互联
//!
//! [`AutonomousSystem`] 持有本 AS 的构建结果和一个 [`TopologyController`]；
//! 控制器负责按配置把本 AS 的网关路由器与其他 AS 的路由器绑定起来，
//! 这是不同 AS 之间唯一的连通方式。

use tracing::{error, info, warn};

use super::builder::TopologyBuilder;
use super::id_range::IdRange;
use crate::config::{AsConfig, AsLinkConfig};
use crate::dhcp::LeaseServer;
use crate::error::Result;
use crate::net::{AsId, Network, Node, NodeId};

#[derive(Debug)]
pub struct AutonomousSystem {
    builder: TopologyBuilder,
    controller: TopologyController,
}

impl AutonomousSystem {
    /// 构建一个 AS：创建节点、布线、注册租约服务器。配置非法时整个 AS 中止。
    pub fn build(
        index: usize,
        config: &AsConfig,
        range: IdRange,
        net: &mut Network,
    ) -> Result<Self> {
        let mut builder = TopologyBuilder::new(index, config, range)?;
        builder.build(net);

        let as_id = builder.as_id();
        let mut server = LeaseServer::new(as_id, builder.prefix(), builder.id_range().clone())
            .with_ipv6(config.ipv6);
        let server_router = match config.dhcp_server {
            Some(id) if builder.routers().contains(&NodeId(id)) => Some(NodeId(id)),
            Some(id) => {
                warn!(as_id, router = id, "指定的租约服务器路由器不存在，改用默认路由器");
                builder.routers().first().copied()
            }
            None => builder.routers().first().copied(),
        };
        if let Some(router) = server_router {
            server = server.with_router(router);
        }
        net.add_lease_server(server);

        let controller = TopologyController::new(as_id, config.connect_to_as.clone());
        Ok(Self {
            builder,
            controller,
        })
    }

    pub fn id(&self) -> AsId {
        self.builder.as_id()
    }

    pub fn prefix(&self) -> &str {
        self.builder.prefix()
    }

    pub fn id_range(&self) -> &IdRange {
        self.builder.id_range()
    }

    pub fn routers(&self) -> &[NodeId] {
        self.builder.routers()
    }

    pub fn hosts(&self) -> &[NodeId] {
        self.builder.hosts()
    }

    pub fn controller(&self) -> &TopologyController {
        &self.controller
    }

    pub fn router_nodes<'a>(&self, net: &'a Network) -> impl Iterator<Item = &'a Node> {
        let ids = self.routers().to_vec();
        ids.into_iter().filter_map(move |id| net.node(id))
    }

    pub fn host_nodes<'a>(&self, net: &'a Network) -> impl Iterator<Item = &'a Node> {
        let ids = self.hosts().to_vec();
        ids.into_iter().filter_map(move |id| net.node(id))
    }
}

/// 跨 AS 布线控制器
#[derive(Debug, Clone)]
pub struct TopologyController {
    as_id: AsId,
    links: Vec<AsLinkConfig>,
}

impl TopologyController {
    pub fn new(as_id: AsId, links: Vec<AsLinkConfig>) -> Self {
        Self { as_id, links }
    }

    pub fn links(&self) -> &[AsLinkConfig] {
        &self.links
    }

    /// 按配置绑定网关对，返回新建的绑定数。找不到的 AS 或路由器只记录日志并跳过；
    /// 已经相连的路由器对（例如双方都配置了同一对）不会重复绑定。
    pub fn connect_to_other_as(&self, all: &[AutonomousSystem], net: &mut Network) -> usize {
        let Some(me) = all.iter().find(|s| s.id() == self.as_id) else {
            warn!(as_id = self.as_id, "本 AS 不在列表中");
            return 0;
        };
        let mut bound = 0;
        for link in &self.links {
            let Some(target) = all.iter().find(|s| s.id() == link.id) else {
                warn!(as_id = self.as_id, target = link.id, "目标 AS 不存在，跳过");
                continue;
            };
            for pair in &link.gateway_pairs {
                let (gw, remote) = (NodeId(pair.gateway), NodeId(pair.connect_to));
                if !me.routers().contains(&gw) {
                    warn!(as_id = self.as_id, gateway = pair.gateway, "本地网关路由器不存在，跳过");
                    continue;
                }
                if !target.routers().contains(&remote) {
                    warn!(target = link.id, router = pair.connect_to, "对端路由器不存在，跳过");
                    continue;
                }
                if net.are_linked(gw, remote) {
                    continue;
                }
                match net.bind_nodes(gw, remote) {
                    Ok(_) => {
                        bound += 1;
                        info!(from_as = self.as_id, to_as = link.id, gw = %gw, remote = %remote, "🌐 AS 互联");
                    }
                    Err(err) => error!(gw = %gw, remote = %remote, %err, "AS 互联绑定失败"),
                }
            }
        }
        bound
    }
}
