//! 仿真配置
//!
//! 由 JSON 解析而来，构建开始后只读。`id` 与 `node_count` 在这里是可选的，
//! 缺失时由 [`AsConfig::validate`] 报错，只中止对应 AS 的构建而不影响其他 AS。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::net::{AsId, DEFAULT_ROUTER_PORTS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// 每次仿真生成的报文数量上限；保持原始 JSON 值，非法值由数据发生器回退到默认值
    #[serde(default)]
    pub packets_per_simulation: Option<serde_json::Value>,
    #[serde(default)]
    pub autonomous_systems: Vec<AsConfig>,
}

impl SimConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyType {
    #[default]
    #[serde(alias = "mesh")]
    Mesh,
    #[serde(alias = "ring_star", alias = "ringstar")]
    RingStar,
    #[serde(alias = "torus")]
    Torus,
}

fn default_router_ports() -> u8 {
    DEFAULT_ROUTER_PORTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsConfig {
    #[serde(default)]
    pub id: Option<AsId>,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default = "default_router_ports")]
    pub router_port_count: u8,
    #[serde(default)]
    pub topology_type: TopologyType,
    /// 租约服务器分配 IPv6 形式的地址
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,
    #[serde(default)]
    pub broken_routers: Vec<u32>,
    #[serde(default)]
    pub connect_to_as: Vec<AsLinkConfig>,
    /// 承载租约服务器的路由器；缺省为本 AS 中 id 最小的路由器
    #[serde(default)]
    pub dhcp_server: Option<u32>,
}

impl Default for AsConfig {
    fn default() -> Self {
        Self {
            id: None,
            node_count: None,
            router_port_count: DEFAULT_ROUTER_PORTS,
            topology_type: TopologyType::default(),
            ipv6: false,
            gateways: Vec::new(),
            broken_routers: Vec::new(),
            connect_to_as: Vec::new(),
            dhcp_server: None,
        }
    }
}

impl AsConfig {
    /// 检查必需字段，返回 `(id, node_count)`。`index` 仅用于错误信息。
    pub fn validate(&self, index: usize) -> Result<(AsId, u32)> {
        let id = self.id.ok_or(Error::MissingConfigKey {
            as_index: index,
            key: "id",
        })?;
        let node_count = self.node_count.ok_or(Error::MissingConfigKey {
            as_index: index,
            key: "node_count",
        })?;
        if node_count == 0 {
            return Err(Error::InvalidConfig(format!("AS {id}: node_count must be positive")));
        }
        if self.router_port_count == 0 {
            return Err(Error::InvalidConfig(format!(
                "AS {id}: router_port_count must be positive"
            )));
        }
        Ok((id, node_count))
    }
}

/// 网关路由器及挂在其下的用户（主机）id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub node: u32,
    #[serde(default)]
    pub users: Vec<i64>,
}

/// 与另一个 AS 的互联
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsLinkConfig {
    pub id: AsId,
    #[serde(default)]
    pub gateway_pairs: Vec<GatewayPair>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GatewayPair {
    /// 本 AS 的网关路由器
    pub gateway: u32,
    /// 对端 AS 的路由器
    pub connect_to: u32,
}
