//! 全局 id 空间划分
//!
//! 按配置顺序从 1 开始，为每个 AS 依次切出：
//! - 路由器段：`node_count` 个 id
//! - 主机段：`node_count * router_port_count` 个 id（所有路由器端口都接主机时的上限）
//! - Torus 扩展段：`MESH_COLUMNS` 个 id，仅 Torus 拓扑拥有
//!
//! 各段互不重叠。租约服务器据此判断请求的客户端 id 是否属于本 AS。

use std::ops::RangeInclusive;

use serde::Serialize;

use super::mesh::MESH_COLUMNS;
use crate::config::{AsConfig, TopologyType};
use crate::net::AsId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRange {
    pub as_id: AsId,
    pub router_start: u32,
    pub router_end: u32,
    pub host_start: u32,
    pub host_end: u32,
    pub extension: Option<(u32, u32)>,
}

impl IdRange {
    pub fn routers(&self) -> RangeInclusive<u32> {
        self.router_start..=self.router_end
    }

    pub fn hosts(&self) -> RangeInclusive<u32> {
        self.host_start..=self.host_end
    }

    pub fn router_count(&self) -> u32 {
        (self.router_end + 1).saturating_sub(self.router_start)
    }

    /// 客户端 id 是否落在主机段或扩展段
    pub fn contains_client(&self, id: u32) -> bool {
        self.hosts().contains(&id)
            || self
                .extension
                .is_some_and(|(lo, hi)| (lo..=hi).contains(&id))
    }

    /// 为所有配置计算 id 段。缺少必需字段的 AS 不占用 id 空间。
    pub fn compute(configs: &[AsConfig]) -> Vec<IdRange> {
        let mut out = Vec::with_capacity(configs.len());
        let mut cursor: u32 = 1;
        for (index, cfg) in configs.iter().enumerate() {
            let Ok((as_id, node_count)) = cfg.validate(index) else {
                continue;
            };
            let router_start = cursor;
            let router_end = router_start.saturating_add(node_count - 1);
            let host_width = node_count.saturating_mul(u32::from(cfg.router_port_count));
            let host_start = router_end.saturating_add(1);
            let host_end = host_start.saturating_add(host_width.saturating_sub(1));
            let mut last = host_end;
            let extension = (cfg.topology_type == TopologyType::Torus).then(|| {
                let lo = host_end.saturating_add(1);
                let hi = lo.saturating_add(MESH_COLUMNS as u32 - 1);
                last = hi;
                (lo, hi)
            });
            out.push(IdRange {
                as_id,
                router_start,
                router_end,
                host_start,
                host_end,
                extension,
            });
            cursor = last.saturating_add(1);
        }
        out
    }
}
