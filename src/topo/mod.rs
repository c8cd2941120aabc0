//! 拓扑构建
//!
//! 每个 AS 由 [`TopologyBuilder`] 建出路由器、主机与内部连线，
//! 再由各自的 [`TopologyController`] 完成 AS 之间的互联。

mod autonomous;
mod builder;
mod id_range;
mod mesh;
mod ring_star;

pub use autonomous::{AutonomousSystem, TopologyController};
pub use builder::{TopologyBuilder, address_prefix};
pub use id_range::IdRange;
pub use mesh::{MESH_COLUMNS, grid_pairs};
pub use ring_star::{RingStarPlan, ring_star_pairs};

use crate::config::SimConfig;
use crate::net::Network;
use tracing::{error, info};

/// 按配置构建全部 AS 并完成互联。构建失败的 AS 被记录并略过。
pub fn build_internet(config: &SimConfig, net: &mut Network) -> Vec<AutonomousSystem> {
    let ranges = IdRange::compute(&config.autonomous_systems);
    let mut systems = Vec::with_capacity(config.autonomous_systems.len());

    for (index, as_cfg) in config.autonomous_systems.iter().enumerate() {
        let range = match as_cfg.id.and_then(|id| ranges.iter().find(|r| r.as_id == id)) {
            Some(r) => r.clone(),
            None => {
                let err = as_cfg.validate(index).err();
                error!(as_index = index, err = ?err, "AS 配置无效，中止该 AS 的构建");
                continue;
            }
        };
        match AutonomousSystem::build(index, as_cfg, range, net) {
            Ok(system) => systems.push(system),
            Err(err) => error!(as_index = index, %err, "AS 构建失败"),
        }
    }

    let mut inter = 0;
    for system in &systems {
        inter += system.controller().connect_to_other_as(&systems, net);
    }
    info!(systems = systems.len(), inter_as_links = inter, "互联网构建完成");
    systems
}
