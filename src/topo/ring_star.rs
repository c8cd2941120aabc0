//! RingStar 布线：id 最大的路由器作为中心，其余按 id 升序连成环，
//! 环上下标为偶数的路由器再各连一条辐条到中心。

use crate::net::NodeId;

/// RingStar 的绑定计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingStarPlan {
    pub hub: Option<NodeId>,
    pub ring: Vec<(NodeId, NodeId)>,
    pub spokes: Vec<(NodeId, NodeId)>,
}

pub fn ring_star_pairs(routers: &[NodeId]) -> RingStarPlan {
    let Some(&hub) = routers.iter().max() else {
        return RingStarPlan::default();
    };
    let mut ring_nodes: Vec<NodeId> = routers.iter().copied().filter(|&r| r != hub).collect();
    ring_nodes.sort();
    ring_nodes.dedup();

    let n = ring_nodes.len();
    // 两个节点时回绕边与正向边并行，各占一对端口；单个节点不成环
    let ring = (0..n)
        .map(|i| (ring_nodes[i], ring_nodes[(i + 1) % n]))
        .filter(|(a, b)| a != b)
        .collect();
    let spokes = ring_nodes
        .iter()
        .step_by(2)
        .map(|&r| (r, hub))
        .collect();

    RingStarPlan {
        hub: Some(hub),
        ring,
        spokes,
    }
}
