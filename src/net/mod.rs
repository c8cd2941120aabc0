//! 网络模拟模块
//!
//! 节点、端口、链路绑定、数据包、广播、转发表边界与全局统计。

mod broadcast;
mod deliver_packet;
mod id;
mod link;
mod mac;
mod metrics;
mod net_world;
mod network;
mod node;
mod packet;
mod port;
mod routing;

pub use deliver_packet::DeliverPacket;
pub use id::{AsId, LinkId, NodeId, PortRef};
pub use link::{DEFAULT_LINK_LATENCY, DEFAULT_TX_TIME, Link};
pub use mac::{MacAddr, MacAllocator};
pub use metrics::{Metrics, MetricsReport, WAIT_INLIER_MAX, WAIT_INLIER_MIN, WaitStats};
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{DEFAULT_ROUTER_PORTS, HostState, Node, NodeKind, RouterState};
pub use packet::{DEFAULT_TTL, Packet, PacketKind, Payload};
pub use port::Port;
pub use routing::{Route, RoutingEngine, RoutingProtocol, RoutingTable, ShortestPathEngine};
