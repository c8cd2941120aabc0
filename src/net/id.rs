//! 标识符类型
//!
//! 节点 id 来自配置并全局唯一；端口号在所属节点内从 1 开始编号。

use std::fmt;

/// 节点标识符（全局唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// 链路（绑定）标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 自治系统编号
pub type AsId = u32;

/// 指向某节点某端口的引用。端口之间只通过它互相指向，不持有对方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: u8,
}

impl PortRef {
    pub fn new(node: NodeId, port: u8) -> Self {
        Self { node, port }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/p{}", self.node, self.port)
    }
}
