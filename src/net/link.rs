//! 链路（端口绑定）
//!
//! 一条绑定连接两个端口，双向各自独立计算发送占用，保证同一方向上的 FIFO。

use super::id::{NodeId, PortRef};
use crate::sim::SimTime;

/// 默认单向传播时延
pub const DEFAULT_LINK_LATENCY: SimTime = SimTime(10_000);
/// 发送一个报文占用链路的时间，也是等待周期的计量单位
pub const DEFAULT_TX_TIME: SimTime = SimTime(1_000);

#[derive(Debug, Clone)]
pub struct Link {
    pub a: PortRef,
    pub b: PortRef,
    pub latency: SimTime,
    pub tx_time: SimTime,
    // 两个方向的发送占用截止时间：[a->b, b->a]
    busy_until: [SimTime; 2],
}

/// 一次发送的排程结果
#[derive(Debug, Clone, Copy)]
pub(crate) struct Departure {
    pub arrive: SimTime,
    /// 排队等待的周期数
    pub waited_cycles: u64,
}

impl Link {
    pub fn new(a: PortRef, b: PortRef) -> Self {
        Self {
            a,
            b,
            latency: DEFAULT_LINK_LATENCY,
            tx_time: DEFAULT_TX_TIME,
            busy_until: [SimTime::ZERO; 2],
        }
    }

    /// 诊断用：两端所属节点
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a.node, self.b.node)
    }

    pub fn connects(&self, x: PortRef, y: PortRef) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn peer_of(&self, port: PortRef) -> Option<PortRef> {
        if port == self.a {
            Some(self.b)
        } else if port == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// 从 `from` 端在 `now` 发出一个报文，返回到达对端的时间
    pub(crate) fn depart(&mut self, from: PortRef, now: SimTime) -> Departure {
        let dir = usize::from(from != self.a);
        let start = now.max(self.busy_until[dir]);
        let depart = start.saturating_add(self.tx_time);
        self.busy_until[dir] = depart;

        let waited = start.saturating_sub(now);
        let waited_cycles = if self.tx_time.0 == 0 {
            0
        } else {
            waited.0.div_ceil(self.tx_time.0)
        };
        Departure {
            arrive: depart.saturating_add(self.latency),
            waited_cycles,
        }
    }
}
