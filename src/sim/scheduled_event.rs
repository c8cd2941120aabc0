//! 调度队列中的条目

use super::event::Event;
use super::time::SimTime;
use std::cmp::Ordering;

/// 队列条目：触发时间 + 入队序号 + 事件本体。
///
/// 同一时刻的事件按入队顺序执行，这保证了同一链路上的报文按 FIFO 到达。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    fn key(&self) -> (SimTime, u64) {
        (self.at, self.seq)
    }
}

// BinaryHeap 是大顶堆，这里反转比较以便最早的 (at, seq) 先出队。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}
