//! 离散事件仿真器
//!
//! 维护当前时间与按 `(时间, 序号)` 排序的事件堆；单线程逐个执行，事件之间不会重叠。

use super::event::{Event, World};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    executed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 累计已执行的事件数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 在绝对时间 `at` 调度事件；早于当前时间的请求按当前时间处理。
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), at = %at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
        trace!(seq, queue_size = self.q.len(), "事件入队");
    }

    /// 在当前时间之后 `delay` 调度事件
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    fn step(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.now = item.at;
        self.executed = self.executed.wrapping_add(1);
        item.ev.execute(self, world);
        world.after_event(self);
    }

    /// 执行所有不晚于 `until` 的事件，最后把时间推进到 `until`。
    #[tracing::instrument(skip(self, world), fields(until = %until))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        debug!(now = %self.now, queue_size = self.q.len(), "开始推进");
        while self.q.peek().is_some_and(|top| top.at <= until) {
            if let Some(item) = self.q.pop() {
                self.step(item, world);
            }
        }
        self.now = self.now.max(until);
        info!(now = %self.now, executed = self.executed, remaining = self.q.len(), "推进完成");
    }

    /// 执行直到事件队列为空。周期性时钟运行时队列永不为空，应改用 [`Simulator::run_until`]。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        while let Some(item) = self.q.pop() {
            self.step(item, world);
        }
        info!(executed = self.executed, final_time = %self.now, "✅ 仿真完成");
    }
}
