//! 全局事件时钟
//!
//! 整个仿真只有一个时钟实例，由世界持有并通过 [`TickHandler::clock`] 暴露，
//! 需要周期性工作的组件都由它驱动。每个 tick 的工作全部完成后才会调度下一个 tick，
//! 因此订阅者永远不会被并发调用。

use super::event::{Event, World};
use super::simulator::Simulator;
use super::time::SimTime;
use std::marker::PhantomData;
use tracing::{debug, info, trace, warn};

/// 时钟状态
#[derive(Debug, Default)]
pub struct EventClock {
    running: bool,
    interval: SimTime,
    ticks: u64,
    // 每次 start 递增；旧的 tick 链在 stop/start 之后自动失效
    generation: u64,
}

impl EventClock {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> SimTime {
        self.interval
    }

    /// 已触发的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 启动时钟。已在运行时为空操作并返回 `false`。
    ///
    /// `W` 是持有该时钟的世界类型，tick 事件执行时据此取回世界。
    pub fn start<W: TickHandler>(&mut self, sim: &mut Simulator, interval: SimTime) -> bool {
        if self.running {
            debug!("时钟已在运行，忽略 start");
            return false;
        }
        if interval == SimTime::ZERO {
            warn!("时钟间隔为 0，拒绝启动");
            return false;
        }
        self.running = true;
        self.interval = interval;
        self.generation = self.generation.wrapping_add(1);
        sim.schedule_in(interval, ClockTick::<W>::new(self.generation));
        info!(interval = %interval, "⏱️  时钟启动");
        true
    }

    /// 停止时钟：已调度的下一个 tick 到来时直接丢弃。未运行时为空操作并返回 `false`。
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!(ticks = self.ticks, "⏹️  时钟停止");
        true
    }
}

/// 由时钟驱动的世界
pub trait TickHandler: World + Sized {
    fn clock(&mut self) -> &mut EventClock;

    /// 单个 tick 的全部工作；`tick` 从 1 开始计数。
    fn on_clock_tick(&mut self, sim: &mut Simulator, tick: u64);
}

/// 事件：时钟走一格
pub struct ClockTick<W> {
    generation: u64,
    _world: PhantomData<fn() -> W>,
}

impl<W> ClockTick<W> {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            _world: PhantomData,
        }
    }
}

impl<W: TickHandler> Event for ClockTick<W> {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = world.as_any_mut().downcast_mut::<W>() else {
            warn!("ClockTick 投递到了不匹配的世界类型");
            return;
        };

        let clock = w.clock();
        if !clock.running || clock.generation != self.generation {
            trace!("时钟已停止或已重启，丢弃过期 tick");
            return;
        }
        clock.ticks += 1;
        let tick = clock.ticks;
        debug!(tick, now = %sim.now(), "⏱️  tick");

        w.on_clock_tick(sim, tick);

        // handler 可能在 tick 内部调用了 stop()
        let clock = w.clock();
        if clock.running && clock.generation == self.generation {
            let interval = clock.interval;
            sim.schedule_in(interval, ClockTick::<W>::new(self.generation));
        }
    }
}
