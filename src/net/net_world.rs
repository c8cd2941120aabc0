//! 网络仿真世界
//!
//! 持有网络、唯一的全局时钟和可选的流量发生器。时钟每个 tick 先回收过期租约，
//! 再生成并注入一批数据报文，顺序固定。

use super::network::Network;
use crate::sim::{EventClock, SimTime, Simulator, TickHandler, World};
use crate::traffic::DataGenerator;
use std::any::Any;
use tracing::debug;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub generator: Option<DataGenerator>,
    clock: EventClock,
}

impl NetWorld {
    pub fn new(net: Network) -> Self {
        Self {
            net,
            ..Self::default()
        }
    }

    pub fn clock_ref(&self) -> &EventClock {
        &self.clock
    }

    /// 启动全局时钟
    pub fn start_clock(&mut self, sim: &mut Simulator, interval: SimTime) -> bool {
        self.clock.start::<NetWorld>(sim, interval)
    }

    /// 停止全局时钟；结束仿真前必须调用，否则 tick 会一直被调度
    pub fn stop_clock(&mut self) -> bool {
        self.clock.stop()
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TickHandler for NetWorld {
    fn clock(&mut self) -> &mut EventClock {
        &mut self.clock
    }

    fn on_clock_tick(&mut self, sim: &mut Simulator, tick: u64) {
        let now_secs = sim.now().as_secs();
        let reclaimed = self.net.reclaim_leases(now_secs);
        self.net.rotate_control_history();

        let mut injected = 0usize;
        if let Some(generator) = self.generator.as_mut() {
            let batch = generator.generate_packets(&mut self.net);
            injected = self.net.inject_batch(batch, sim);
        }
        debug!(tick, now_secs, reclaimed, injected, "tick 完成");
    }
}
