//! 仿真核心模块
//!
//! 事件驱动引擎：仿真时间、事件队列，以及驱动周期性工作的全局时钟。

mod clock;
mod event;
mod scheduled_event;
mod simulator;
mod time;

pub use clock::{ClockTick, EventClock, TickHandler};
pub use event::{Event, World};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
