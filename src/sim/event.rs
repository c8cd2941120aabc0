//! 事件与世界接口
//!
//! 仿真器只认识这两个 trait：事件负责"做什么"，世界负责持有被修改的状态。

use super::simulator::Simulator;
use std::any::Any;

/// 可调度的仿真事件。执行时按值消费自身（`Box<Self>`），便于把数据包等所有权移交出去。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：事件执行时可访问的全部业务状态。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完毕后回调一次
    fn after_event(&mut self, _sim: &mut Simulator) {}
}
