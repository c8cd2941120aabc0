//! 租约分配（DHCP 的简化版本）
//!
//! 每个自治系统一个 [`LeaseServer`]，由请求报文驱动分配，由时钟 tick 驱动回收。

mod lease;
mod network;
mod server;

pub use lease::{LEASE_DURATION_SECS, Lease, LeaseOutcome};
pub use server::LeaseServer;
