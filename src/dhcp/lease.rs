//! 租约记录

use serde::Serialize;

use crate::net::Payload;

/// 租期（仿真秒）
pub const LEASE_DURATION_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lease {
    pub ip_address: String,
    pub client_id: u32,
    /// 到期时间（仿真秒）；`now >= expiration_time` 时被回收
    pub expiration_time: u64,
}

impl Lease {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration_time <= now
    }

    /// 对应的报价载荷
    pub fn offer(&self) -> Payload {
        Payload::DhcpOffer {
            address: self.ip_address.clone(),
            client_id: self.client_id,
        }
    }
}

/// 一次请求的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// 新分配
    Assigned(Lease),
    /// 客户端已有租约，重发原报价
    Reoffered(Lease),
}

impl LeaseOutcome {
    pub fn lease(&self) -> &Lease {
        match self {
            LeaseOutcome::Assigned(l) | LeaseOutcome::Reoffered(l) => l,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, LeaseOutcome::Assigned(_))
    }
}
