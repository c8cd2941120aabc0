//! 单个自治系统的租约服务器
//!
//! 状态机：空闲 → 收到请求（分配或重发报价）→ 空闲；另有 tick 触发的回收。
//! 租约表在锁内修改，每个客户端、每个地址同一时刻至多一条租约。

use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::lease::{LEASE_DURATION_SECS, Lease, LeaseOutcome};
use crate::error::{Error, Result};
use crate::net::{AsId, NodeId, Payload};
use crate::topo::IdRange;

#[derive(Debug, Default)]
struct LeaseTable {
    now: u64,
    leases: Vec<Lease>,
}

#[derive(Debug)]
pub struct LeaseServer {
    as_id: AsId,
    prefix: String,
    ipv6: bool,
    range: IdRange,
    router: Option<NodeId>,
    lease_duration: u64,
    table: Mutex<LeaseTable>,
}

impl LeaseServer {
    pub fn new(as_id: AsId, prefix: impl Into<String>, range: IdRange) -> Self {
        Self {
            as_id,
            prefix: prefix.into(),
            ipv6: false,
            range,
            router: None,
            lease_duration: LEASE_DURATION_SECS,
            table: Mutex::new(LeaseTable::default()),
        }
    }

    /// 分配 IPv6 形式（IPv4 映射）的地址
    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    /// 报价从该路由器的所有已连接端口广播出去
    pub fn with_router(mut self, router: NodeId) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_lease_duration(mut self, secs: u64) -> Self {
        self.lease_duration = secs;
        self
    }

    pub fn as_id(&self) -> AsId {
        self.as_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn router(&self) -> Option<NodeId> {
        self.router
    }

    pub fn id_range(&self) -> &IdRange {
        &self.range
    }

    fn lock(&self) -> MutexGuard<'_, LeaseTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 服务器所见的当前时间（仿真秒）
    pub fn now(&self) -> u64 {
        self.lock().now
    }

    /// 租约表快照
    pub fn leases(&self) -> Vec<Lease> {
        self.lock().leases.clone()
    }

    pub fn lease_for(&self, client_id: u32) -> Option<Lease> {
        self.lock()
            .leases
            .iter()
            .find(|l| l.client_id == client_id)
            .cloned()
    }

    /// 为 `client_id` 计算应分配的地址
    pub fn address_for(&self, client_id: u32) -> Result<String> {
        let raw = format!("{}{}", self.prefix, client_id);
        if !self.ipv6 {
            return Ok(raw);
        }
        raw.parse::<Ipv4Addr>()
            .map(|v4| v4.to_ipv6_mapped().to_string())
            .map_err(|_| Error::Ipv6Conversion { address: raw })
    }

    /// 处理请求载荷 `DHCP_REQUEST:<clientId>`
    #[tracing::instrument(skip(self), fields(as_id = self.as_id))]
    pub fn handle_request(&self, payload: &str) -> Result<LeaseOutcome> {
        let client_id = match Payload::parse(payload)? {
            Payload::DhcpRequest { client_id } => client_id,
            _ => return Err(Error::MalformedPayload(payload.to_string())),
        };
        if !self.range.contains_client(client_id) {
            warn!(client_id, "客户端 id 不在本 AS 的分配区间内");
            return Err(Error::ClientOutOfRange {
                as_id: self.as_id,
                client_id,
            });
        }

        let mut t = self.lock();
        if let Some(existing) = t.leases.iter().find(|l| l.client_id == client_id) {
            debug!(client_id, address = %existing.ip_address, "已有租约，重发报价");
            return Ok(LeaseOutcome::Reoffered(existing.clone()));
        }

        let address = self.address_for(client_id).inspect_err(|err| {
            warn!(client_id, %err, "地址转换失败");
        })?;
        if let Some(holder) = t.leases.iter().find(|l| l.ip_address == address) {
            warn!(client_id, %address, holder = holder.client_id, "地址已被占用");
            return Err(Error::AddressInUse {
                address,
                holder: holder.client_id,
            });
        }

        let lease = Lease {
            ip_address: address,
            client_id,
            expiration_time: t.now.saturating_add(self.lease_duration),
        };
        t.leases.push(lease.clone());
        info!(client_id, address = %lease.ip_address, expires = lease.expiration_time, "📝 分配租约");
        Ok(LeaseOutcome::Assigned(lease))
    }

    /// 推进时间并回收所有到期租约，返回回收条数
    pub fn reclaim(&self, now: u64) -> usize {
        let mut t = self.lock();
        t.now = now;
        let before = t.leases.len();
        t.leases.retain(|l| {
            let expired = l.is_expired(now);
            if expired {
                info!(client_id = l.client_id, address = %l.ip_address, "♻️  回收租约");
            }
            !expired
        });
        before - t.leases.len()
    }
}
