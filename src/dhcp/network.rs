//! 租约服务器与网络的衔接：请求的接收、报价的广播、tick 回收。

use tracing::{debug, info, warn};

use super::lease::LeaseOutcome;
use super::server::LeaseServer;
use crate::error::{Error, ErrorKind, Result};
use crate::net::{AsId, Network, NodeId, Payload};
use crate::sim::Simulator;

impl Network {
    /// 注册某个 AS 的租约服务器（同一 AS 重复注册时替换）
    pub fn add_lease_server(&mut self, server: LeaseServer) {
        let as_id = server.as_id();
        info!(as_id, router = ?server.router(), "注册租约服务器");
        self.lease_servers.insert(as_id, server);
    }

    pub fn lease_server(&self, as_id: AsId) -> Option<&LeaseServer> {
        self.lease_servers.get(&as_id)
    }

    pub fn lease_servers(&self) -> impl Iterator<Item = &LeaseServer> {
        self.lease_servers.values()
    }

    /// `router` 是否承载 `as_id` 的租约服务器
    pub(crate) fn serves_leases(&self, as_id: AsId, router: NodeId) -> bool {
        self.lease_servers
            .get(&as_id)
            .is_some_and(|s| s.router() == Some(router))
    }

    /// 交给 `as_id` 的服务器处理一个请求载荷；成功时把报价从其路由器广播出去。
    ///
    /// 非法请求会被计数并丢弃，不会产生任何报文。
    #[tracing::instrument(skip(self, sim))]
    pub fn serve_lease_request(
        &mut self,
        as_id: AsId,
        payload: &str,
        sim: &mut Simulator,
    ) -> Result<LeaseOutcome> {
        let server = self
            .lease_servers
            .get(&as_id)
            .ok_or(Error::AsNotFound(as_id))?;
        let router = server.router();
        let outcome = match server.handle_request(payload) {
            Ok(o) => o,
            Err(err) => {
                if err.kind() == ErrorKind::Validation {
                    self.metrics().record_rejected();
                }
                warn!(%err, "租约请求被拒绝");
                return Err(err);
            }
        };

        let Some(router) = router else {
            warn!("租约服务器没有关联路由器，不广播报价");
            return Ok(outcome);
        };
        let Some(origin) = self.node(router).map(|n| n.address().to_string()) else {
            warn!(router = %router, "租约服务器关联的路由器不存在，不广播报价");
            return Ok(outcome);
        };
        let offer = self.make_packet(&outcome.lease().offer(), origin);
        let copies = self.forward_broadcast(router, offer, None, sim);
        debug!(copies, reoffer = !outcome.is_new(), "报价已广播");
        Ok(outcome)
    }

    /// 所有租约服务器推进到 `now_secs` 并回收过期租约
    pub fn reclaim_leases(&mut self, now_secs: u64) -> usize {
        self.lease_servers
            .values()
            .map(|s| s.reclaim(now_secs))
            .sum()
    }

    /// 主机发出租约请求
    pub fn request_lease(&mut self, host: NodeId, sim: &mut Simulator) -> Result<bool> {
        let node = self.node(host).ok_or(Error::NodeNotFound(host))?;
        if !node.is_host() {
            return Err(Error::NodeNotFound(host));
        }
        let origin = node.address().to_string();
        let pkt = self.make_packet(&Payload::DhcpRequest { client_id: host.0 }, origin);
        debug!(host = %host, pkt_id = pkt.id, "发出租约请求");
        self.inject(host, pkt, sim)
    }
}
