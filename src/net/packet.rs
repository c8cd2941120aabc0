//! 数据包
//!
//! 报文载荷是以 `:` 分隔的文本，三种形式：
//! - `Data:<目的地址>:<正文>`
//! - `DHCP_REQUEST:<客户端 id>`
//! - `DHCP_OFFER:<地址>:<客户端 id>`
//!
//! 地址可能是 IPv6（本身含 `:`），所以解析时从两端切分而不是简单 split。

use crate::error::{Error, Result};

/// 默认跳数上限
pub const DEFAULT_TTL: u32 = 10;

const DATA_TAG: &str = "Data";
const REQUEST_TAG: &str = "DHCP_REQUEST";
const OFFER_TAG: &str = "DHCP_OFFER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Control,
}

/// 解析后的载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Data { dest: String, body: String },
    DhcpRequest { client_id: u32 },
    DhcpOffer { address: String, client_id: u32 },
}

impl Payload {
    /// 载荷对应的报文类型
    pub fn kind(&self) -> PacketKind {
        match self {
            Payload::Data { .. } => PacketKind::Data,
            Payload::DhcpRequest { .. } | Payload::DhcpOffer { .. } => PacketKind::Control,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Payload::Data { dest, body } => format!("{DATA_TAG}:{dest}:{body}"),
            Payload::DhcpRequest { client_id } => format!("{REQUEST_TAG}:{client_id}"),
            Payload::DhcpOffer { address, client_id } => {
                format!("{OFFER_TAG}:{address}:{client_id}")
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Payload> {
        let malformed = || Error::MalformedPayload(raw.to_string());
        let (tag, rest) = raw.split_once(':').ok_or_else(malformed)?;
        match tag {
            REQUEST_TAG => {
                // 字段数必须恰好为 2
                if rest.contains(':') {
                    return Err(malformed());
                }
                let client_id = rest.trim().parse().map_err(|_| malformed())?;
                Ok(Payload::DhcpRequest { client_id })
            }
            OFFER_TAG => {
                let (address, id) = rest.rsplit_once(':').ok_or_else(malformed)?;
                if address.is_empty() {
                    return Err(malformed());
                }
                let client_id = id.trim().parse().map_err(|_| malformed())?;
                Ok(Payload::DhcpOffer {
                    address: address.to_string(),
                    client_id,
                })
            }
            DATA_TAG => {
                // 正文可能含 `:`，目的地址可能是 IPv6：以 IPv4 形式优先切出地址
                let (dest, body) = split_data(rest).ok_or_else(malformed)?;
                Ok(Payload::Data {
                    dest: dest.to_string(),
                    body: body.to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }
}

fn split_data(rest: &str) -> Option<(&str, &str)> {
    // 先尝试最长的、能被解析为 IP 地址的前缀
    let mut best = None;
    for (idx, _) in rest.match_indices(':') {
        let candidate = &rest[..idx];
        if candidate.parse::<std::net::IpAddr>().is_ok() {
            best = Some(idx);
        }
    }
    let idx = best.or_else(|| rest.find(':'))?;
    let (dest, body) = (&rest[..idx], &rest[idx + 1..]);
    if dest.is_empty() {
        return None;
    }
    Some((dest, body))
}

/// 网络数据包
///
/// 创建后只有轨迹和计数字段会变化：`path`、`ttl`、等待计数与 `dropped`。
/// 广播扇出产生的副本共享同一个 `id`。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub kind: PacketKind,
    pub payload: String,
    /// 途经节点的地址，首项为源地址
    pub path: Vec<String>,
    pub ttl: u32,
    /// 在链路上排队等待的周期数（1 周期 = 链路发送一个报文的时间）
    pub wait_cycles: u64,
    /// 发送时遇到链路忙的跳数
    pub queue_wait_cycles: u64,
    pub dropped: bool,
}

impl Packet {
    pub fn new(id: u64, payload: &Payload, origin: impl Into<String>) -> Self {
        Self {
            id,
            kind: payload.kind(),
            payload: payload.encode(),
            path: vec![origin.into()],
            ttl: DEFAULT_TTL,
            wait_cycles: 0,
            queue_wait_cycles: 0,
            dropped: false,
        }
    }

    /// 解析载荷
    pub fn parsed(&self) -> Result<Payload> {
        Payload::parse(&self.payload)
    }

    /// 已成功转发的跳数
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn origin(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// 消耗一跳。TTL 已耗尽时返回 `false`，此时报文必须被丢弃。
    pub fn take_hop(&mut self) -> bool {
        if self.ttl == 0 {
            return false;
        }
        self.ttl -= 1;
        true
    }
}
