//! 错误类型
//!
//! 所有可恢复错误统一为 [`Error`]，并按处理方式归为四类（见 [`ErrorKind`]）。

use thiserror::Error;

use crate::net::{NodeId, PortRef};

/// 错误类别：决定调用方如何处置该错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 配置缺失或非法：仅中止受影响 AS 的构建
    Config,
    /// 报文/标识非法：丢弃、计数、记录日志
    Validation,
    /// 资源冲突（端口已绑定、地址已租出）：操作为空操作，原状态保留
    ResourceConflict,
    /// 引用了不存在的 AS/路由器/端口：跳过并继续
    NotFound,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("AS #{as_index}: missing required config key `{key}`")]
    MissingConfigKey { as_index: usize, key: &'static str },
    #[error("AS {as_id}: router id range {start}..={end} does not match node_count {node_count}")]
    RouterRangeMismatch {
        as_id: u32,
        start: u32,
        end: u32,
        node_count: u32,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("malformed payload: {0:?}")]
    MalformedPayload(String),
    #[error("client id {client_id} is outside the id bands of AS {as_id}")]
    ClientOutOfRange { as_id: u32, client_id: u32 },
    #[error("cannot convert {address} to an IPv6 address")]
    Ipv6Conversion { address: String },
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),
    #[error("invalid user id {0}")]
    InvalidUserId(i64),

    #[error("port {0} is already bound")]
    PortAlreadyBound(PortRef),
    #[error("cannot bind port {0} to itself")]
    SelfBinding(PortRef),
    #[error("ports {0} and {1} are not bound to each other")]
    NotBound(PortRef, PortRef),
    #[error("node {0:?} has no free port")]
    NoFreePort(NodeId),
    #[error("address {address} is already leased to client {holder}")]
    AddressInUse { address: String, holder: u32 },
    #[error("MAC address {0} is already registered")]
    DuplicateMac(String),
    #[error("node {0:?} already exists")]
    DuplicateNode(NodeId),

    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),
    #[error("port {0} not found")]
    PortNotFound(PortRef),
    #[error("autonomous system {0} not found")]
    AsNotFound(u32),
}

impl Error {
    /// 错误所属类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingConfigKey { .. }
            | Error::RouterRangeMismatch { .. }
            | Error::InvalidConfig(_)
            | Error::ConfigParse(_)
            | Error::ConfigIo(_) => ErrorKind::Config,
            Error::MalformedPayload(_)
            | Error::ClientOutOfRange { .. }
            | Error::Ipv6Conversion { .. }
            | Error::InvalidMac(_)
            | Error::InvalidUserId(_) => ErrorKind::Validation,
            Error::PortAlreadyBound(_)
            | Error::SelfBinding(_)
            | Error::NotBound(_, _)
            | Error::NoFreePort(_)
            | Error::AddressInUse { .. }
            | Error::DuplicateMac(_)
            | Error::DuplicateNode(_) => ErrorKind::ResourceConflict,
            Error::NodeNotFound(_) | Error::PortNotFound(_) | Error::AsNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
