//! MAC 地址
//!
//! 仿真中的每个端口都有一个全局唯一的 MAC。地址由 [`MacAllocator`] 顺序分配，
//! 使用本地管理位（`02:` 前缀），外部提供的地址需先通过格式校验再登记。

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    /// 只接受 `aa:bb:cc:dd:ee:ff`（大小写均可）
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidMac(s.to_string());
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for byte in out.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddr(out))
    }
}

/// 全局 MAC 分配器
#[derive(Debug, Default)]
pub struct MacAllocator {
    next: u64,
    used: HashSet<MacAddr>,
}

impl MacAllocator {
    /// 分配一个尚未使用的地址
    pub fn allocate(&mut self) -> MacAddr {
        loop {
            self.next = self.next.wrapping_add(1);
            let n = self.next.to_be_bytes();
            let mac = MacAddr([0x02, n[3], n[4], n[5], n[6], n[7]]);
            if self.used.insert(mac) {
                return mac;
            }
        }
    }

    /// 登记外部指定的地址；重复登记视为冲突
    pub fn register(&mut self, raw: &str) -> Result<MacAddr> {
        let mac: MacAddr = raw.parse()?;
        if !self.used.insert(mac) {
            return Err(Error::DuplicateMac(mac.to_string()));
        }
        Ok(mac)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
