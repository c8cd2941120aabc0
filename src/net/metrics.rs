//! 全局统计
//!
//! 所有计数器放在同一把锁后面；派生指标在读取时按需计算，读取期间同样持锁。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::packet::Packet;

/// 等待周期的离群过滤区间（含两端）
pub const WAIT_INLIER_MIN: u64 = 0;
pub const WAIT_INLIER_MAX: u64 = 1000;

#[derive(Debug, Default)]
struct Counters {
    sent: u64,
    received: u64,
    dropped: u64,
    rejected: u64,
    total_hops: u64,
    router_usage: BTreeMap<String, u64>,
    wait_samples: Vec<u64>,
}

/// 线程安全的统计收集器，通常以 `Arc<Metrics>` 共享。
#[derive(Debug, Default)]
pub struct Metrics {
    inner: Mutex<Counters>,
}

/// 等待周期统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaitStats {
    pub samples: usize,
    pub total: u64,
    pub min: u64,
    pub max: u64,
    pub average: f64,
    /// 仅在过滤统计中有意义：被排除的离群样本数
    pub outliers: usize,
}

impl WaitStats {
    fn over<'a>(samples: impl Iterator<Item = &'a u64>) -> Self {
        let mut out = WaitStats {
            min: u64::MAX,
            ..WaitStats::default()
        };
        for &s in samples {
            out.samples += 1;
            out.total = out.total.saturating_add(s);
            out.min = out.min.min(s);
            out.max = out.max.max(s);
        }
        if out.samples == 0 {
            out.min = 0;
        } else {
            out.average = out.total as f64 / out.samples as f64;
        }
        out
    }
}

/// 某一时刻的统计快照
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
    pub rejected_control: u64,
    pub total_hops: u64,
    pub loss_rate: f64,
    pub average_hops: f64,
    pub wait_all: WaitStats,
    pub wait_filtered: WaitStats,
    pub most_used_router: Option<(String, u64)>,
    pub router_usage: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 源主机发出一个数据报文
    pub fn record_sent(&self) {
        self.lock().sent += 1;
    }

    /// 数据报文到达目的地：累计跳数与等待周期
    pub fn record_received(&self, pkt: &Packet) {
        let mut c = self.lock();
        c.received += 1;
        c.total_hops = c.total_hops.saturating_add(pkt.hops() as u64);
        c.wait_samples.push(pkt.wait_cycles);
    }

    pub fn record_dropped(&self) {
        self.lock().dropped += 1;
    }

    /// 非法控制报文被丢弃
    pub fn record_rejected(&self) {
        self.lock().rejected += 1;
    }

    pub fn record_router_usage(&self, address: &str) {
        let mut c = self.lock();
        *c.router_usage.entry(address.to_string()).or_insert(0) += 1;
    }

    pub fn sent(&self) -> u64 {
        self.lock().sent
    }

    pub fn received(&self) -> u64 {
        self.lock().received
    }

    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn rejected(&self) -> u64 {
        self.lock().rejected
    }

    /// 丢包率（百分比）；尚未发送时为 0
    pub fn loss_rate(&self) -> f64 {
        let c = self.lock();
        loss_rate(c.sent, c.received)
    }

    /// 平均跳数；尚未收到时为 0
    pub fn average_hops(&self) -> f64 {
        let c = self.lock();
        average_hops(c.total_hops, c.received)
    }

    pub fn most_used_router(&self) -> Option<(String, u64)> {
        most_used(&self.lock().router_usage)
    }

    pub fn report(&self) -> MetricsReport {
        let c = self.lock();
        let wait_all = WaitStats::over(c.wait_samples.iter());
        let mut wait_filtered = WaitStats::over(
            c.wait_samples
                .iter()
                .filter(|s| (WAIT_INLIER_MIN..=WAIT_INLIER_MAX).contains(*s)),
        );
        wait_filtered.outliers = wait_all.samples - wait_filtered.samples;
        MetricsReport {
            sent: c.sent,
            received: c.received,
            dropped: c.dropped,
            rejected_control: c.rejected,
            total_hops: c.total_hops,
            loss_rate: loss_rate(c.sent, c.received),
            average_hops: average_hops(c.total_hops, c.received),
            wait_all,
            wait_filtered,
            most_used_router: most_used(&c.router_usage),
            router_usage: c.router_usage.clone(),
        }
    }
}

fn loss_rate(sent: u64, received: u64) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    100.0 - received as f64 / sent as f64 * 100.0
}

fn average_hops(total_hops: u64, received: u64) -> f64 {
    if received == 0 {
        return 0.0;
    }
    total_hops as f64 / received as f64
}

// 计数相同时取地址字典序最小者，保证输出稳定
fn most_used(usage: &BTreeMap<String, u64>) -> Option<(String, u64)> {
    usage
        .iter()
        .fold(None::<(&String, u64)>, |best, (addr, &n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((addr, n)),
        })
        .map(|(addr, n)| (addr.clone(), n))
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== simulation metrics ===")?;
        writeln!(f, "sent={} received={} dropped={}", self.sent, self.received, self.dropped)?;
        writeln!(f, "rejected_control={}", self.rejected_control)?;
        writeln!(f, "loss_rate={:.2}%", self.loss_rate)?;
        writeln!(f, "average_hops={:.2} total_hops={}", self.average_hops, self.total_hops)?;
        for (label, w) in [("wait_all", &self.wait_all), ("wait_filtered", &self.wait_filtered)] {
            writeln!(
                f,
                "{label}: samples={} total={} min={} max={} avg={:.2}",
                w.samples, w.total, w.min, w.max, w.average
            )?;
        }
        writeln!(f, "wait_outliers={}", self.wait_filtered.outliers)?;
        match &self.most_used_router {
            Some((addr, n)) => writeln!(f, "most_used_router={addr} packets={n}"),
            None => writeln!(f, "most_used_router=none"),
        }
    }
}
