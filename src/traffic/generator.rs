//! 泊松到达的数据发生器
//!
//! 每批把时间切成 `TIME_SCALE` 个槽，按 Poisson(`lambda`) 抽取每个槽的到达数，
//! 总数不超过 `num_samples`。每次到达随机选一个发送方和一个不同的目的地址。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::net::{Network, NodeId, Packet, Payload};
use crate::sim::Simulator;

/// `packets_per_simulation` 缺失或非法时的默认值
pub const DEFAULT_PACKETS_PER_SIMULATION: u64 = 150;
/// 每批的时间槽数
pub const TIME_SCALE: usize = 100;

/// 一批生成结果：每个时间槽的到达数，以及 `(发送方, 报文)` 列表
#[derive(Debug, Clone, Default)]
pub struct TrafficBatch {
    pub loads: Vec<u64>,
    pub packets: Vec<(NodeId, Packet)>,
}

#[derive(Debug)]
pub struct DataGenerator {
    lambda: f64,
    num_samples: u64,
    time_scale: usize,
    senders: Vec<NodeId>,
    poisson: Poisson<f64>,
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(lambda: f64, senders: Vec<NodeId>, seed: u64) -> Result<Self> {
        let poisson = Poisson::new(lambda)
            .map_err(|err| Error::InvalidConfig(format!("lambda {lambda}: {err}")))?;
        Ok(Self {
            lambda,
            num_samples: DEFAULT_PACKETS_PER_SIMULATION,
            time_scale: TIME_SCALE,
            senders,
            poisson,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    pub fn senders(&self) -> &[NodeId] {
        &self.senders
    }

    pub fn set_num_samples(&mut self, n: u64) {
        self.num_samples = n;
    }

    /// 读取 `packets_per_simulation`；缺失或不是非负整数时回退到默认值
    pub fn load_config(&mut self, value: Option<&serde_json::Value>) -> u64 {
        self.num_samples = match value {
            None => DEFAULT_PACKETS_PER_SIMULATION,
            Some(v) => v.as_u64().unwrap_or_else(|| {
                warn!(value = %v, default = DEFAULT_PACKETS_PER_SIMULATION, "packets_per_simulation 非法，使用默认值");
                DEFAULT_PACKETS_PER_SIMULATION
            }),
        };
        self.num_samples
    }

    /// 每个时间槽的到达数，总和不超过 `num_samples`
    pub fn sample_loads(&mut self) -> Vec<u64> {
        let mut remaining = self.num_samples;
        let mut loads = Vec::with_capacity(self.time_scale);
        for _ in 0..self.time_scale {
            let draw = self.poisson.sample(&mut self.rng) as u64;
            let n = draw.min(remaining);
            remaining -= n;
            loads.push(n);
        }
        loads
    }

    /// 生成一批数据报文。发送方不足两个时只返回负载，不生成报文。
    pub fn generate_packets(&mut self, net: &mut Network) -> TrafficBatch {
        let loads = self.sample_loads();
        let total: u64 = loads.iter().sum();

        let senders: Vec<(NodeId, String)> = self
            .senders
            .iter()
            .filter_map(|&id| net.node(id).map(|n| (id, n.address().to_string())))
            .collect();
        if senders.len() < 2 {
            debug!(senders = senders.len(), "发送方不足两个，跳过生成");
            return TrafficBatch {
                loads,
                packets: Vec::new(),
            };
        }

        let mut packets = Vec::with_capacity(total as usize);
        for _ in 0..total {
            let from = self.rng.gen_range(0..senders.len());
            // 在其余发送方中均匀选择目的地
            let mut to = self.rng.gen_range(0..senders.len() - 1);
            if to >= from {
                to += 1;
            }
            let (sender, origin) = (senders[from].0, senders[from].1.clone());
            let payload = Payload::Data {
                dest: senders[to].1.clone(),
                body: format!("Hello from PC {}", sender.0),
            };
            let pkt = net.make_packet(&payload, origin);
            packets.push((sender, pkt));
        }
        debug!(generated = packets.len(), "生成一批数据报文");
        TrafficBatch { loads, packets }
    }
}

impl Network {
    /// 注入一整批报文，返回成功发出的数量
    pub fn inject_batch(&mut self, batch: TrafficBatch, sim: &mut Simulator) -> usize {
        let mut sent = 0;
        for (sender, pkt) in batch.packets {
            match self.inject(sender, pkt, sim) {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(err) => warn!(sender = %sender, %err, "注入失败"),
            }
        }
        sent
    }
}
