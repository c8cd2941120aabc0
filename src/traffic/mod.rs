//! 合成流量

mod generator;

pub use generator::{DEFAULT_PACKETS_PER_SIMULATION, DataGenerator, TIME_SCALE, TrafficBatch};
