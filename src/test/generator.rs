use serde_json::json;

use crate::ErrorKind;
use crate::net::{Network, NodeId, Payload};
use crate::traffic::{DEFAULT_PACKETS_PER_SIMULATION, DataGenerator, TIME_SCALE};

fn two_hosts() -> Network {
    let mut net = Network::new();
    net.add_host(NodeId(5), 1, "192.168.100.5").expect("host");
    net.add_host(NodeId(6), 1, "192.168.100.6").expect("host");
    net
}

#[test]
fn loads_cover_every_slot_and_respect_the_cap() {
    let mut net = two_hosts();
    let mut g = DataGenerator::new(2.0, vec![NodeId(5), NodeId(6)], 7).expect("lambda");
    assert_eq!(g.num_samples(), DEFAULT_PACKETS_PER_SIMULATION);

    let batch = g.generate_packets(&mut net);
    assert_eq!(batch.loads.len(), TIME_SCALE);
    let total: u64 = batch.loads.iter().sum();
    assert!(total <= 150);
    assert_eq!(batch.packets.len() as u64, total);
}

#[test]
fn packets_go_to_a_different_sender() {
    let mut net = two_hosts();
    let mut g = DataGenerator::new(2.0, vec![NodeId(5), NodeId(6)], 11).expect("lambda");
    let batch = g.generate_packets(&mut net);
    assert!(!batch.packets.is_empty());

    for (sender, pkt) in &batch.packets {
        let origin = net.node(*sender).map(|n| n.address()).expect("sender");
        assert_eq!(pkt.origin(), Some(origin));
        let Ok(Payload::Data { dest, body }) = pkt.parsed() else {
            panic!("unexpected payload {}", pkt.payload);
        };
        assert_ne!(dest, origin);
        assert_eq!(body, format!("Hello from PC {}", sender.0));
        assert!(pkt.payload.starts_with("Data:192.168.100."));
    }
}

#[test]
fn small_cap_truncates_the_batch() {
    let mut net = two_hosts();
    let mut g = DataGenerator::new(5.0, vec![NodeId(5), NodeId(6)], 3).expect("lambda");
    g.set_num_samples(10);
    let batch = g.generate_packets(&mut net);
    assert_eq!(batch.loads.iter().sum::<u64>(), 10);
    assert_eq!(batch.packets.len(), 10);
}

#[test]
fn fewer_than_two_senders_produce_no_packets() {
    let mut net = two_hosts();
    let mut g = DataGenerator::new(2.0, vec![NodeId(5)], 1).expect("lambda");
    let batch = g.generate_packets(&mut net);
    assert_eq!(batch.loads.len(), TIME_SCALE);
    assert!(batch.packets.is_empty());

    // 不存在的节点不算发送方
    let mut g = DataGenerator::new(2.0, vec![NodeId(5), NodeId(42)], 1).expect("lambda");
    assert!(g.generate_packets(&mut net).packets.is_empty());
}

#[test]
fn same_seed_gives_same_loads() {
    let mut a = DataGenerator::new(2.0, Vec::new(), 99).expect("lambda");
    let mut b = DataGenerator::new(2.0, Vec::new(), 99).expect("lambda");
    assert_eq!(a.sample_loads(), b.sample_loads());
}

#[test]
fn packets_per_simulation_falls_back_to_default() {
    let mut g = DataGenerator::new(2.0, Vec::new(), 0).expect("lambda");
    assert_eq!(g.load_config(Some(&json!(40))), 40);
    assert_eq!(g.load_config(Some(&json!("lots"))), DEFAULT_PACKETS_PER_SIMULATION);
    assert_eq!(g.load_config(Some(&json!(-3))), DEFAULT_PACKETS_PER_SIMULATION);
    assert_eq!(g.load_config(Some(&json!(2.5))), DEFAULT_PACKETS_PER_SIMULATION);
    assert_eq!(g.load_config(None), DEFAULT_PACKETS_PER_SIMULATION);
    assert_eq!(g.num_samples(), DEFAULT_PACKETS_PER_SIMULATION);
}

#[test]
fn invalid_lambda_is_a_config_error() {
    for lambda in [0.0, -1.0] {
        let err = DataGenerator::new(lambda, Vec::new(), 0).expect_err("lambda");
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
