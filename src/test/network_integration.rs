use crate::config::SimConfig;
use crate::net::{
    NetWorld, Network, NodeId, Payload, RouterState, RoutingProtocol, ShortestPathEngine,
};
use crate::sim::{SimTime, Simulator};
use crate::topo::build_internet;
use crate::traffic::DataGenerator;

/// 主机 10 - 路由器 1..=4 串联 - 主机 11，全部在 AS 1
fn line() -> NetWorld {
    let mut net = Network::new();
    for id in 1..=4 {
        net.add_router(NodeId(id), 1, format!("192.168.100.{id}"), 4)
            .expect("router");
    }
    net.add_host(NodeId(10), 1, "192.168.100.10").expect("host");
    net.add_host(NodeId(11), 1, "192.168.100.11").expect("host");
    net.bind_nodes(NodeId(10), NodeId(1)).expect("bind");
    for id in 1..4 {
        net.bind_nodes(NodeId(id), NodeId(id + 1)).expect("bind");
    }
    net.bind_nodes(NodeId(4), NodeId(11)).expect("bind");
    for id in 1..=4 {
        net.enable_protocol(NodeId(id), RoutingProtocol::Ospf, &mut ShortestPathEngine)
            .expect("router");
    }
    NetWorld::new(net)
}

fn data(to: &str) -> Payload {
    Payload::Data {
        dest: to.to_string(),
        body: "Hello from PC 10".to_string(),
    }
}

#[test]
fn data_is_forwarded_hop_by_hop_to_the_destination_host() {
    let mut world = line();
    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(&data("192.168.100.11"), "192.168.100.10");
    assert!(world.net.inject(NodeId(10), pkt, &mut sim).expect("host"));
    sim.run(&mut world);

    let m = world.net.metrics();
    assert_eq!((m.sent(), m.received(), m.dropped()), (1, 1, 0));
    // 5 次发送，轨迹 6 项
    assert!((m.average_hops() - 5.0).abs() < 1e-9);
    let usage = m.report().router_usage;
    for id in 1..=4 {
        assert_eq!(usage.get(&format!("192.168.100.{id}")), Some(&1));
    }
}

#[test]
fn ttl_exhaustion_drops_the_packet() {
    let mut world = line();
    let mut sim = Simulator::default();
    let mut pkt = world.net.make_packet(&data("192.168.100.11"), "192.168.100.10");
    pkt.ttl = 3;
    world.net.inject(NodeId(10), pkt, &mut sim).expect("host");
    sim.run(&mut world);

    let m = world.net.metrics();
    assert_eq!((m.sent(), m.received(), m.dropped()), (1, 0, 1));
    assert!((m.loss_rate() - 100.0).abs() < 1e-9);
    // 第三台路由器已收到，但无法再发出
    let usage = m.report().router_usage;
    assert_eq!(usage.get("192.168.100.3"), Some(&1));
    assert_eq!(usage.get("192.168.100.4"), None);
}

#[test]
fn ttl_exactly_sufficient_is_delivered() {
    let mut world = line();
    let mut sim = Simulator::default();
    let mut pkt = world.net.make_packet(&data("192.168.100.11"), "192.168.100.10");
    pkt.ttl = 5;
    world.net.inject(NodeId(10), pkt, &mut sim).expect("host");
    sim.run(&mut world);
    assert_eq!(world.net.metrics().received(), 1);
}

#[test]
fn back_to_back_packets_queue_on_the_first_link() {
    let mut world = line();
    let mut sim = Simulator::default();
    for _ in 0..3 {
        let pkt = world.net.make_packet(&data("192.168.100.11"), "192.168.100.10");
        world.net.inject(NodeId(10), pkt, &mut sim).expect("host");
    }
    sim.run(&mut world);

    let report = world.net.metrics().report();
    assert_eq!(report.received, 3);
    assert_eq!(report.wait_all.samples, 3);
    assert_eq!(report.wait_all.total, 3);
    assert_eq!((report.wait_all.min, report.wait_all.max), (0, 2));
}

#[test]
fn host_drops_data_for_another_address() {
    let mut world = line();
    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(&data("192.168.100.77"), "192.168.100.4");
    let to_host = world
        .net
        .node(NodeId(4))
        .and_then(|n| n.connected_ports().find(|p| p.peer().map(|q| q.node) == Some(NodeId(11))))
        .map(|p| p.port_ref())
        .expect("port");
    assert!(world.net.send(to_host, pkt, &mut sim));
    sim.run(&mut world);
    assert_eq!(world.net.metrics().dropped(), 1);
    assert_eq!(world.net.metrics().received(), 0);
}

#[test]
fn unroutable_data_is_dropped_at_the_router() {
    let mut world = line();
    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(&data("10.9.9.9"), "192.168.100.10");
    world.net.inject(NodeId(10), pkt, &mut sim).expect("host");
    sim.run(&mut world);
    assert_eq!(world.net.metrics().dropped(), 1);
    assert_eq!(world.net.metrics().report().router_usage.len(), 1);
}

#[test]
fn malformed_payload_is_rejected_not_forwarded() {
    let mut world = line();
    let mut sim = Simulator::default();
    let mut pkt = world.net.make_packet(&data("192.168.100.11"), "192.168.100.10");
    pkt.payload = "garbage".to_string();
    world.net.inject(NodeId(10), pkt, &mut sim).expect("host");
    sim.run(&mut world);
    assert_eq!(world.net.metrics().rejected(), 1);
    assert_eq!(world.net.metrics().received(), 0);
    let r2 = world.net.node(NodeId(2)).and_then(|n| n.port(1)).expect("port");
    assert_eq!(r2.received_count(), 0);
}

#[test]
fn addresses_that_are_not_ips_are_still_routed() {
    let mut net = Network::new();
    for id in [1, 280, 3] {
        net.add_router(NodeId(id), 1, format!("192.168.100.{id}"), 4)
            .expect("router");
    }
    net.add_host(NodeId(51), 1, "192.168.100.51").expect("host");
    net.add_host(NodeId(300), 1, "192.168.100.300").expect("host");
    net.bind_nodes(NodeId(51), NodeId(1)).expect("bind");
    net.bind_nodes(NodeId(1), NodeId(280)).expect("bind");
    net.bind_nodes(NodeId(280), NodeId(3)).expect("bind");
    net.bind_nodes(NodeId(3), NodeId(300)).expect("bind");
    for id in [1, 280, 3] {
        net.enable_protocol(NodeId(id), RoutingProtocol::Ospf, &mut ShortestPathEngine)
            .expect("router");
    }
    let mut world = NetWorld::new(net);
    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(&data("192.168.100.300"), "192.168.100.51");
    world.net.inject(NodeId(51), pkt, &mut sim).expect("host");
    let back = world.net.make_packet(&data("192.168.100.51"), "192.168.100.300");
    world.net.inject(NodeId(300), back, &mut sim).expect("host");
    sim.run(&mut world);

    let m = world.net.metrics();
    assert_eq!((m.sent(), m.received(), m.dropped()), (2, 2, 0));
    assert_eq!(m.report().router_usage.get("192.168.100.280"), Some(&2));
}

#[test]
fn control_history_forgets_ids_after_two_rotations() {
    let mut state = RouterState::default();
    assert!(state.first_sighting(7));
    assert!(!state.first_sighting(7));

    state.rotate_control_history();
    assert!(!state.first_sighting(7), "previous generation still suppresses");
    assert_eq!(state.control_history_len(), 1);

    state.rotate_control_history();
    assert_eq!(state.control_history_len(), 0);
    assert!(state.first_sighting(7));
}

#[test]
fn clock_tick_bounds_the_control_history() {
    let mut world = line();
    let mut sim = Simulator::default();
    world.net.request_lease(NodeId(10), &mut sim).expect("host");
    sim.run(&mut world);
    let history = |world: &NetWorld| -> usize {
        world
            .net
            .routers()
            .filter_map(|n| n.as_router())
            .map(|r| r.control_history_len())
            .sum()
    };
    assert_eq!(history(&world), 4);

    world.start_clock(&mut sim, SimTime::from_secs(2));
    sim.run_until(SimTime::from_secs(5), &mut world);
    world.stop_clock();
    sim.run(&mut world);
    assert_eq!(world.clock_ref().ticks(), 2);
    assert_eq!(history(&world), 0);
}

const TWO_SYSTEMS: &str = r#"{
  "autonomous_systems": [
    {
      "id": 1,
      "node_count": 4,
      "gateways": [{ "node": 1, "users": [5] }],
      "connect_to_as": [{ "id": 2, "gateway_pairs": [{ "gateway": 4, "connect_to": 29 }] }]
    },
    {
      "id": 2,
      "node_count": 4,
      "gateways": [{ "node": 32, "users": [33] }]
    }
  ]
}"#;

fn internet() -> NetWorld {
    let cfg = SimConfig::from_json(TWO_SYSTEMS).expect("parse");
    let mut world = NetWorld::new(Network::new());
    let systems = build_internet(&cfg, &mut world.net);
    assert_eq!(systems.len(), 2);
    let routers: Vec<NodeId> = world.net.routers().map(|n| n.id()).collect();
    for r in routers {
        world
            .net
            .enable_protocol(r, RoutingProtocol::Ospf, &mut ShortestPathEngine)
            .expect("router");
    }
    world
}

#[test]
fn data_crosses_autonomous_systems_through_the_gateway() {
    let mut world = internet();
    let mut sim = Simulator::default();
    let pkt = world
        .net
        .make_packet(&data("192.168.101.33"), "192.168.100.5");
    world.net.inject(NodeId(5), pkt, &mut sim).expect("host");
    sim.run(&mut world);

    let m = world.net.metrics();
    assert_eq!(m.received(), 1);
    // 5 -> 1 -> 2 -> 3 -> 4 -> 29 -> 30 -> 31 -> 32 -> 33
    assert!((m.average_hops() - 9.0).abs() < 1e-9);
}

#[test]
fn lease_requests_stay_inside_their_system() {
    let mut world = internet();
    let mut sim = Simulator::default();
    world.net.request_lease(NodeId(5), &mut sim).expect("host");
    world.net.request_lease(NodeId(33), &mut sim).expect("host");
    sim.run(&mut world);

    assert_eq!(world.net.metrics().rejected(), 0);
    for (as_id, host, address) in [(1, 5, "192.168.100.5"), (2, 33, "192.168.101.33")] {
        let server = world.net.lease_server(as_id).expect("server");
        assert_eq!(server.leases().len(), 1);
        assert_eq!(server.lease_for(host).map(|l| l.ip_address), Some(address.to_string()));
        let leased = world
            .net
            .node(NodeId(host))
            .and_then(|n| n.as_host())
            .and_then(|h| h.leased_address());
        assert_eq!(leased, Some(address));
    }
    // 请求只在本 AS 内泛洪，否则另一 AS 的服务器会以越界拒绝
    let usage = world.net.metrics().report().router_usage;
    assert!(usage.keys().any(|a| a.starts_with("192.168.101.")));
    assert!(usage.keys().any(|a| a.starts_with("192.168.100.")));
}

#[test]
fn clock_tick_reclaims_then_generates_traffic() {
    let mut world = internet();
    let mut sim = Simulator::default();
    world.net.request_lease(NodeId(5), &mut sim).expect("host");
    let mut generator =
        DataGenerator::new(2.0, vec![NodeId(5), NodeId(33)], 5).expect("lambda");
    generator.set_num_samples(20);
    world.generator = Some(generator);

    world.start_clock(&mut sim, SimTime::from_secs(300));
    sim.run_until(SimTime::from_secs(300), &mut world);
    world.stop_clock();
    sim.run(&mut world);

    assert_eq!(world.clock_ref().ticks(), 1);
    assert!(world.net.lease_server(1).and_then(|s| s.lease_for(5)).is_none());
    let m = world.net.metrics();
    assert_eq!(m.sent(), 20);
    assert_eq!(m.received(), 20);
}

const IPV6_SYSTEM: &str = r#"{
  "autonomous_systems": [
    {
      "id": 1,
      "node_count": 4,
      "ipv6": true,
      "gateways": [{ "node": 1, "users": [5] }, { "node": 4, "users": [6] }]
    }
  ]
}"#;

#[test]
fn leased_ipv6_hosts_stay_reachable() {
    let cfg = SimConfig::from_json(IPV6_SYSTEM).expect("parse");
    let mut world = NetWorld::new(Network::new());
    assert_eq!(build_internet(&cfg, &mut world.net).len(), 1);
    for r in 1..=4 {
        world
            .net
            .enable_protocol(NodeId(r), RoutingProtocol::Ospf, &mut ShortestPathEngine)
            .expect("router");
    }
    let mut sim = Simulator::default();
    world.net.request_lease(NodeId(5), &mut sim).expect("host");
    world.net.request_lease(NodeId(6), &mut sim).expect("host");
    sim.run(&mut world);
    for host in [5, 6] {
        let address = world.net.node(NodeId(host)).map(|n| n.address().to_string());
        assert_eq!(address, Some(format!("::ffff:192.168.100.{host}")));
    }

    let pkt = world
        .net
        .make_packet(&data("::ffff:192.168.100.6"), "::ffff:192.168.100.5");
    world.net.inject(NodeId(5), pkt, &mut sim).expect("host");
    sim.run(&mut world);

    let m = world.net.metrics();
    assert_eq!((m.received(), m.dropped()), (1, 0));
    let r1 = world.net.node(NodeId(1)).and_then(|n| n.as_router()).expect("router");
    assert!(r1.routing.host_route("::ffff:192.168.100.6").is_some());
    assert!(r1.routing.host_route("192.168.100.6").is_none());
}
