use crate::ErrorKind;
use crate::config::{AsConfig, SimConfig, TopologyType};
use crate::topo::IdRange;

const SAMPLE: &str = r#"{
  "packets_per_simulation": 80,
  "autonomous_systems": [
    {
      "id": 1,
      "node_count": 8,
      "topology_type": "Mesh",
      "gateways": [{ "node": 1, "users": [9, 10] }],
      "broken_routers": [4],
      "connect_to_as": [{ "id": 2, "gateway_pairs": [{ "gateway": 8, "connect_to": 57 }] }]
    },
    {
      "id": 2,
      "node_count": 4,
      "router_port_count": 4,
      "topology_type": "torus",
      "ipv6": true,
      "dhcp_server": 58
    }
  ]
}"#;

#[test]
fn parses_full_document_with_defaults() {
    let cfg = SimConfig::from_json(SAMPLE).expect("parse");
    assert_eq!(cfg.packets_per_simulation.as_ref().and_then(|v| v.as_u64()), Some(80));
    assert_eq!(cfg.autonomous_systems.len(), 2);

    let a = &cfg.autonomous_systems[0];
    assert_eq!(a.validate(0).expect("valid"), (1, 8));
    assert_eq!(a.router_port_count, 6);
    assert_eq!(a.topology_type, TopologyType::Mesh);
    assert!(!a.ipv6);
    assert_eq!(a.gateways[0].users, vec![9, 10]);
    assert_eq!(a.broken_routers, vec![4]);
    assert_eq!(a.connect_to_as[0].gateway_pairs[0].connect_to, 57);

    let b = &cfg.autonomous_systems[1];
    assert_eq!(b.topology_type, TopologyType::Torus);
    assert_eq!(b.router_port_count, 4);
    assert!(b.ipv6);
    assert_eq!(b.dhcp_server, Some(58));
}

#[test]
fn topology_names_accept_aliases() {
    for (raw, expected) in [
        ("\"RingStar\"", TopologyType::RingStar),
        ("\"ring_star\"", TopologyType::RingStar),
        ("\"mesh\"", TopologyType::Mesh),
        ("\"Torus\"", TopologyType::Torus),
    ] {
        let t: TopologyType = serde_json::from_str(raw).expect(raw);
        assert_eq!(t, expected);
    }
    assert!(serde_json::from_str::<TopologyType>("\"hypercube\"").is_err());
}

#[test]
fn missing_keys_are_config_errors_naming_the_key() {
    let cfg = SimConfig::from_json(r#"{"autonomous_systems":[{"node_count":4},{"id":3}]}"#)
        .expect("parse");
    let err = cfg.autonomous_systems[0].validate(0).expect_err("no id");
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("id"));
    let err = cfg.autonomous_systems[1].validate(1).expect_err("no node_count");
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("node_count"));
}

#[test]
fn zero_sized_systems_are_rejected() {
    let cfg = AsConfig {
        id: Some(1),
        node_count: Some(0),
        ..AsConfig::default()
    };
    assert_eq!(cfg.validate(0).expect_err("empty").kind(), ErrorKind::Config);
    let cfg = AsConfig {
        id: Some(1),
        node_count: Some(2),
        router_port_count: 0,
        ..AsConfig::default()
    };
    assert_eq!(cfg.validate(0).expect_err("no ports").kind(), ErrorKind::Config);
}

#[test]
fn broken_json_is_a_config_error() {
    let err = SimConfig::from_json("{ not json").expect_err("parse");
    assert_eq!(err.kind(), ErrorKind::Config);
    let err = SimConfig::load("/definitely/not/here.json").expect_err("io");
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn id_ranges_are_contiguous_and_disjoint() {
    let cfg = SimConfig::from_json(SAMPLE).expect("parse");
    let ranges = IdRange::compute(&cfg.autonomous_systems);
    assert_eq!(ranges.len(), 2);

    let a = &ranges[0];
    assert_eq!((a.router_start, a.router_end), (1, 8));
    assert_eq!((a.host_start, a.host_end), (9, 56));
    assert_eq!(a.extension, None);

    let b = &ranges[1];
    assert_eq!((b.router_start, b.router_end), (57, 60));
    assert_eq!((b.host_start, b.host_end), (61, 76));
    assert_eq!(b.extension, Some((77, 80)));
    assert!(b.contains_client(78));
    assert!(!b.contains_client(60));
    assert!(!a.contains_client(57));
}

#[test]
fn invalid_systems_do_not_consume_ids() {
    let cfgs = vec![
        AsConfig {
            id: None,
            node_count: Some(4),
            ..AsConfig::default()
        },
        AsConfig {
            id: Some(7),
            node_count: Some(2),
            router_port_count: 1,
            ..AsConfig::default()
        },
    ];
    let ranges = IdRange::compute(&cfgs);
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].as_id, 7);
    assert_eq!(ranges[0].routers(), 1..=2);
    assert_eq!(ranges[0].hosts(), 3..=4);
}
