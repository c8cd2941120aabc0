//! 多 AS 网络仿真
//!
//! 读取 JSON 配置构建全部自治系统，主机启动时申请租约，时钟周期性回收租约并注入泊松流量，
//! 结束时输出统计报告。

use std::path::PathBuf;
use std::process::ExitCode;

use asnet_sim::config::SimConfig;
use asnet_sim::net::{NetWorld, Network, NodeId, RoutingProtocol, ShortestPathEngine};
use asnet_sim::sim::{SimTime, Simulator};
use asnet_sim::topo::build_internet;
use asnet_sim::traffic::DataGenerator;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoutingArg {
    None,
    Rip,
    Ospf,
    Bgp,
}

impl RoutingArg {
    fn protocol(self) -> Option<RoutingProtocol> {
        match self {
            RoutingArg::None => None,
            RoutingArg::Rip => Some(RoutingProtocol::Rip),
            RoutingArg::Ospf => Some(RoutingProtocol::Ospf),
            RoutingArg::Bgp => Some(RoutingProtocol::Bgp),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "as_sim", about = "多自治系统网络仿真：拓扑构建、租约分配、泊松流量与统计")]
struct Args {
    /// JSON 配置文件
    #[arg(long)]
    config: PathBuf,
    /// 仿真运行到多少秒
    #[arg(long, default_value_t = 600)]
    until_secs: u64,
    /// 时钟 tick 间隔（秒）
    #[arg(long, default_value_t = 60)]
    tick_secs: u64,
    /// 每个时间槽的泊松到达率
    #[arg(long, default_value_t = 2.0)]
    lambda: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// 在所有路由器上启用的路由协议（由最短路径参考引擎提供转发表）
    #[arg(long, value_enum, default_value_t = RoutingArg::Ospf)]
    routing: RoutingArg,
    /// 以 JSON 输出统计报告
    #[arg(long)]
    json: bool,
    /// 打印每台路由器的转发表
    #[arg(long)]
    print_routes: bool,
}

fn run(args: Args) -> asnet_sim::Result<()> {
    let config = SimConfig::load(&args.config)?;

    let mut sim = Simulator::default();
    let mut world = NetWorld::new(Network::new());
    let systems = build_internet(&config, &mut world.net);
    if systems.is_empty() {
        warn!("没有成功构建的自治系统");
    }

    let routers: Vec<NodeId> = world.net.routers().map(|n| n.id()).collect();
    let hosts: Vec<NodeId> = world.net.hosts().map(|n| n.id()).collect();

    if let Some(protocol) = args.routing.protocol() {
        let mut engine = ShortestPathEngine;
        for &r in &routers {
            world.net.enable_protocol(r, protocol, &mut engine)?;
        }
    }
    if args.print_routes {
        for &r in &routers {
            world.net.print_routing_table(r);
        }
    }

    for &h in &hosts {
        if let Err(err) = world.net.request_lease(h, &mut sim) {
            warn!(host = %h, %err, "租约请求发送失败");
        }
    }

    let mut generator = DataGenerator::new(args.lambda, hosts.clone(), args.seed)?;
    generator.load_config(config.packets_per_simulation.as_ref());
    world.generator = Some(generator);

    world.start_clock(&mut sim, SimTime::from_secs(args.tick_secs.max(1)));
    sim.run_until(SimTime::from_secs(args.until_secs), &mut world);
    world.stop_clock();

    for system in &systems {
        let leases = world
            .net
            .lease_server(system.id())
            .map(|s| s.leases().len())
            .unwrap_or(0);
        info!(
            as_id = system.id(),
            routers = system.routers().len(),
            hosts = system.hosts().len(),
            leases,
            "AS 概况"
        );
    }

    let report = world.net.metrics().report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "done @ {}, systems={}, routers={}, hosts={}, ticks={}",
            sim.now(),
            systems.len(),
            routers.len(),
            hosts.len(),
            world.clock_ref().ticks()
        );
        print!("{report}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, kind = ?err.kind(), "仿真失败");
            ExitCode::FAILURE
        }
    }
}
