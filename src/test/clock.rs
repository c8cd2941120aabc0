use crate::sim::{EventClock, SimTime, Simulator, TickHandler, World};
use std::any::Any;

#[derive(Default)]
struct TickWorld {
    clock: EventClock,
    seen: Vec<(u64, SimTime)>,
    stop_after: Option<u64>,
}

impl World for TickWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TickHandler for TickWorld {
    fn clock(&mut self) -> &mut EventClock {
        &mut self.clock
    }

    fn on_clock_tick(&mut self, sim: &mut Simulator, tick: u64) {
        self.seen.push((tick, sim.now()));
        if self.stop_after == Some(tick) {
            self.clock.stop();
        }
    }
}

#[test]
fn clock_ticks_at_fixed_interval_until_stopped() {
    let mut sim = Simulator::default();
    let mut world = TickWorld::default();
    assert!(world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(10)));

    sim.run_until(SimTime::from_secs(35), &mut world);
    assert_eq!(
        world.seen,
        vec![
            (1, SimTime::from_secs(10)),
            (2, SimTime::from_secs(20)),
            (3, SimTime::from_secs(30)),
        ]
    );

    assert!(world.clock.stop());
    sim.run_until(SimTime::from_secs(100), &mut world);
    assert_eq!(world.seen.len(), 3);
    assert_eq!(world.clock.ticks(), 3);
}

#[test]
fn start_while_running_and_stop_while_stopped_are_no_ops() {
    let mut sim = Simulator::default();
    let mut world = TickWorld::default();

    assert!(!world.clock.stop());
    assert!(world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(5)));
    assert!(!world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(1)));
    assert_eq!(world.clock.interval(), SimTime::from_secs(5));

    sim.run_until(SimTime::from_secs(10), &mut world);
    assert_eq!(world.seen.len(), 2);
}

#[test]
fn stop_inside_tick_prevents_next_tick() {
    let mut sim = Simulator::default();
    let mut world = TickWorld {
        stop_after: Some(2),
        ..TickWorld::default()
    };
    world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(1));

    sim.run(&mut world);
    assert_eq!(world.seen.len(), 2);
    assert!(!world.clock.is_running());
    assert_eq!(sim.pending(), 0);
}

#[test]
fn restart_does_not_leave_two_tick_chains() {
    let mut sim = Simulator::default();
    let mut world = TickWorld::default();
    world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(10));
    sim.run_until(SimTime::from_secs(5), &mut world);

    world.clock.stop();
    world.clock.start::<TickWorld>(&mut sim, SimTime::from_secs(10));
    sim.run_until(SimTime::from_secs(40), &mut world);

    // 旧链在 t=10 的 tick 被丢弃，新链从 t=15 开始
    let times: Vec<SimTime> = world.seen.iter().map(|&(_, t)| t).collect();
    assert_eq!(
        times,
        vec![
            SimTime::from_secs(15),
            SimTime::from_secs(25),
            SimTime::from_secs(35),
        ]
    );
}

#[test]
fn zero_interval_is_rejected() {
    let mut sim = Simulator::default();
    let mut world = TickWorld::default();
    assert!(!world.clock.start::<TickWorld>(&mut sim, SimTime::ZERO));
    assert!(!world.clock.is_running());
    assert_eq!(sim.pending(), 0);
}
