use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schedule::{Command, Schedule, Tick};
use supervisor::{Event, MemorySink, Supervisor};

use super::{corpus, new_supervisor, simulate};

/// Checks that no message is written while another one is unacknowledged.
fn assert_single_in_flight(events: &[Event]) {
    let mut in_flight = None;
    for event in events {
        match event {
            Event::Delivered { slot, .. } | Event::TerminateSent { slot, .. } => {
                assert_eq!(in_flight, None, "overlapping write at {event}");
                in_flight = Some(*slot);
            }
            Event::Acknowledged { slot, .. } => {
                assert_eq!(in_flight, Some(*slot), "unexpected ack at {event}");
                in_flight = None;
            }
            Event::Terminated { report, .. } => {
                assert_eq!(in_flight, Some(report.slot), "unexpected termination at {event}");
                in_flight = None;
            }
            _ => {}
        }
    }
    assert_eq!(in_flight, None);
}

/// Builds a schedule of random spawns and terminates over `labels`.
fn random_schedule(rng: &mut StdRng, labels: &[&str], quit: Tick) -> Schedule {
    let mut commands = (0..24)
        .map(|_| {
            let tick = rng.gen_range(0..=quit + 2);
            let label = labels[rng.gen_range(0..labels.len())];
            if rng.gen_bool(0.6) {
                Command::spawn(tick, label).unwrap()
            } else {
                Command::terminate(tick, label).unwrap()
            }
        })
        .collect::<Vec<Command>>();
    commands.push(Command::quit(quit));
    Schedule::new(commands).unwrap()
}

#[test]
pub fn at_most_one_message_in_flight() {
    let (events, _) = simulate("0 A S\n0 B S\n3 A T\n4 C S\n6 B T\n9 EXIT\n", 2);
    assert_single_in_flight(&events);
}

#[test]
pub fn every_post_is_acknowledged() {
    let mut supervisor = new_supervisor(3, corpus(), MemorySink::new());
    let events = supervisor
        .run(&Schedule::parse("0 A S\n1 B S\n2 C S\n4 B T\n7 EXIT").unwrap())
        .unwrap();

    let writes = events
        .iter()
        .filter(|event| matches!(event, Event::Delivered { .. } | Event::TerminateSent { .. }))
        .count() as u64;
    assert_eq!(supervisor.mailbox().counters(), (writes, writes));
    assert_eq!(supervisor.mailbox().in_flight(), None);
    assert!(supervisor.mailbox().is_closed());
    assert_eq!(supervisor.slots().active_count(), 0);
}

#[test]
pub fn ticks_stop_at_exit() {
    let (events, _) = simulate("0 A S\n6 EXIT\n9 A T\n12 B S\n", 2);

    let ticks = events
        .iter()
        .filter_map(|event| match event {
            Event::TickStarted(tick) => Some(*tick),
            _ => None,
        })
        .collect::<Vec<Tick>>();
    assert_eq!(ticks, (0..=6).collect::<Vec<Tick>>());
    assert!(events.iter().all(|event| event.tick() <= 6));
}

#[test]
pub fn delivered_lines_come_from_the_corpus() {
    let corpus = corpus();
    let (events, sink) = simulate("0 A S\n1 B S\n30 EXIT\n", 2);

    let lines = events
        .iter()
        .filter_map(|event| match event {
            Event::Delivered { line, .. } => Some(line.clone()),
            _ => None,
        })
        .collect::<Vec<String>>();
    assert_eq!(lines.len(), 31);
    assert!(lines.iter().all(|line| corpus.contains(line)));

    for worker in sink.workers() {
        let log = sink.contents(worker).unwrap();
        for line in log.lines().filter(|line| line.contains("received message: ")) {
            let (_, payload) = line.split_once("received message: ").unwrap();
            assert!(corpus.contains(payload), "{payload:?} is not a corpus line");
        }
    }
}

#[test]
pub fn one_delivery_per_active_tick() {
    let (events, _) = simulate("2 A S\n4 A T\n6 B S\n7 B T\n9 EXIT\n", 1);

    let delivered = events
        .iter()
        .filter_map(|event| match event {
            Event::Delivered { tick, .. } => Some(*tick),
            _ => None,
        })
        .collect::<Vec<Tick>>();
    assert_eq!(delivered, vec![2, 3, 6]);
}

#[test]
pub fn random_schedules_keep_the_protocol() {
    let labels = ["C1", "C2", "C3", "C4", "C5"];
    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let quit = rng.gen_range(0..20);
        let capacity = rng.gen_range(1..4);
        let schedule = random_schedule(&mut rng, &labels, quit);

        let sink = MemorySink::new();
        let mut supervisor = Supervisor::new(capacity, corpus(), sink.clone(), rng).unwrap();
        let events = supervisor.run(&schedule).unwrap();

        assert_single_in_flight(&events);
        assert_eq!(supervisor.slots().active_count(), 0);

        let mut active = 0usize;
        let mut spawned = 0usize;
        for event in &events {
            match event {
                Event::Spawned { .. } => {
                    active += 1;
                    spawned += 1;
                }
                Event::Terminated { .. } => active -= 1,
                Event::SpawnRejected { .. } => assert_eq!(active, capacity),
                _ => {}
            }
            assert!(active <= capacity, "seed {seed}: {active} workers over {capacity} slots");
        }
        assert_eq!(active, 0);
        assert_eq!(sink.workers().len(), spawned);

        for event in &events {
            if let Event::Terminated { tick, report, .. } = event {
                assert_eq!(report.end_tick, Some(*tick));
                assert_eq!(report.active_span(), Some(tick - report.activation_tick));
            }
        }
    }
}
