use rand::rngs::StdRng;
use rand::SeedableRng;
use schedule::{Lines, Schedule};
use supervisor::{format_events, Event, LogSink, MemorySink, Supervisor};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

mod handoff;

const CORPUS: [&str; 3] = [
    "The quick brown fox jumps over the lazy dog.",
    "Shared memory is fast, semaphores keep it honest.",
    "Every message is acknowledged before the next one.",
];

/// The only line of [`single_line`]. With it, and at most one active
/// worker at a time, a trace does not depend on the seed.
const PING: &str = "ping";

fn output_path(folder: &str, name: &str) -> PathBuf {
    Path::new("../outputs").join(folder).join(format!("{name}.log"))
}

fn write_logs(folder: &str, name: &str, logs: &str) {
    let path = output_path(folder, name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, logs).unwrap();
}

fn read_logs(folder: &str, name: &str) -> String {
    let path = output_path(folder, name);
    fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("no recorded trace at {}: {error}", path.display()))
}

/// Compares the event trace with the recorded one, or records it when
/// `WRITE_OUTPUT` is set.
fn run(folder: &str, name: &str, events: &[Event]) {
    let output = format_events(events);

    if env::var("WRITE_OUTPUT").is_ok() {
        write_logs(folder, name, &output);
    } else {
        let reference = read_logs(folder, name);

        println!("\nleft = Recorded Output\nright = Your Output\n");
        use pretty_assertions::assert_eq;
        assert_eq!(reference, output);
    }
}

fn seed() -> u64 {
    env::var("SEED")
        .unwrap_or("2024".to_string())
        .parse::<u64>()
        .unwrap()
}

fn corpus() -> Lines {
    Lines::new(CORPUS)
}

fn single_line() -> Lines {
    Lines::new([PING])
}

fn new_supervisor<S: LogSink>(
    capacity: usize,
    corpus: Lines,
    sink: S,
) -> Supervisor<Lines, S, StdRng> {
    let seed = seed();
    println!("Capacity {capacity}\nSeed {seed}");
    Supervisor::new(capacity, corpus, sink, StdRng::seed_from_u64(seed)).unwrap()
}

/// Runs `schedule` over `corpus` on a fresh supervisor whose workers log
/// in memory.
fn simulate_on(corpus: Lines, schedule: &str, capacity: usize) -> (Vec<Event>, MemorySink) {
    let sink = MemorySink::new();
    let events = new_supervisor(capacity, corpus, sink.clone())
        .run(&Schedule::parse(schedule).unwrap())
        .unwrap();
    (events, sink)
}

fn simulate(schedule: &str, capacity: usize) -> (Vec<Event>, MemorySink) {
    simulate_on(corpus(), schedule, capacity)
}

fn count<F>(events: &[Event], f: F) -> usize
where
    F: Fn(&Event) -> bool,
{
    events.iter().filter(|event| f(event)).count()
}
