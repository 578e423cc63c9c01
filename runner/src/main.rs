use anyhow::{Context, Result};
use flexi_logger::Logger;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use schedule::{Schedule, TextFile};
use supervisor::{format_events, Event, LogDir, Supervisor};

mod args;

use args::ProgramArguments;

fn main() -> Result<()> {
    let args = ProgramArguments::new();

    let _logger = Logger::try_with_env_or_str("info")
        .context("invalid log specification")?
        .log_to_stdout()
        .start()
        .context("failed to start the logger")?;

    let events = execute(&args)?;

    debug!("\n{}", format_events(&events));
    info!("Worker logs written to {}", args.log_dir.display());
    Ok(())
}

/// Loads the schedule and the corpus named by `args` and runs the simulation.
fn execute(args: &ProgramArguments) -> Result<Vec<Event>> {
    let schedule = Schedule::load(&args.config)
        .with_context(|| format!("failed to load schedule {}", args.config.display()))?;
    let corpus = TextFile::open(&args.corpus)
        .with_context(|| format!("failed to open corpus {}", args.corpus.display()))?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Random seed {}", seed);

    let mut supervisor = Supervisor::new(
        args.capacity,
        corpus,
        LogDir::new(&args.log_dir),
        StdRng::seed_from_u64(seed),
    )?;
    Ok(supervisor.run(&schedule)?)
}

#[cfg(test)]
mod tests;
