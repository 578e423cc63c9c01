use std::env;
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};

/// Program Arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramArguments {
    /// The schedule of spawn, terminate and exit commands.
    pub config: PathBuf,

    /// The text file the delivered lines are drawn from.
    pub corpus: PathBuf,

    /// The maximum number of workers alive at the same time.
    pub capacity: usize,

    /// The directory the worker logs are written into.
    pub log_dir: PathBuf,

    /// Seed for the random choices. A fresh seed is used when absent.
    pub seed: Option<u64>,
}

impl ProgramArguments {
    /// Default directory for the worker logs.
    const DEFAULT_LOG_DIR: &'static str = ".";

    fn command() -> Command {
        Command::new("ipc-sim")
            .about("Simulates a supervisor sending random lines to a pool of workers")
            .arg(
                Arg::new("config")
                    .value_parser(clap::value_parser!(PathBuf))
                    .required(true)
                    .value_name("CONFIG")
                    .help("Schedule of SPAWN (S), TERMINATE (T) and EXIT commands"),
            )
            .arg(
                Arg::new("corpus")
                    .value_parser(clap::value_parser!(PathBuf))
                    .required(true)
                    .value_name("CORPUS")
                    .help("Text file the delivered lines are drawn from"),
            )
            .arg(
                Arg::new("capacity")
                    .value_parser(parse_capacity)
                    .required(true)
                    .value_name("M")
                    .help("Maximum number of workers alive at the same time"),
            )
            .arg(
                Arg::new("log-dir")
                    .long("log-dir")
                    .value_parser(clap::value_parser!(PathBuf))
                    .required(false)
                    .value_name("DIR")
                    .help("Directory the worker logs are written into"),
            )
            .arg(
                Arg::new("seed")
                    .long("seed")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("SEED")
                    .help("Seed for a reproducible run"),
            )
    }

    /// Parses the program arguments from the command line interface.
    ///
    /// Wrong arity or a non positive `M` print the usage and exit with a
    /// failure status.
    pub fn new() -> Self {
        Self::try_from_iter(env::args_os()).unwrap_or_else(|error| error.exit())
    }

    /// Parses the program arguments from `args`, the program name included.
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        // Required arguments are always present once clap accepted the command line.
        let path = |id: &str| matches.get_one::<PathBuf>(id).cloned().unwrap_or_default();
        ProgramArguments {
            config: path("config"),
            corpus: path("corpus"),
            capacity: matches.get_one::<usize>("capacity").copied().unwrap_or_default(),
            log_dir: matches
                .get_one::<PathBuf>("log-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_LOG_DIR)),
            seed: matches.get_one::<u64>("seed").copied(),
        }
    }
}

/// Accepts a positive integer that fits the platform's `usize`.
fn parse_capacity(value: &str) -> Result<usize, String> {
    value
        .parse::<NonZeroUsize>()
        .map(NonZeroUsize::get)
        .map_err(|error| format!("expected a positive integer: {error}"))
}
