use crate::model;
use crate::window;

/// Subcommand selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List every loaded series.
    List,
    /// Show windowed series with summary metrics.
    Show {
        series: Vec<String>,
        windows: Vec<window::TimeWindow>,
        as_of: Option<chrono::NaiveDate>,
        csv: Option<std::path::PathBuf>,
        rows: usize,
    },
    /// Rebase several series to 100 and print them side by side.
    Compare {
        series: Vec<String>,
        window: window::TimeWindow,
        as_of: Option<chrono::NaiveDate>,
        rows: usize,
    },
    /// Check every series for missing days.
    Validate,
    /// Forward-fill missing days and write normalized JSON.
    Fill {
        kind: model::SeriesKind,
        output: std::path::PathBuf,
    },
}

/// Structure representing command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    pub tokens: std::path::PathBuf,
    pub pools: std::path::PathBuf,
    pub threads: Option<usize>,
    pub cache_ttl: std::time::Duration,
    pub density: window::DensityLimit,
    pub command: Command,
}

/// Command-line arguments parser using Clap.
impl Args {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list; used by tests.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let command = match matches.subcommand() {
            Some(("show", sub)) => Command::Show {
                series: sub.get_many::<String>("series").into_iter().flatten().cloned().collect(),
                windows: sub
                    .get_many::<window::TimeWindow>("window")
                    .map(|w| w.copied().collect())
                    .unwrap_or_else(|| vec![window::TimeWindow::All]),
                as_of: sub.get_one::<chrono::NaiveDate>("as-of").copied(),
                csv: sub.get_one::<String>("csv").map(std::path::PathBuf::from),
                rows: sub.get_one::<usize>("rows").copied().unwrap_or(5),
            },
            Some(("compare", sub)) => Command::Compare {
                series: sub.get_many::<String>("series").into_iter().flatten().cloned().collect(),
                window: sub
                    .get_one::<window::TimeWindow>("window")
                    .copied()
                    .unwrap_or(window::TimeWindow::All),
                as_of: sub.get_one::<chrono::NaiveDate>("as-of").copied(),
                rows: sub.get_one::<usize>("rows").copied().unwrap_or(5),
            },
            Some(("validate", _)) => Command::Validate,
            Some(("fill", sub)) => Command::Fill {
                kind: match sub.get_one::<String>("kind").map(String::as_str) {
                    Some("token") => model::SeriesKind::Token,
                    _ => model::SeriesKind::Pool,
                },
                output: std::path::PathBuf::from(sub.get_one::<String>("output").cloned().unwrap_or_default()),
            },
            _ => Command::List,
        };

        let max_points = matches.get_one::<usize>("max-points").copied().unwrap_or(500);
        let tail_points = matches.get_one::<usize>("tail-points").copied().unwrap_or(60);

        Args {
            tokens: std::path::PathBuf::from(
                matches.get_one::<String>("tokens").cloned().unwrap_or_default(),
            ),
            pools: std::path::PathBuf::from(matches.get_one::<String>("pools").cloned().unwrap_or_default()),
            threads: matches.get_one::<usize>("threads").copied(),
            cache_ttl: std::time::Duration::from_secs(matches.get_one::<u64>("cache-ttl").copied().unwrap_or(300)),
            density: window::DensityLimit {
                max_points,
                tail_points,
            },
            command,
        }
    }
}

fn command() -> clap::Command {
    clap::Command::new("defi-series")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect, window and validate static token and pool time series")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            clap::Arg::new("tokens")
                .long("tokens")
                .help("Path to the token time series JSON file")
                .default_value("data/all_tokens_data.json")
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("pools")
                .long("pools")
                .help("Path to the pool time series JSON file")
                .default_value("data/pool_data.json")
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads for batch commands (default: all available)")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("cache-ttl")
                .long("cache-ttl")
                .help("Seconds a windowed series stays cached")
                .default_value("300")
                .global(true)
                .num_args(1)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            clap::Arg::new("max-points")
                .long("max-points")
                .help("Upper bound on points rendered per series")
                .default_value("500")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("tail-points")
                .long("tail-points")
                .help("Most recent points always rendered without thinning")
                .default_value("60")
                .global(true)
                .num_args(1)
                .value_parser(clap::value_parser!(usize)),
        )
        .subcommand(clap::Command::new("list").about("List loaded series"))
        .subcommand(
            clap::Command::new("show")
                .about("Show windowed series with summary metrics")
                .arg(
                    clap::Arg::new("series")
                        .short('s')
                        .long("series")
                        .help("Series id (token symbol or pool key); repeatable")
                        .required(true)
                        .action(clap::ArgAction::Append)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("window")
                        .short('w')
                        .long("window")
                        .help("Display window. Available: ALL, 3Y, 1Y, 6M, 3M, 1M, 1W; repeatable")
                        .action(clap::ArgAction::Append)
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_window)),
                )
                .arg(
                    clap::Arg::new("as-of")
                        .long("as-of")
                        .help("Reference date for window cutoffs, YYYY-MM-DD (default: today, UTC)")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_date_arg)),
                )
                .arg(
                    clap::Arg::new("csv")
                        .long("csv")
                        .help("Export the windowed series to this CSV file (single series and window only)")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("rows")
                        .short('n')
                        .long("rows")
                        .help("Rows printed from each end of the series")
                        .default_value("5")
                        .num_args(1)
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            clap::Command::new("compare")
                .about("Compare series rebased to 100 on their first shared day")
                .arg(
                    clap::Arg::new("series")
                        .short('s')
                        .long("series")
                        .help("Series id to compare; repeat for each series")
                        .required(true)
                        .action(clap::ArgAction::Append)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("window")
                        .short('w')
                        .long("window")
                        .help("Window applied to every series. Available: ALL, 3Y, 1Y, 6M, 3M, 1M, 1W")
                        .default_value("ALL")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_window)),
                )
                .arg(
                    clap::Arg::new("as-of")
                        .long("as-of")
                        .help("Reference date for the window cutoff, YYYY-MM-DD (default: today, UTC)")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_date_arg)),
                )
                .arg(
                    clap::Arg::new("rows")
                        .short('n')
                        .long("rows")
                        .help("Rows printed from each end of the table")
                        .default_value("5")
                        .num_args(1)
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(clap::Command::new("validate").about("Report missing and duplicate days per series"))
        .subcommand(
            clap::Command::new("fill")
                .about("Forward-fill missing days and write normalized JSON")
                .arg(
                    clap::Arg::new("kind")
                        .short('k')
                        .long("kind")
                        .help("Which input file to fill")
                        .value_parser(["token", "pool"])
                        .default_value("pool")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Path of the JSON file to write")
                        .required(true)
                        .num_args(1),
                ),
        )
}

/// Validates that a count is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the count.
///
/// # Returns
/// * `Result<usize>` - Validated count.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_window(s: &str) -> Result<window::TimeWindow, String> {
    s.parse::<window::TimeWindow>().map_err(|e| e.to_string())
}

fn parse_date_arg(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Expected YYYY-MM-DD: {}", e))
}
