use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use page_miner::config::{parse_pair, ConfigError};
use page_miner::RequestSpec;

pub fn build_cli() -> Command {
    Command::new("page-miner")
        .about("Fetch every page of a paginated, rate-limited JSON API")
        .arg(
            Arg::new("url")
                .long("url")
                .num_args(1)
                .required_unless_present("version")
                .help("Endpoint to mine"),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .num_args(1)
                .action(ArgAction::Append)
                .help("Query parameter as key=value (repeatable)"),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .num_args(1)
                .action(ArgAction::Append)
                .help("Request header as key=value (repeatable)"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Maximum requests in flight (overrides MINER_CONCURRENCY)"),
        )
        .arg(
            Arg::new("max-retries")
                .long("max-retries")
                .num_args(1)
                .value_parser(value_parser!(u32))
                .help("Attempts per request (overrides MINER_MAX_RETRIES)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Build the request descriptor from `--url`, `--param` and `--header`.
pub fn request_from_matches(matches: &ArgMatches) -> Result<RequestSpec, ConfigError> {
    let url = matches.get_one::<String>("url").cloned().unwrap_or_default();
    let mut spec = RequestSpec::new(url);
    for raw in matches.get_many::<String>("param").into_iter().flatten() {
        let (k, v) = parse_pair(raw)?;
        spec = spec.param(k, v);
    }
    for raw in matches.get_many::<String>("header").into_iter().flatten() {
        let (k, v) = parse_pair(raw)?;
        spec = spec.header(k, v);
    }
    Ok(spec)
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins, then RUST_LOG, then info. Logs go to stderr.
    let mut builder = match level {
        Some(lvl) => {
            let mut b = env_logger::Builder::new();
            b.parse_filters(lvl);
            b
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")),
    };
    builder.target(env_logger::Target::Stderr).init();
}
