mod cli;

use page_miner::{Config, EndpointMiner, Fetcher, Miner, ReqwestSender};

#[tokio::main(flavor = "current_thread")] // cooperative fan-out on one thread
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("page-miner {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut cfg = Config::from_env()?;
    if let Some(n) = matches.get_one::<usize>("concurrency") {
        cfg.fetcher.concurrency = *n;
    }
    if let Some(n) = matches.get_one::<u32>("max-retries") {
        cfg.fetcher.max_retries = *n;
    }
    let request = cli::request_from_matches(&matches)?;

    let sender = ReqwestSender::from_config(&cfg)?;
    let fetcher = Fetcher::new(sender, cfg.fetcher)?;
    let miner = EndpointMiner::new("endpoint", fetcher, request);

    let items = miner.mine().await?;
    println!("{}", serde_json::to_string(&items)?);
    Ok(())
}
