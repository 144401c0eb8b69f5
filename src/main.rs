use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bandwatch::app::{self, AppCfg, CliOverrides};
use bandwatch::shared::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Bollinger Band proximity monitor with console, Telegram and email alerts")]
struct Args {
    /// Path to config file
    #[arg(long, default_value = "Config.toml")]
    config: String,

    /// Instrument to monitor (overrides config)
    #[arg(long)]
    symbol: Option<String>,

    /// Candle interval, e.g. 1h or 15m (overrides config)
    #[arg(long)]
    interval: Option<String>,

    /// Seconds between checks (overrides config)
    #[arg(long)]
    check_interval: Option<u64>,

    /// Market data vendor: binance or twelvedata (overrides config)
    #[arg(long)]
    data_source: Option<String>,

    /// Alert history file, empty to disable persistence (overrides config)
    #[arg(long)]
    history_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let cfg = Config::from_file(&args.config)?;
    let app_cfg = AppCfg::from_config(
        cfg,
        CliOverrides {
            symbol: args.symbol,
            interval: args.interval,
            check_interval_secs: args.check_interval,
            data_source: args.data_source,
            history_file: args.history_file,
        },
    )?;

    app::run(app_cfg).await
}
