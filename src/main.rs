use anyhow::{bail, Context};
use api::RocketState;
use app::chain::{Bitcoind, ChainBackend};
use app::config::{self, Config};
use app::ln::{LightningBackend, Lnd};
use clap::Parser;
use rocket::fs::FileServer;
use std::fs::OpenOptions;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "invoicer", version, about = "Dual-rail Bitcoin payment API")]
struct Cli {
    /// Path to a config file in TOML format
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let conf = Config::load(&cli.config)?;
    init_logging(&conf)?;

    let ln: Arc<dyn LightningBackend> = match conf.ln_client.to_lowercase().as_str() {
        "" | "lnd" => Arc::new(Lnd::connect(&conf.lnd).await?),
        "clightning" => bail!("ln-client clightning is not supported yet"),
        other => bail!("invalid ln-client specified: {}", other),
    };

    let chain: Option<Arc<dyn ChainBackend>> = if conf.off_chain_only {
        None
    } else {
        Some(Arc::new(Bitcoind::connect(&conf.bitcoind).await?))
    };

    app::watchdog::start(Arc::clone(&ln), conf.lnd.kill_count);

    log::info!(
        "invoicer started: client={} users={} conf-file={}",
        conf.ln_client,
        conf.users.len(),
        cli.config,
    );

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", conf.port));
    let mut rocket = api::register(
        rocket::custom(figment),
        RocketState {
            ln,
            chain,
            users: conf.users,
        },
    );
    if !conf.static_dir.is_empty() {
        rocket = rocket.mount("/", FileServer::from(config::expand_path(&conf.static_dir)));
    }
    rocket.launch().await.context("server failed")?;
    Ok(())
}

fn init_logging(conf: &Config) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if !conf.log_file.is_empty() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config::expand_path(&conf.log_file))
            .with_context(|| format!("unable to open log file {}", conf.log_file))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
