//! sysweb - HTTP gateway daemon
//!
//! Serves unit state, journal entries and lifecycle actions as JSON.
//! Start/stop/restart run through the configured elevation wrapper
//! (`sudo` by default), so the invoking user needs matching sudoers rules.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use sysweb::config::{ToolArgs, DEFAULT_PORT};
use sysweb::{server, Config, ServiceControl, SystemRunner};

#[derive(Parser)]
#[command(name = "sysweb")]
#[command(about = "Local HTTP gateway for systemd unit state, logs and actions")]
struct Args {
    /// Port to listen on (takes precedence over --port and $PORT)
    #[arg(value_name = "PORT")]
    listen_port: Option<u16>,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "SYSWEB_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// HTML page served at /
    #[arg(long, env = "SYSWEB_INDEX", default_value = "index.html")]
    index: PathBuf,

    #[command(flatten)]
    tools: ToolArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config {
        bind: args.bind,
        port: args.listen_port.unwrap_or(args.port),
        index: args.index,
        ..Config::default()
    };
    args.tools.apply(&mut config)?;

    if config.elevate.is_empty() {
        info!("Elevation disabled, actions run as the gateway user");
    } else {
        info!("Actions elevated with: {}", config.elevate.join(" "));
    }

    let control = ServiceControl::new(SystemRunner::new(config.elevate.clone()), &config);
    server::serve(&config, control).await?;

    Ok(())
}
