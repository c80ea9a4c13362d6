//! syswebctl - CLI for the sysweb core
//!
//! Runs the same queries and actions as the gateway, without HTTP, and
//! prints the JSON the gateway would return. `parse` works offline on
//! captured tool output read from stdin.

use std::io::Read;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sysweb::config::ToolArgs;
use sysweb::parse::{parse_journal, parse_status, parse_units};
use sysweb::protocol::{ActionResponse, LogsResponse, ServicesResponse};
use sysweb::{ActionError, ActionRequest, Config, ServiceControl, SystemRunner};

#[derive(Parser)]
#[command(name = "syswebctl")]
#[command(about = "Query and control systemd units through the sysweb core")]
struct Args {
    #[command(flatten)]
    tools: ToolArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List loaded service units
    List,

    /// Show a unit's parsed status
    Status {
        /// Unit name (e.g., "nginx" or "nginx.service")
        name: String,
    },

    /// Start a unit
    Start {
        /// Unit name
        name: String,
    },

    /// Stop a unit
    Stop {
        /// Unit name
        name: String,
    },

    /// Restart a unit
    Restart {
        /// Unit name
        name: String,
    },

    /// Show recent journal entries
    Logs {
        /// Only entries for this unit
        #[arg(short = 'u', long)]
        unit: Option<String>,
    },

    /// Parse captured tool output from stdin (doesn't run anything)
    Parse {
        #[arg(value_enum)]
        format: ParseFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ParseFormat {
    /// `systemctl list-units` table
    Units,
    /// `systemctl status` report
    Status,
    /// `journalctl` output
    Logs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Command::Parse { format } = args.command {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        match format {
            ParseFormat::Units => print_json(&ServicesResponse {
                services: parse_units(&raw),
            })?,
            ParseFormat::Status => print_json(&parse_status(&raw))?,
            ParseFormat::Logs => print_json(&LogsResponse {
                logs: parse_journal(&raw),
            })?,
        }
        return Ok(());
    }

    let mut config = Config::default();
    args.tools.apply(&mut config)?;
    let control = ServiceControl::new(SystemRunner::new(config.elevate.clone()), &config);

    let printed = match args.command {
        Command::List => match control.list_units().await {
            Ok(services) => print_json(&ServicesResponse { services }),
            Err(e) => fail(e),
        },
        Command::Logs { unit } => match control.journal(unit.as_deref()).await {
            Ok(logs) => print_json(&LogsResponse { logs }),
            Err(e) => fail(e),
        },
        Command::Status { name } => run_action(&control, name, "status").await,
        Command::Start { name } => run_action(&control, name, "start").await,
        Command::Stop { name } => run_action(&control, name, "stop").await,
        Command::Restart { name } => run_action(&control, name, "restart").await,
        Command::Parse { .. } => unreachable!(),
    };
    printed?;

    Ok(())
}

async fn run_action(
    control: &ServiceControl<SystemRunner>,
    service: String,
    action: &str,
) -> serde_json::Result<()> {
    match control.dispatch(&ActionRequest::new(service, action)).await {
        Ok(result) => print_json(&ActionResponse { result }),
        Err(e) => fail(e),
    }
}

fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(e: ActionError) -> ! {
    match e {
        ActionError::InvalidRequest(msg) => eprintln!("syswebctl: {}", msg),
        ActionError::CommandFailed { command, output } => {
            eprintln!("syswebctl: {} failed", command);
            eprint!("{}", output);
            if !output.ends_with('\n') {
                eprintln!();
            }
        }
    }
    std::process::exit(1);
}
