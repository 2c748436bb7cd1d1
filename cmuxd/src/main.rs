//! CMUX Bring-up Daemon
//!
//! Switches a GSM modem on a serial port to CMUX mode, hands the line to
//! the kernel's n_gsm driver and creates one tty node per multiplexed
//! channel. The process then stays resident, holding the line open, until
//! SIGINT or SIGTERM.

mod config;
mod daemon;
mod shutdown;
mod supervisor;

use std::os::unix::io::AsRawFd;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cmux_link::{open_line, CharDeviceBackend, GsmLineDiscipline, TokioPacer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{BringUpConfig, Cli};
use shutdown::{listen_for_termination, ShutdownToken};
use supervisor::Supervisor;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match BringUpConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not set up yet: its level is part of the config
            eprintln!("cmuxd: {:#}", anyhow::Error::from(e));
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.debug);

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "error" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("cmuxd={level},cmux_link={level},cmux_protocol={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(config: &BringUpConfig) -> anyhow::Result<()> {
    info!(
        "Starting on {} at {} baud, {} profile, MTU {}",
        config.port, config.speed, config.profile, config.mtu
    );

    let line = open_line(&config.port, config.speed)?;
    let mut driver = GsmLineDiscipline::new(line.as_raw_fd());

    let supervisor =
        Supervisor::bring_up(config, line, &mut driver, CharDeviceBackend, &TokioPacer).await?;

    if let Some(nodes) = supervisor.nodes() {
        info!(
            "{} channel node(s) at {}N, major {}",
            nodes.created(),
            config.node_base,
            nodes.major()
        );
    }

    if config.daemonize {
        daemon::detach().context("cannot daemonize")?;
    }

    // Signal handlers go in after the fork so they belong to the daemon
    let mut token = ShutdownToken::new();
    let listener =
        listen_for_termination(token.clone()).context("cannot install signal handlers")?;

    supervisor.park(&mut token).await;
    supervisor.shutdown();
    listener.abort();

    info!("Stopped");
    Ok(())
}
