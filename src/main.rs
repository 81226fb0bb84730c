//! ser2osc - Main entry point
//!
//! Serial-to-OSC bridge daemon. Wires the components together and owns the
//! operator-facing boundary: CLI arguments, log subscriber, Ctrl+C
//! handling, and the acknowledge-before-exit prompt on fatal errors.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ser2osc::bridge::{self, LoopExit};
use ser2osc::config;
use ser2osc::connect::{ConnectionManager, RetryPolicy, SystemOpener};
use ser2osc::driver::DevconControl;
use ser2osc::osc::OscSender;
use ser2osc::ports::{self, SystemScanner};
use ser2osc::startup::StartupContext;
use ser2osc::{Error, Result};

/// Command-line arguments for ser2osc
#[derive(Parser, Debug)]
#[command(name = "ser2osc")]
#[command(about = "Bridge numeric serial events to OSC messages over UDP")]
#[command(version)]
struct Args {
    /// Config file path (default: <exe name>.json beside the executable)
    #[arg(short, long, env = "SER2OSC_CONFIG")]
    config: Option<PathBuf>,

    /// Exit on fatal errors without waiting for operator acknowledgment
    #[arg(long, env = "SER2OSC_NON_INTERACTIVE")]
    non_interactive: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ser2osc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("ser2osc version {}", env!("CARGO_PKG_VERSION"));

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            if let Error::Fatal { remediation, .. } = &err {
                eprintln!("{remediation}");
            }
            if !args.non_interactive {
                wait_for_operator_ack();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let ctx = StartupContext::detect()?;
    let config_path = args.config.clone().unwrap_or_else(|| ctx.config_path());
    info!("Using config file: {}", config_path.display());
    let config = config::load_or_create(&config_path)?;

    let endpoint = ports::resolve_port(&config, &SystemScanner)?;
    info!("Using serial port: {endpoint} at {} baud", config.baud_rate);
    info!("Using OSC host: {} on port {}", config.osc_host, config.osc_port);

    let osc = OscSender::new(&config.osc_host, config.osc_port)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
                cancel.cancel();
            }
        });
    }

    let mut manager = ConnectionManager::new(
        SystemOpener,
        DevconControl::new(ctx.helper_path()),
        config.arduino_driver.clone(),
        RetryPolicy::default(),
    );

    // Retrying can run for a long time; stay interruptible while it does
    let conn = tokio::select! {
        _ = cancel.cancelled() => {
            info!("Cancelled before the serial port opened");
            return Ok(());
        }
        conn = manager.connect(&endpoint, config.baud_rate) => conn?,
    };

    match bridge::run(conn, &config.osc_addresses, &osc, &cancel, bridge::POLL_INTERVAL).await? {
        LoopExit::Interrupted => info!("Exiting on operator request"),
        LoopExit::Closed => info!("Serial connection ended, exiting"),
    }
    Ok(())
}

/// Block until the operator confirms they have seen the failure
fn wait_for_operator_ack() {
    eprintln!("Press Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
