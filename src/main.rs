use clap::Parser;
use govee_monitor::{
    BDAddr, BleScanner, DeviceFilter, Monitor, MonitorConfig, TemperatureUnit, DEFAULT_OUTPUT,
};
use main_error::MainError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Monitor temperatures from Govee H5055 meat thermometers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Interval between temperature readings in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
    /// Path to output CSV file
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// How long to scan for the thermometer each cycle, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    scan_timeout: u64,
    /// Unit for printed and logged temperatures
    #[arg(long, value_enum, default_value_t = TemperatureUnit::Celsius)]
    unit: TemperatureUnit,
    /// Only report the thermometer with this bluetooth address
    #[arg(long)]
    device: Option<BDAddr>,
}

impl From<&Args> for MonitorConfig {
    fn from(args: &Args) -> Self {
        MonitorConfig {
            interval: Duration::from_secs(args.interval),
            scan_timeout: Duration::from_secs(args.scan_timeout),
            output: args.output.clone(),
            unit: args.unit,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MainError> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = MonitorConfig::from(&args);
    println!("Scanning for Govee H5055 devices...");
    println!("Output CSV file: {}", config.output.display());
    println!(
        "Monitoring temperatures every {} seconds. Press Ctrl+C to exit",
        args.interval
    );

    let scanner = BleScanner::new(DeviceFilter::from(args.device)).await?;
    let mut monitor = Monitor::new(scanner, std::io::stdout(), config)?;
    println!(
        "Monitoring started at: {}",
        monitor
            .session()
            .started_at()
            .format(govee_monitor::format::TIMESTAMP_FORMAT)
    );

    monitor.run(shutdown_signal()).await?;
    println!("\nExiting...");
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on SIGINT (Ctrl-C) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
