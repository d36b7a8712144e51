//! txt-feeder - tail rotating `*.txt` measurement logs into InfluxDB v1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use txt_feeder::config::{ConfigLoader, ForwarderConfig};
use txt_feeder::display;
use txt_feeder::forwarder::{resolve_start_file, Forwarder};
use txt_feeder::logging::init_tracing;
use txt_feeder::sender::InfluxSender;

#[derive(Parser)]
#[command(
    name = "txt-feeder",
    about = "Parse *.txt log files line by line and send the measurement records to InfluxDB v1",
    version
)]
struct Cli {
    /// Path to the *.txt file to start with.
    start_file: PathBuf,

    /// Seconds to wait at EOF before polling again [default: 60].
    #[arg(long, value_name = "SECONDS")]
    wait: Option<u64>,

    /// Config file (TOML). Defaults to ./.txt-feeder.toml, then the user config dir.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// InfluxDB host.
    #[arg(long)]
    host: Option<String>,

    /// InfluxDB HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Target database.
    #[arg(long = "db", value_name = "NAME")]
    database: Option<String>,

    /// Measurement name; lines starting with it are forwarded.
    #[arg(long)]
    measurement: Option<String>,

    /// InfluxDB user.
    #[arg(long)]
    username: Option<String>,

    /// InfluxDB password.
    #[arg(long, env = "TXT_FEEDER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Write request timeout in seconds [default: 10].
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Diagnostic log file [default: feed_<measurement>_to_InfluxDBv1.log].
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut ForwarderConfig) {
        if let Some(wait) = self.wait {
            config.wait_secs = wait;
        }
        if let Some(host) = &self.host {
            config.influx.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.influx.port = port;
        }
        if let Some(database) = &self.database {
            config.influx.database.clone_from(database);
        }
        if let Some(measurement) = &self.measurement {
            config.measurement.clone_from(measurement);
        }
        if let Some(username) = &self.username {
            config.influx.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.influx.password = Some(password.clone());
        }
        if let Some(timeout) = self.timeout {
            config.influx.timeout_secs = timeout;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
    }
}

/// Cancel `token` on Ctrl-C, or SIGTERM on Unix.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Interrupted by user");
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_fatal(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        display::print_fatal(&e.to_string());
        return ExitCode::FAILURE;
    }

    let _log_guard = match init_tracing(cli.verbose, &config.log_path()) {
        Ok(guard) => guard,
        Err(e) => {
            display::print_fatal(&format!("Cannot open diagnostic log: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let start_file = match resolve_start_file(&cli.start_file) {
        Ok(path) => path,
        Err(e) => {
            tracing::error!(error = %e, "Invalid start file");
            display::print_fatal(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let sender = match InfluxSender::from_config(&config.influx) {
        Ok(sender) => sender,
        Err(e) => {
            tracing::error!(error = %e, "Cannot create sender");
            display::print_fatal(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        start_file = %start_file.display(),
        url = %sender.redacted_url(),
        measurement = %config.measurement,
        wait_secs = config.wait_secs,
        "Starting txt-feeder"
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut forwarder = Forwarder::new(&config, sender).with_cancellation(cancel);
    match forwarder.run(&start_file).await {
        Ok(_) => {
            display::print_info("Interrupted by user.");
            ExitCode::SUCCESS
        }
        // Already logged with context where it happened.
        Err(e) => {
            display::print_fatal(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
