mod api;
mod candidate;
mod client;
mod collector;
mod cycle;
mod engine;
mod workflow;

use hunt_proto::config::Config;
use hunt_proto::platform;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

use client::LidarrClient;
use cycle::HuntCycle;

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn init_logging() -> anyhow::Result<FilterHandle> {
    let log_path = platform::log_file();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(filter);

    // Create layers: stdout + file writer
    let stdout_layer = tracing_subscriber::fmt::layer();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Log file: {:?}", log_path);
    Ok(handle)
}

/// Route panics through tracing so they reach the log file, then run the
/// default hook.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        error!("Panic at {}: {}", location, panic_message(info.payload()));
        default_hook(info);
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Exit status for a hunt task that stopped on its own.
fn task_outcome(joined: Result<(), tokio::task::JoinError>) -> anyhow::Result<ExitCode> {
    match joined {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_panic() => Err(anyhow::anyhow!("hunt loop panicked")),
        Err(e) => Err(anyhow::anyhow!("hunt loop stopped unexpectedly: {}", e)),
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn log_configuration(config: &Config) {
    let hunt = &config.hunt;
    let timing = &config.timing;
    info!("=== Huntarr [Lidarr Edition] starting ===");
    info!("API URL: {}", config.lidarr.api_url);
    debug!("API key: {}", mask(&config.lidarr.api_key));
    info!(
        "Missing mode: {} ({} per cycle), upgrade mode: {} ({} per cycle)",
        hunt.missing_mode, hunt.missing_items, hunt.upgrade_mode, hunt.upgrade_items
    );
    info!(
        "Random selection: {}, monitored only: {}, persist upgrade state: {}",
        hunt.random_selection, hunt.monitored_only, hunt.persist_upgrade_state
    );
    info!(
        "Sleep duration: {}s, cycle delay: {}s, idle delay: {}s",
        timing.sleep_duration_secs, timing.cycle_delay_secs, timing.idle_delay_secs
    );
    info!(
        "State file: {:?}, reset interval: {}h",
        config.state.state_file, config.state.reset_interval_hours
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run(filter: FilterHandle) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    if config.log.debug && std::env::var_os("RUST_LOG").is_none() {
        filter.reload(EnvFilter::new("debug"))?;
    }
    log_configuration(&config);

    let client = LidarrClient::new(&config.lidarr)?;
    debug!("Lidarr API root: {}/api/v1", client.base_url());
    let hunt = HuntCycle::new(client, config);
    info!("Hunting: {:?}", hunt.passes());

    let mut task = tokio::spawn(hunt.run_forever());

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown requested, stopping");
            task.abort();
            Ok(ExitCode::SUCCESS)
        }
        joined = &mut task => task_outcome(joined),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = match init_logging() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to set up logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    install_panic_hook();

    match run(filter).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
