//! Minerlink daemon - remote mining control server over TCP.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use minerlink::commands::ActionRegistry;
use minerlink::config::Settings;
use minerlink::engine::{EngineHandle, StandaloneController};
use minerlink::socket::ControlListener;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    let port = get_port_override(&args).unwrap_or(settings.server.port);

    info!("Starting {} v{}", NAME, VERSION);
    info!("Listening port: {}", port);
    info!("Log level: {}", settings.logging.level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(async_main(settings, port)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Daemon failed");
            ExitCode::FAILURE
        }
    }
}

async fn async_main(settings: Settings, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let controller = Arc::new(StandaloneController::new());
    let engine = EngineHandle::new(controller);
    let listener = ControlListener::new(engine, ActionRegistry::new(), settings.server.clone());

    listener.start(port).await?;

    shutdown_signal().await;
    info!("Shutdown signal received, stopping server...");
    listener.stop().await;

    info!("Daemon stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_help() {
    println!(
        r#"{} {}
Remote mining control daemon: drives the local mining engine on behalf of
operator devices over newline-delimited JSON on TCP.

The channel is plaintext and unauthenticated; only expose it on trusted
networks.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to TOML configuration file
                           (built-in defaults when omitted)
    -p, --port <PORT>      Listening port override [default: 8888]
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME
    );
}

fn load_settings(args: &[String]) -> Result<Settings, Box<dyn std::error::Error>> {
    match get_arg_value(args, "--config", "-c") {
        Some(path) => Ok(Settings::load(path)?),
        None => Ok(Settings::default()),
    }
}

fn get_port_override(args: &[String]) -> Option<u16> {
    get_arg_value(args, "--port", "-p").and_then(|v| v.parse().ok())
}

fn get_arg_value(args: &[String], long: &str, short: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == long || arg == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(value) = arg.strip_prefix(&format!("{}=", long)) {
            return Some(value.to_string());
        }
    }
    None
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
