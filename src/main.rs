// herakles-cpu-usage-exporter - version 0.1.0
// CPU utilization exporter with tracing logging
use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use herakles_cpu_usage_exporter::sampler::INPUT_NAME;
use herakles_cpu_usage_exporter::{register_builtin_inputs, InputRegistry};
use prometheus::Registry;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, RwLock},
};
use tokio::{
    net::TcpListener,
    signal,
    time::{interval_at, Duration, Instant},
};
use tracing::{debug, info, Level};

mod cli;
mod collector;
mod commands;
mod config;
mod handlers;
mod health_stats;
mod metrics;
mod state;

use cli::{Args, Commands, LogLevel};
use config::{
    resolve_config, show_config, validate_effective_config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{doc_handler, health_handler, metrics_handler};
use health_stats::HealthStats;
use metrics::{ExporterMetrics, UsageMetrics};
use state::{AppState, CycleState};

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {:#}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    setup_logging(&args);

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Check => commands::command_check(&config),
            Commands::Config {
                output,
                format,
                commented,
            } => commands::command_config(output.clone(), format.clone(), *commented),
            Commands::Test {
                iterations,
                pause_ms,
                format,
            } => commands::command_test(*iterations, *pause_ms, format.clone(), &config),
            Commands::GenerateTestdata {
                output,
                snapshots,
                cores,
                step_seconds,
            } => commands::command_generate_testdata(
                output.clone(),
                *snapshots,
                *cores,
                *step_seconds,
            ),
        };
    }

    info!("Starting herakles-cpu-usage-exporter");

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    // Inputs are registered explicitly, once
    let mut inputs = InputRegistry::new();
    register_builtin_inputs(&mut inputs)?;
    debug!("Available inputs: {:?}", inputs.names());
    let input = inputs
        .create(INPUT_NAME, &config.input_config())
        .context("Failed to create cpu input")?;

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let usage_metrics = UsageMetrics::new(&registry, &config.label_keys())?;
    let telemetry = if config.enable_telemetry.unwrap_or(true) {
        Some(ExporterMetrics::new(&registry)?)
    } else {
        None
    };
    debug!("All metrics registered successfully");

    let state = Arc::new(AppState {
        registry,
        usage_metrics,
        telemetry,
        input: Mutex::new(input),
        config: Arc::new(config.clone()),
        health_stats: Arc::new(HealthStats::new()),
        cycle: RwLock::new(CycleState::default()),
    });

    // First cycle only records the baseline
    info!("Performing initial sampling cycle");
    collector::run_cycle(&state);

    // Start background sampling task
    let bg_state = state.clone();
    let period = Duration::from_secs(config.interval_seconds());
    let background_task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        debug!(
            "Background sampling task started with {}s interval",
            period.as_secs()
        );

        loop {
            ticker.tick().await;
            collector::run_cycle(&bg_state);
        }
    });

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes and start listening
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", bind_ip_str, port))?;

    let mut app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/doc", get(doc_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    let app = app.with_state(state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "herakles-cpu-usage-exporter listening on http://{}:{}",
        bind_ip_str, port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    // Cleanup: cancel background task before exit
    background_task.abort();
    let _ = background_task.await;

    info!("herakles-cpu-usage-exporter stopped gracefully");
    Ok(())
}
