// ESC/POS receipt print service for a single USB thermal printer.

use actix_web::{middleware, web, App, HttpServer};
use std::net::SocketAddr;
use tracing::{error, info};

use pos_print_service::config::Config;
use pos_print_service::errors::AppError;
use pos_print_service::printers::{self, SharedPrinter};
use pos_print_service::routes;

// ============================================================================
// Application State
// ============================================================================

/// Centralized application state container
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub printer: Option<SharedPrinter>,
}

impl AppState {
    /// Create a new application state instance
    async fn new(config: Config) -> Self {
        info!("Initializing application state");

        // Initialize printer (non-critical)
        let printer = Self::initialize_printer(&config).await;

        Self { config, printer }
    }

    async fn initialize_printer(config: &Config) -> Option<SharedPrinter> {
        match printers::detect_printer(&config.printer).await {
            Some(device) => {
                info!("Printer initialized: {}", device.describe());
                Some(printers::share(device))
            }
            None => {
                info!("Print service will operate in mock mode");
                None
            }
        }
    }
}

// ============================================================================
// Shutdown Handling
// ============================================================================

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully..."),
        _ = terminate => info!("SIGTERM received, shutting down gracefully..."),
    }
}

fn log_banner(state: &AppState) {
    info!("================================");
    info!("POS Print Service");
    info!("================================");
    info!("Server running on port {}", state.config.server.port);
    info!("Environment: {}", state.config.mode.as_str());
    info!(
        "Printer status: {}",
        if state.printer.is_some() {
            "Available"
        } else {
            "Mock Mode"
        }
    );
    info!("================================");
    info!("Available endpoints:");
    for endpoint in routes::ENDPOINTS {
        info!("  {}", endpoint);
    }
    info!("================================");
}

fn load_config() -> Result<(Config, SocketAddr), AppError> {
    let config = Config::from_env()?;
    let socket_addr = config.socket_addr()?;
    Ok((config, socket_addr))
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // ========================================
    // Phase 1: Basic Initialization
    // ========================================

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting print service");

    // ========================================
    // Phase 2: Configuration & State Setup
    // ========================================

    let (config, socket_addr) = load_config().map_err(|e| {
        error!("{}", e);
        io_error("Failed to load configuration", e)
    })?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", socket_addr);

    let app_state = AppState::new(config.clone()).await;

    // ========================================
    // Phase 3: HTTP Server Setup
    // ========================================

    let app_state_for_server = app_state.clone();

    // One worker: the printer is a single exclusive resource
    let server = HttpServer::new(move || {
        let state = app_state_for_server.clone();
        App::new()
            // Middleware
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            // Application state
            .app_data(web::Data::new(state.config))
            .app_data(web::Data::new(state.printer))
            .configure(routes::configure)
    })
    .workers(1)
    .bind(socket_addr)?
    .shutdown_timeout(config.server.shutdown_timeout_secs)
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    log_banner(&app_state);

    // ========================================
    // Phase 4: Run Until Shutdown
    // ========================================

    shutdown_signal().await;

    // ========================================
    // Phase 5: Graceful Shutdown
    // ========================================

    info!(
        "Waiting up to {:?} for in-flight requests",
        config.shutdown_timeout()
    );

    // Stop accepting new connections and wait for existing ones to complete
    server_handle.stop(true).await;

    server_task
        .await
        .map_err(|e| io_error("Server task error", e))??;

    info!("Server closed");
    Ok(())
}
