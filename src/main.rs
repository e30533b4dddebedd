//! # House Audio Backend - Main Application Entry Point
//!
//! This is the main entry point for the house-audio-backend web server: the
//! audio session control core behind the wall-mounted UI. It arbitrates
//! among mutually exclusive audio sources (streaming placeholder, uploaded
//! files, live voice announcements, synthesized speech) and pushes every
//! state change to all connected clients.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and request metrics
//! - **events**: Observer registry and event fan-out
//! - **playback**: The state machine owning "what is currently audible"
//! - **audio**: Uploaded-audio catalog and disk store
//! - **voice**: Chunked voice ingestion and text-to-speech
//! - **websocket**: One actor per client connection (event channel + voice
//!   recording protocol)
//! - **handlers**: HTTP request handlers for API endpoints
//! - **health / middleware / error**: Monitoring, request accounting, and
//!   the error taxonomy

mod audio;
mod config;
mod error;
mod events;
mod handlers;
mod health;
mod middleware;
mod playback;
mod state;
mod voice;
mod websocket;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use audio::{AudioLibrary, DiskStore};
use config::AppConfig;
use events::EventHub;
use playback::PlaybackController;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice::{SynthesisClient, VoiceIngest};

/// Output level a fresh process starts with, until a client sets one.
const DEFAULT_VOLUME: u8 = 50;

/// Global shutdown signal set by the SIGTERM/SIGINT handlers and polled by
/// the main task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Wires the core**: event hub → playback controller → library and
///    voice ingestion, all sharing the same hub so every mutation is
///    broadcast
/// 3. **Configures the HTTP server** with middleware and routes
/// 4. **Handles graceful shutdown** when receiving system signals
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting house-audio-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    // Wire the core components. The hub comes first because everything
    // publishes through it.
    let hub = Arc::new(EventHub::new());

    let store = DiskStore::new(&config.storage.uploads_dir);
    store.init().await?;
    let library = Arc::new(AudioLibrary::new(store, hub.clone()));

    let controller = PlaybackController::new(
        hub.clone(),
        config.voice.assumed_bytes_per_sec,
        DEFAULT_VOLUME,
    );

    let synthesizer = SynthesisClient::new(&config.synthesis)?;
    let voice = VoiceIngest::new(
        Duration::from_secs(config.voice.inactivity_timeout_secs),
        config.voice.max_chunk_bytes,
        controller.clone(),
        synthesizer,
        hub.clone(),
    );

    let app_state = AppState::new(config.clone(), hub, library, controller, voice);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::RequestMetrics)
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/audio/files", web::get().to(handlers::list_files))
                    .route("/audio/upload", web::post().to(handlers::upload_audio))
                    .route("/audio/play/{id}", web::post().to(handlers::play_file))
                    .route("/audio/volume", web::post().to(handlers::set_volume))
                    .route("/audio/stop", web::post().to(handlers::stop_playback))
                    .route("/playback/state", web::get().to(handlers::get_playback_state))
                    .route("/spotify/config", web::get().to(handlers::get_spotify_config))
                    .route("/spotify/play", web::post().to(handlers::play_spotify))
                    .route(
                        "/announcements/text-to-speech",
                        web::post().to(handlers::text_to_speech),
                    )
                    .route("/ws", web::get().to(websocket::event_socket)),
            )
            // Health check at root level for load balancers
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Race the server against the shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info",
///   "house_audio_backend=debug")
/// - If not set, defaults to "house_audio_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "house_audio_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown.
///
/// Listens for SIGTERM and SIGINT; when either arrives, the global shutdown
/// flag is set so in-flight requests can finish before the server stops.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set, checking every 100ms.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
