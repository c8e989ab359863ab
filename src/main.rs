use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use models::settings::Settings;
use services::event_bridge::EventBridge;
use services::metadata_service::MetadataService;
use services::overlay_server::OverlayServer;
use services::overlay_service::OverlayService;

mod models;
mod services;
mod utils;

fn load_settings() -> Settings {
    match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("[Main] Using default settings: {:#}", e);
            Settings::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    services::diagnostic_logger::init_logging();
    services::diagnostic_logger::set_diagnostics_enabled(settings.diagnostics_enabled);

    let host: IpAddr = settings
        .host
        .parse()
        .with_context(|| format!("Invalid host in settings: {}", settings.host))?;
    let addr = SocketAddr::new(host, settings.port);

    let overlay = OverlayService::new(settings.patch_buffer);
    let metadata = MetadataService::new(
        &settings.metadata_api_base,
        Duration::from_secs(settings.metadata_timeout_secs),
    );
    let bridge = EventBridge::new(overlay.clone(), metadata);

    info!("[Main] Starting chat overlay");

    tokio::select! {
        _ = OverlayServer::run(addr, overlay.clone(), bridge) => {
            warn!("[Main] Overlay server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!(
                "[Main] Shutting down with {} message(s) on screen",
                overlay.visible_count().await
            );
        }
    }

    Ok(())
}
