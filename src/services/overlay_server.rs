use crate::models::chat::BridgeEvent;
use crate::models::dom::DomPatch;
use crate::services::diagnostic_logger::is_diagnostics_enabled;
use crate::services::event_bridge::EventBridge;
use crate::services::overlay_service::OverlayService;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rust_embed::RustEmbed;
use serde_json::json;
use std::net::SocketAddr;
use tokio::sync::broadcast::error::RecvError;
use warp::http::StatusCode;
use warp::Filter;

#[derive(RustEmbed)]
#[folder = "overlay/"]
pub struct OverlayAssets;

pub struct OverlayServer;

impl OverlayServer {
    /// Serve the overlay page, the patch websocket and the bridge endpoint
    pub async fn run(addr: SocketAddr, overlay: OverlayService, bridge: EventBridge) {
        let routes = Self::routes(overlay, bridge);

        info!("[Server] Overlay available at http://{}/", addr);
        warp::serve(routes).run(addr).await;
    }

    fn routes(
        overlay: OverlayService,
        bridge: EventBridge,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let overlay_ws = overlay.clone();
        let bridge_ws = bridge.clone();
        let ws = warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .map(move |ws: warp::ws::Ws| {
                let overlay = overlay_ws.clone();
                let bridge = bridge_ws.clone();
                ws.on_upgrade(move |socket| Self::handle_ws(socket, overlay, bridge))
            });

        let post_bridge = warp::post()
            .and(warp::path("bridge"))
            .and(warp::path::end())
            .and(warp::body::json())
            .and(warp::any().map(move || bridge.clone()))
            .and_then(Self::bridge_handler);

        let health = warp::get()
            .and(warp::path("health"))
            .and(warp::path::end())
            .and(warp::any().map(move || overlay.clone()))
            .and_then(Self::health_handler);

        let assets = warp::get()
            .and(warp::path::tail())
            .and_then(Self::serve_asset);

        ws.or(post_bridge).or(health).or(assets)
    }

    async fn bridge_handler(
        event: BridgeEvent,
        bridge: EventBridge,
    ) -> Result<impl warp::Reply, warp::Rejection> {
        bridge.handle(event).await;
        Ok(warp::reply::with_status(warp::reply(), StatusCode::ACCEPTED))
    }

    async fn health_handler(overlay: OverlayService) -> Result<impl warp::Reply, warp::Rejection> {
        let config = overlay.config().await;
        Ok(warp::reply::json(&json!({
            "status": "ok",
            "visible": overlay.visible_count().await,
            "channel": config.channel_name,
            "provider": config.provider,
            "diagnostics": is_diagnostics_enabled(),
        })))
    }

    async fn serve_asset(path: warp::path::Tail) -> Result<impl warp::Reply, warp::Rejection> {
        let file_path = match path.as_str() {
            "" | "/" => "index.html",
            other => other,
        };

        let file = OverlayAssets::get(file_path).ok_or_else(warp::reject::not_found)?;
        let mime = mime_guess::from_path(file_path)
            .first_or_octet_stream()
            .to_string();

        Ok(warp::reply::with_header(
            file.data.into_owned(),
            "Content-Type",
            mime,
        ))
    }

    /// Push DOM patches to the page and feed its bridge events back in
    async fn handle_ws(socket: warp::ws::WebSocket, overlay: OverlayService, bridge: EventBridge) {
        let (mut ws_tx, mut ws_rx) = socket.split();
        let (snapshot, mut patches) = overlay.subscribe().await;

        debug!("[WS] Overlay page connected");

        if Self::send_patch(&mut ws_tx, &snapshot).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                patch = patches.recv() => match patch {
                    Ok(patch) => {
                        if Self::send_patch(&mut ws_tx, &patch).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[WS] Page fell {} patches behind, resending list", skipped);
                        let (snapshot, fresh) = overlay.subscribe().await;
                        patches = fresh;
                        if Self::send_patch(&mut ws_tx, &snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(message)) => {
                        if message.is_close() {
                            break;
                        }
                        if let Ok(text) = message.to_str() {
                            bridge.handle_json(text).await;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("[WS] Socket error: {}", e);
                        break;
                    }
                    None => break,
                },
            }
        }

        debug!("[WS] Overlay page disconnected");
    }

    async fn send_patch<S>(ws_tx: &mut S, patch: &DomPatch) -> Result<()>
    where
        S: futures_util::Sink<warp::ws::Message, Error = warp::Error> + Unpin,
    {
        let text = serde_json::to_string(patch)?;
        ws_tx.send(warp::ws::Message::text(text)).await?;
        Ok(())
    }
}
