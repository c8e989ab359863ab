use crate::models::chat::{BridgeEvent, ChatEvent, EventReceivedDetail};
use crate::models::widget::{WidgetConfig, WidgetLoadDetail};
use crate::services::metadata_service::MetadataService;
use crate::services::overlay_service::OverlayService;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

/// Routes host events into the overlay
#[derive(Clone)]
pub struct EventBridge {
    overlay: OverlayService,
    metadata: MetadataService,
}

impl EventBridge {
    pub fn new(overlay: OverlayService, metadata: MetadataService) -> Self {
        Self { overlay, metadata }
    }

    pub async fn handle(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::WidgetLoad(detail) => {
                self.on_widget_load(detail).await;
            }
            BridgeEvent::EventReceived(detail) => self.on_event_received(detail).await,
        }
    }

    /// Decode a raw JSON bridge frame and handle it. Undecodable frames are dropped.
    pub async fn handle_json(&self, raw: &str) {
        match serde_json::from_str::<BridgeEvent>(raw) {
            Ok(event) => self.handle(event).await,
            Err(e) => warn!("[Bridge] Dropping undecodable event: {}", e),
        }
    }

    /// Install the configuration, then resolve the provider in the background.
    /// Messages keep rendering while the lookup is in flight.
    pub async fn on_widget_load(&self, detail: WidgetLoadDetail) -> JoinHandle<()> {
        let config = WidgetConfig::from_detail(&detail);
        let channel_id = config.channel_id.clone();

        info!(
            "[Bridge] Widget loaded for channel {} (limit {}, hide after {:?})",
            config.channel_name, config.messages_limit, config.hide_after
        );

        let generation = self.overlay.configure(config).await;

        let overlay = self.overlay.clone();
        let metadata = self.metadata.clone();
        tokio::spawn(async move {
            match metadata.fetch_channel(&channel_id).await {
                Ok(channel) => {
                    let provider = channel.provider;
                    if overlay.set_provider(generation, provider.clone()).await {
                        info!("[Bridge] Channel provider resolved: {:?}", provider);
                    } else {
                        debug!("[Bridge] Discarding provider for superseded configuration");
                    }
                }
                Err(e) => {
                    warn!("[Bridge] Channel metadata lookup failed: {:#}", e);
                }
            }
        })
    }

    pub async fn on_event_received(&self, detail: EventReceivedDetail) {
        let event = match detail.into_chat_event() {
            Ok(event) => event,
            Err(e) => {
                warn!("[Bridge] Dropping malformed chat event: {}", e);
                return;
            }
        };

        match event {
            ChatEvent::Message(message) => {
                self.overlay.ingest(&message).await;
            }
            ChatEvent::DeleteMessage { msg_id } => {
                let removed = self.overlay.delete_one(&msg_id).await;
                debug!("[Bridge] delete-message {} removed {}", msg_id, removed);
            }
            ChatEvent::DeleteMessages { user_id } => {
                let removed = self.overlay.delete_all_for(&user_id).await;
                debug!("[Bridge] delete-messages {} removed {}", user_id, removed);
            }
            ChatEvent::Ignored(listener) => {
                debug!("[Bridge] Ignoring listener {}", listener);
            }
        }
    }
}
