use crate::models::chat::ChatMessage;
use crate::models::dom::{DomPatch, RenderedMessageNode};
use crate::models::widget::{HideAfter, WidgetConfig};
use crate::services::message_store::MessageStore;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Time between the exit animation starting and the row being removed
pub const EXIT_SETTLE: Duration = Duration::from_secs(1);

/// Shared handle to the message store. All mutations go through its lock.
#[derive(Clone)]
pub struct OverlayService {
    store: Arc<Mutex<MessageStore>>,
}

impl OverlayService {
    pub fn new(patch_buffer: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(MessageStore::new(patch_buffer))),
        }
    }

    pub async fn configure(&self, config: WidgetConfig) -> u64 {
        self.store.lock().await.configure(config)
    }

    pub async fn set_provider(&self, generation: u64, provider: Option<String>) -> bool {
        self.store.lock().await.set_provider(generation, provider)
    }

    pub async fn config(&self) -> WidgetConfig {
        self.store.lock().await.config().clone()
    }

    /// Render a message, arm its expiry and trim the list to the configured limit
    pub async fn ingest(&self, message: &ChatMessage) -> Option<u64> {
        let mut store = self.store.lock().await;
        let index = store.ingest(message)?;

        if let HideAfter::After(delay) = store.config().hide_after {
            let timer = tokio::spawn(Self::expire_after(self.store.clone(), index, delay));
            store.attach_timer(index, timer);
        }

        store.sweep();
        Some(index)
    }

    async fn expire_after(store: Arc<Mutex<MessageStore>>, index: u64, delay: Duration) {
        tokio::time::sleep(delay).await;
        if !store.lock().await.begin_exit(index) {
            return;
        }

        tokio::time::sleep(EXIT_SETTLE).await;
        if store.lock().await.expire(index) {
            debug!("[Overlay] msg-{} expired", index);
        }
    }

    pub async fn delete_one(&self, msg_id: &str) -> usize {
        self.store.lock().await.delete_one(msg_id)
    }

    pub async fn delete_all_for(&self, user_id: &str) -> usize {
        self.store.lock().await.delete_all_for(user_id)
    }

    /// Current list as a reset patch, plus a receiver for everything after it
    pub async fn subscribe(&self) -> (DomPatch, broadcast::Receiver<DomPatch>) {
        let store = self.store.lock().await;
        (store.snapshot(), store.subscribe())
    }

    pub async fn visible_count(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn visible_nodes(&self) -> Vec<RenderedMessageNode> {
        self.store.lock().await.nodes().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dom::NodePhase;

    fn config(hide_after: HideAfter, limit: usize) -> WidgetConfig {
        WidgetConfig {
            hide_after,
            messages_limit: limit,
            ..Default::default()
        }
    }

    fn message(user: &str, msg_id: &str) -> ChatMessage {
        ChatMessage {
            display_name: user.to_string(),
            user_id: format!("id-{}", user),
            msg_id: msg_id.to_string(),
            text: "hello".to_string(),
            ..Default::default()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_animates_out_then_disappears() {
        let overlay = OverlayService::new(64);
        overlay
            .configure(config(HideAfter::After(Duration::from_secs(5)), 10))
            .await;

        let index = overlay.ingest(&message("ann", "m-1")).await.unwrap();
        settle().await;

        tokio::time::advance(Duration::from_millis(4900)).await;
        settle().await;
        assert_eq!(overlay.visible_nodes().await[0].phase, NodePhase::Visible);

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        let nodes = overlay.visible_nodes().await;
        assert_eq!(nodes[0].index, index);
        assert_eq!(nodes[0].phase, NodePhase::AnimatingOut);

        tokio::time::advance(EXIT_SETTLE).await;
        settle().await;
        assert_eq!(overlay.visible_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_expiring_messages_stay() {
        let overlay = OverlayService::new(64);
        overlay.configure(config(HideAfter::Never, 10)).await;

        overlay.ingest(&message("ann", "m-1")).await;
        tokio::time::advance(Duration::from_secs(3600)).await;
        settle().await;

        assert_eq!(overlay.visible_count().await, 1);
        assert_eq!(overlay.delete_one("m-1").await, 1);
        assert_eq!(overlay.visible_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_expiring_messages_still_evicted_by_count() {
        let overlay = OverlayService::new(64);
        overlay.configure(config(HideAfter::Never, 2)).await;

        for i in 0..4 {
            overlay.ingest(&message("ann", &format!("m-{}", i))).await;
            assert!(overlay.visible_count().await <= 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_removal_wins() {
        let overlay = OverlayService::new(64);
        overlay
            .configure(config(HideAfter::After(Duration::from_secs(2)), 1))
            .await;
        let (_, mut rx) = overlay.subscribe().await;

        overlay.ingest(&message("ann", "m-1")).await;
        overlay.ingest(&message("bob", "m-2")).await;
        settle().await;
        // m-1 was evicted; its timer must not touch anything later
        assert_eq!(overlay.delete_one("m-2").await, 1);
        assert_eq!(overlay.delete_one("m-2").await, 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        let mut removals = Vec::new();
        while let Ok(patch) = rx.try_recv() {
            assert_ne!(patch_kind(&patch), "animate-out");
            if let DomPatch::Remove { id, .. } = patch {
                removals.push(id);
            }
        }
        assert_eq!(removals, vec!["msg-1".to_string(), "msg-2".to_string()]);
    }

    fn patch_kind(patch: &DomPatch) -> &'static str {
        match patch {
            DomPatch::Insert { .. } => "insert",
            DomPatch::AnimateOut { .. } => "animate-out",
            DomPatch::Remove { .. } => "remove",
            DomPatch::Reset { .. } => "reset",
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_after_expiry_is_noop() {
        let overlay = OverlayService::new(64);
        overlay
            .configure(config(HideAfter::After(Duration::from_secs(1)), 10))
            .await;

        overlay.ingest(&message("ann", "m-1")).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(overlay.visible_count().await, 0);
        assert_eq!(overlay.delete_one("m-1").await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_snapshot_matches_list() {
        let overlay = OverlayService::new(64);
        overlay.configure(config(HideAfter::Never, 10)).await;
        overlay.ingest(&message("ann", "m-1")).await;

        let (snapshot, _rx) = overlay.subscribe().await;
        match snapshot {
            DomPatch::Reset { nodes } => assert_eq!(nodes.len(), 1),
            other => panic!("unexpected patch {:?}", other),
        }
    }
}
