use crate::models::chat::{ChatMessage, EmoteRef};
use crate::models::dom::{dom_id, DomPatch, NodePhase, NodeSnapshotPatch, RenderedMessageNode};
use crate::models::widget::WidgetConfig;
use crate::services::badge_service::render_badges;
use crate::services::emote_service::substitute_emotes;
use crate::services::nickname_service::format_username;
use crate::utils::html::escape_html;
use chrono::Utc;
use log::debug;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const COMMAND_PREFIX: char = '!';

struct NodeEntry {
    node: RenderedMessageNode,
    /// Expiry task; aborted when the node leaves by any other path
    timer: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Expired,
    Evicted,
    Deleted,
}

/// The overlay's message list and everything needed to render into it.
///
/// Nodes are kept newest first, so the deque is ordered by descending index.
pub struct MessageStore {
    config: WidgetConfig,
    config_generation: u64,
    total_messages: u64,
    previous_sender: String,
    nodes: VecDeque<NodeEntry>,
    by_msg_id: HashMap<String, HashSet<u64>>,
    by_sender: HashMap<String, HashSet<u64>>,
    patches: broadcast::Sender<DomPatch>,
}

impl MessageStore {
    pub fn new(patch_buffer: usize) -> Self {
        let (patches, _rx) = broadcast::channel(patch_buffer.max(1));
        Self {
            config: WidgetConfig::default(),
            config_generation: 0,
            total_messages: 0,
            previous_sender: String::new(),
            nodes: VecDeque::new(),
            by_msg_id: HashMap::new(),
            by_sender: HashMap::new(),
            patches,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Install a freshly loaded configuration and return its generation
    pub fn configure(&mut self, config: WidgetConfig) -> u64 {
        self.config = config;
        self.config_generation += 1;
        self.config_generation
    }

    /// Record the resolved provider, unless a newer configuration replaced the one it belongs to
    pub fn set_provider(&mut self, generation: u64, provider: Option<String>) -> bool {
        if generation != self.config_generation {
            return false;
        }
        self.config.provider = provider;
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomPatch> {
        self.patches.subscribe()
    }

    pub fn snapshot(&self) -> DomPatch {
        DomPatch::Reset {
            nodes: self
                .nodes
                .iter()
                .map(|entry| NodeSnapshotPatch::from(&entry.node))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visible nodes, newest first
    pub fn nodes(&self) -> impl Iterator<Item = &RenderedMessageNode> {
        self.nodes.iter().map(|entry| &entry.node)
    }

    pub fn node(&self, index: u64) -> Option<&RenderedMessageNode> {
        self.position(index).map(|pos| &self.nodes[pos].node)
    }

    fn position(&self, index: u64) -> Option<usize> {
        self.nodes
            .binary_search_by(|entry| index.cmp(&entry.node.index))
            .ok()
    }

    fn should_skip(&self, message: &ChatMessage) -> bool {
        if self.config.hide_command_messages && message.text.starts_with(COMMAND_PREFIX) {
            return true;
        }
        self.config.is_ignored(message.sender_login())
    }

    /// Render a message and put it at the top of the list.
    ///
    /// Returns the new node's index, or `None` when the message is filtered out
    /// or a node with the same msgId is already visible.
    /// The caller arms the expiry timer and runs [`MessageStore::sweep`].
    pub fn ingest(&mut self, message: &ChatMessage) -> Option<u64> {
        if self.should_skip(message) {
            debug!(
                "[Overlay] Skipping message {} from {}",
                message.msg_id,
                message.sender_login()
            );
            return None;
        }
        // Every open overlay page forwards the same host events
        if !message.msg_id.is_empty() && self.by_msg_id.contains_key(&message.msg_id) {
            debug!("[Overlay] Dropping duplicate message {}", message.msg_id);
            return None;
        }

        let emotes: Vec<EmoteRef> = message
            .emotes
            .iter()
            .map(|emote| EmoteRef {
                name: escape_html(&emote.name),
                urls: emote.urls.clone(),
            })
            .collect();
        let body_html = substitute_emotes(&escape_html(&message.text), &emotes);
        let mut badges_html = render_badges(message, self.config.provider.as_deref());
        let mut username_html = format_username(message, &self.config);

        if self.config.no_name_on_repeat {
            if self.previous_sender != username_html {
                self.previous_sender = username_html.clone();
            } else {
                username_html.clear();
                badges_html.clear();
            }
        }

        self.total_messages += 1;
        let index = self.total_messages;

        let action_class = if message.is_action { "action" } else { "" };
        let html = format!(
            r#"<div data-sender="{sender}" data-msgid="{msg_id}" class="message-row animated {animation_in}" id="{id}"><div class="user-box {action}">{badges}{username}</div><div class="user-message {action}">{body}</div></div>"#,
            sender = escape_html(&message.user_id),
            msg_id = escape_html(&message.msg_id),
            animation_in = escape_html(&self.config.animation_in),
            id = dom_id(index),
            action = action_class,
            badges = badges_html,
            username = username_html,
            body = body_html,
        );

        let node = RenderedMessageNode {
            index,
            sender_id: message.user_id.clone(),
            msg_id: message.msg_id.clone(),
            badges_html,
            username_html,
            body_html,
            is_action: message.is_action,
            phase: NodePhase::Visible,
            animation_in: self.config.animation_in.clone(),
            created_at: Utc::now().to_rfc3339(),
            html: html.clone(),
        };

        if !node.msg_id.is_empty() {
            self.by_msg_id
                .entry(node.msg_id.clone())
                .or_default()
                .insert(index);
        }
        if !node.sender_id.is_empty() {
            self.by_sender
                .entry(node.sender_id.clone())
                .or_default()
                .insert(index);
        }
        self.nodes.push_front(NodeEntry { node, timer: None });

        self.publish(DomPatch::Insert {
            id: dom_id(index),
            html,
            grow: true,
        });

        debug!("[Overlay] Inserted {} ({} visible)", dom_id(index), self.nodes.len());
        Some(index)
    }

    /// Hand the node its expiry task. If the node is already gone the task is aborted.
    pub fn attach_timer(&mut self, index: u64, timer: JoinHandle<()>) {
        match self.position(index) {
            Some(pos) => self.nodes[pos].timer = Some(timer),
            None => timer.abort(),
        }
    }

    /// Remove every node past the configured limit, oldest first
    pub fn sweep(&mut self) -> usize {
        let limit = self.config.messages_limit;
        let mut evicted = 0;
        while self.nodes.len() > limit {
            let Some(index) = self.nodes.back().map(|entry| entry.node.index) else {
                break;
            };
            if self.remove(index, Removal::Evicted) {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("[Overlay] Evicted {} message(s) over limit {}", evicted, limit);
        }
        evicted
    }

    /// Swap the entrance animation for the exit one. False when the node is gone.
    pub fn begin_exit(&mut self, index: u64) -> bool {
        let Some(pos) = self.position(index) else {
            return false;
        };
        let node = &mut self.nodes[pos].node;
        if node.phase == NodePhase::AnimatingOut {
            return false;
        }
        node.phase = NodePhase::AnimatingOut;
        node.html = node.html.replacen(
            &format!("animated {}", escape_html(&node.animation_in)),
            &format!("animated {}", escape_html(&self.config.animation_out)),
            1,
        );

        let patch = DomPatch::AnimateOut {
            id: dom_id(index),
            remove_class: node.animation_in.clone(),
            add_class: self.config.animation_out.clone(),
        };
        self.publish(patch);
        true
    }

    /// Final step of the expiry path
    pub fn expire(&mut self, index: u64) -> bool {
        self.remove(index, Removal::Expired)
    }

    pub fn delete_one(&mut self, msg_id: &str) -> usize {
        let Some(indices) = self.by_msg_id.get(msg_id).cloned() else {
            debug!("[Overlay] No message {} to delete", msg_id);
            return 0;
        };
        indices
            .into_iter()
            .filter(|index| self.remove(*index, Removal::Deleted))
            .count()
    }

    pub fn delete_all_for(&mut self, user_id: &str) -> usize {
        let Some(indices) = self.by_sender.get(user_id).cloned() else {
            debug!("[Overlay] No messages from {} to delete", user_id);
            return 0;
        };
        indices
            .into_iter()
            .filter(|index| self.remove(*index, Removal::Deleted))
            .count()
    }

    fn remove(&mut self, index: u64, removal: Removal) -> bool {
        let Some(pos) = self.position(index) else {
            return false;
        };
        let Some(entry) = self.nodes.remove(pos) else {
            return false;
        };

        // The expiry task is the caller on the Expired path
        if removal != Removal::Expired {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }

        unindex(&mut self.by_msg_id, &entry.node.msg_id, index);
        unindex(&mut self.by_sender, &entry.node.sender_id, index);

        self.publish(DomPatch::Remove {
            id: dom_id(index),
            fade: removal == Removal::Evicted,
        });
        true
    }

    fn publish(&self, patch: DomPatch) {
        // No connected page is fine; the snapshot catches it up later
        let _ = self.patches.send(patch);
    }
}

fn unindex(map: &mut HashMap<String, HashSet<u64>>, key: &str, index: u64) {
    if let Some(set) = map.get_mut(key) {
        set.remove(&index);
        if set.is_empty() {
            map.remove(key);
        }
    }
}
