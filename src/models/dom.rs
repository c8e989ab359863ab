use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodePhase {
    Visible,
    AnimatingOut,
}

/// A message row as it exists in the overlay list
#[derive(Serialize, Clone, Debug)]
pub struct RenderedMessageNode {
    pub index: u64,
    pub sender_id: String,
    pub msg_id: String,
    pub badges_html: String,
    pub username_html: String,
    pub body_html: String,
    pub is_action: bool,
    pub phase: NodePhase,
    /// Entrance animation class the row was inserted with
    pub animation_in: String,
    pub created_at: String,
    /// Full row markup, as sent to the page
    pub html: String,
}

impl RenderedMessageNode {
    pub fn dom_id(&self) -> String {
        dom_id(self.index)
    }
}

pub fn dom_id(index: u64) -> String {
    format!("msg-{}", index)
}

/// A DOM mutation for the overlay page
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DomPatch {
    /// Prepend `html` to the list; `grow` plays the width entrance
    Insert { id: String, html: String, grow: bool },
    AnimateOut {
        id: String,
        remove_class: String,
        add_class: String,
    },
    /// `fade` is set for count eviction
    Remove { id: String, fade: bool },
    /// Replace the whole list, newest first
    Reset { nodes: Vec<NodeSnapshotPatch> },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NodeSnapshotPatch {
    pub id: String,
    pub html: String,
    pub animating_out: bool,
}

impl From<&RenderedMessageNode> for NodeSnapshotPatch {
    fn from(node: &RenderedMessageNode) -> Self {
        Self {
            id: node.dom_id(),
            html: node.html.clone(),
            animating_out: node.phase == NodePhase::AnimatingOut,
        }
    }
}
