use crate::models::chat::{BadgeRef, ChatMessage};
use crate::utils::html::escape_html;

/// Provider whose messages get the sender's avatar appended as a badge
pub const AVATAR_BADGE_PROVIDER: &str = "mixer";

/// Render the message's badges as inline images, in list order
pub fn render_badges(message: &ChatMessage, provider: Option<&str>) -> String {
    let mut badges = message.badges.clone();

    if provider == Some(AVATAR_BADGE_PROVIDER) {
        if let Some(avatar) = message.avatar.as_deref().filter(|a| !a.is_empty()) {
            badges.push(BadgeRef {
                url: avatar.to_string(),
            });
        }
    }

    badges
        .iter()
        .map(|badge| format!(r#"<img alt="" src="{}" class="badge"> "#, escape_html(&badge.url)))
        .collect()
}
