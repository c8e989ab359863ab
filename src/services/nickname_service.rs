use crate::models::chat::ChatMessage;
use crate::models::widget::{NickColorMode, WidgetConfig};
use crate::utils::html::escape_html;
use sha2::{Digest, Sha256};

const COLOR_HASH_OFFSET: usize = 26;
const COLOR_HEX_LEN: usize = 6;

/// Stable CSS color for users without one: six hex digits of the name's digest
pub fn hashed_color(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("#{}", &hex[COLOR_HASH_OFFSET..COLOR_HASH_OFFSET + COLOR_HEX_LEN])
}

/// Display name plus trailing colon, wrapped in a colored span unless colors are hidden
pub fn format_username(message: &ChatMessage, config: &WidgetConfig) -> String {
    let username = format!("{}:", message.display_name);

    let color = match config.nick_color_mode {
        NickColorMode::User => match message.display_color.as_deref() {
            Some(color) if !color.is_empty() => color.to_string(),
            _ => hashed_color(&username),
        },
        NickColorMode::Custom => config.custom_nick_color.clone(),
        NickColorMode::Hide => return escape_html(&username),
    };

    format!(
        r#"<span style="color:{}">{}</span>"#,
        escape_html(&color),
        escape_html(&username)
    )
}
