use serde::{Deserialize, Serialize};

use crate::models::lenient;
use std::collections::HashSet;
use std::time::Duration;

/// `hideAfter` value that disables expiry
pub const HIDE_AFTER_NEVER: f64 = 999.0;

const DEFAULT_HIDE_AFTER_SECS: f64 = 60.0;
const DEFAULT_MESSAGES_LIMIT: usize = 10;

/// Raw widget fields as the host sends them. Every field is optional;
/// null or mistyped values count as unset.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldData {
    #[serde(deserialize_with = "lenient::optional_text")]
    pub animation_in: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub animation_out: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub hide_after: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub messages_limit: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub nick_color: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub custom_nick_color: Option<String>,
    /// `"yes"`, or a checkbox `true`
    #[serde(deserialize_with = "lenient::optional_text")]
    pub hide_commands: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub noname: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub ignored_users: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ChannelInfo {
    #[serde(deserialize_with = "lenient::text")]
    pub username: String,
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
}

/// `onWidgetLoad` detail
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetLoadDetail {
    #[serde(deserialize_with = "lenient::or_default")]
    pub field_data: FieldData,
    #[serde(deserialize_with = "lenient::or_default")]
    pub channel: ChannelInfo,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NickColorMode {
    User,
    Custom,
    Hide,
}

impl NickColorMode {
    fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("user") => NickColorMode::User,
            Some("custom") => NickColorMode::Custom,
            Some(_) => NickColorMode::Hide,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HideAfter {
    Never,
    After(Duration),
}

impl HideAfter {
    fn from_seconds(seconds: Option<f64>) -> Self {
        match seconds {
            Some(s) if s == HIDE_AFTER_NEVER => HideAfter::Never,
            Some(s) => match Duration::try_from_secs_f64(s) {
                Ok(delay) => HideAfter::After(delay),
                Err(_) => Self::default_delay(),
            },
            None => Self::default_delay(),
        }
    }

    fn default_delay() -> Self {
        HideAfter::After(Duration::from_secs_f64(DEFAULT_HIDE_AFTER_SECS))
    }
}

/// Normalised widget configuration, read by every message operation
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    pub animation_in: String,
    pub animation_out: String,
    pub hide_after: HideAfter,
    pub messages_limit: usize,
    pub nick_color_mode: NickColorMode,
    pub custom_nick_color: String,
    pub hide_command_messages: bool,
    /// Only the first message of a consecutive run shows name and badges
    pub no_name_on_repeat: bool,
    pub ignored_usernames: HashSet<String>,
    pub channel_name: String,
    pub channel_id: String,
    pub provider: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig::from_detail(&WidgetLoadDetail::default())
    }
}

impl WidgetConfig {
    pub fn from_detail(detail: &WidgetLoadDetail) -> Self {
        let fields = &detail.field_data;

        let messages_limit = match fields.messages_limit {
            Some(n) if n.is_finite() && n >= 0.0 => n as usize,
            _ => DEFAULT_MESSAGES_LIMIT,
        };

        Self {
            animation_in: fields
                .animation_in
                .clone()
                .unwrap_or_else(|| "bounceIn".to_string()),
            animation_out: fields
                .animation_out
                .clone()
                .unwrap_or_else(|| "bounceOut".to_string()),
            hide_after: HideAfter::from_seconds(fields.hide_after),
            messages_limit,
            nick_color_mode: NickColorMode::parse(fields.nick_color.as_deref()),
            custom_nick_color: fields.custom_nick_color.clone().unwrap_or_default(),
            hide_command_messages: matches!(fields.hide_commands.as_deref(), Some("yes" | "true")),
            no_name_on_repeat: fields.noname.as_deref().unwrap_or("show") == "show",
            ignored_usernames: parse_ignored_users(fields.ignored_users.as_deref()),
            channel_name: detail.channel.username.clone(),
            channel_id: detail.channel.id.clone(),
            provider: None,
        }
    }

    pub fn is_ignored(&self, login: &str) -> bool {
        self.ignored_usernames.contains(&login.trim().to_lowercase())
    }
}

/// Comma separated, case-insensitive; every entry is trimmed and empties dropped
pub fn parse_ignored_users(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}
