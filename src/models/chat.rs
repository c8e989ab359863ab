use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::lenient;
use crate::models::widget::WidgetLoadDetail;

/// An emote as delivered by the host: the literal token and its size variants.
/// `urls` keeps the host's key order; the last key is the largest variant.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EmoteRef {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub urls: Map<String, Value>,
}

impl EmoteRef {
    /// URL of the last inserted size variant
    pub fn largest_url(&self) -> Option<&str> {
        self.urls.iter().next_back().and_then(|(_, url)| url.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BadgeRef {
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: String,
}

/// A chat message from the `message` listener (`event.data`).
/// Null or mistyped fields decode to their defaults.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "lenient::text")]
    pub display_name: String,
    /// Login name, used for the ignore list
    #[serde(default, deserialize_with = "lenient::text")]
    pub nick: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub msg_id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub emotes: Vec<EmoteRef>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub badges: Vec<BadgeRef>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub is_action: bool,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub display_color: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub avatar: Option<String>,
}

impl ChatMessage {
    /// Name matched against the ignore list
    pub fn sender_login(&self) -> &str {
        if self.nick.is_empty() {
            &self.display_name
        } else {
            &self.nick
        }
    }
}

/// `onEventReceived` detail. `event` stays raw until the listener is known.
#[derive(Deserialize, Clone, Debug)]
pub struct EventReceivedDetail {
    #[serde(default, deserialize_with = "lenient::text")]
    pub listener: String,
    #[serde(default)]
    pub event: Value,
}

#[derive(Deserialize, Debug)]
struct MessageEvent {
    data: ChatMessage,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DeleteMessageEvent {
    #[serde(default, deserialize_with = "lenient::text")]
    msg_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DeleteMessagesEvent {
    #[serde(default, deserialize_with = "lenient::text")]
    user_id: String,
}

/// What a chat event asks the overlay to do
#[derive(Debug)]
pub enum ChatEvent {
    Message(ChatMessage),
    DeleteMessage { msg_id: String },
    DeleteMessages { user_id: String },
    Ignored(String),
}

impl EventReceivedDetail {
    /// Resolve the listener discriminant and decode the matching payload
    pub fn into_chat_event(self) -> serde_json::Result<ChatEvent> {
        match self.listener.as_str() {
            "message" => {
                let event: MessageEvent = serde_json::from_value(self.event)?;
                Ok(ChatEvent::Message(event.data))
            }
            "delete-message" => {
                let event: DeleteMessageEvent = serde_json::from_value(self.event)?;
                Ok(ChatEvent::DeleteMessage {
                    msg_id: event.msg_id,
                })
            }
            "delete-messages" => {
                let event: DeleteMessagesEvent = serde_json::from_value(self.event)?;
                Ok(ChatEvent::DeleteMessages {
                    user_id: event.user_id,
                })
            }
            _ => Ok(ChatEvent::Ignored(self.listener)),
        }
    }
}

/// One event from the host bridge, named after the window event it came from
#[derive(Deserialize, Debug)]
#[serde(tag = "event", content = "detail")]
pub enum BridgeEvent {
    #[serde(rename = "onWidgetLoad")]
    WidgetLoad(WidgetLoadDetail),
    #[serde(rename = "onEventReceived")]
    EventReceived(EventReceivedDetail),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_largest_url_follows_insertion_order() {
        let emote: EmoteRef = serde_json::from_value(json!({
            "name": "Kappa",
            "urls": { "4": "https://cdn/4x", "1": "https://cdn/1x", "2": "https://cdn/2x" }
        }))
        .unwrap();

        assert_eq!(emote.largest_url(), Some("https://cdn/2x"));
    }

    #[test]
    fn test_message_listener_decodes_data() {
        let detail: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "message",
            "event": { "data": {
                "text": "hello",
                "displayName": "Ann",
                "nick": "ann",
                "userId": "42",
                "msgId": "m-1",
                "isAction": true,
                "badges": [{ "url": "https://badge" }],
                "emotes": []
            }}
        }))
        .unwrap();

        match detail.into_chat_event().unwrap() {
            ChatEvent::Message(message) => {
                assert_eq!(message.display_name, "Ann");
                assert_eq!(message.user_id, "42");
                assert_eq!(message.msg_id, "m-1");
                assert!(message.is_action);
                assert_eq!(message.badges.len(), 1);
                assert_eq!(message.display_color, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_delete_listeners() {
        let one: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "delete-message",
            "event": { "msgId": "m-9" }
        }))
        .unwrap();
        assert!(matches!(
            one.into_chat_event().unwrap(),
            ChatEvent::DeleteMessage { msg_id } if msg_id == "m-9"
        ));

        let all: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "delete-messages",
            "event": { "userId": "u-3" }
        }))
        .unwrap();
        assert!(matches!(
            all.into_chat_event().unwrap(),
            ChatEvent::DeleteMessages { user_id } if user_id == "u-3"
        ));
    }

    #[test]
    fn test_unknown_listener_is_ignored() {
        let detail: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "follower-latest",
            "event": { "name": "someone" }
        }))
        .unwrap();

        assert!(matches!(
            detail.into_chat_event().unwrap(),
            ChatEvent::Ignored(listener) if listener == "follower-latest"
        ));
    }

    #[test]
    fn test_null_and_mistyped_message_fields() {
        let detail: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "message",
            "event": { "data": {
                "text": "hi",
                "displayName": "Ann",
                "nick": null,
                "userId": 42,
                "msgId": "m-1",
                "isAction": "no",
                "displayColor": null,
                "emotes": null,
                "badges": [{ "url": "https://badge" }, "broken", { "url": null }]
            }}
        }))
        .unwrap();

        match detail.into_chat_event().unwrap() {
            ChatEvent::Message(message) => {
                assert_eq!(message.nick, "");
                assert_eq!(message.sender_login(), "Ann");
                assert_eq!(message.user_id, "42");
                assert!(!message.is_action);
                assert_eq!(message.display_color, None);
                assert!(message.emotes.is_empty());
                assert_eq!(message.badges.len(), 2);
                assert_eq!(message.badges[1].url, "");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emote_with_null_urls_has_no_largest() {
        let emote: EmoteRef = serde_json::from_value(json!({ "name": "Kappa", "urls": null })).unwrap();
        assert_eq!(emote.largest_url(), None);
    }

    #[test]
    fn test_numeric_user_id_on_delete_messages() {
        let all: EventReceivedDetail = serde_json::from_value(json!({
            "listener": "delete-messages",
            "event": { "userId": 77 }
        }))
        .unwrap();
        assert!(matches!(
            all.into_chat_event().unwrap(),
            ChatEvent::DeleteMessages { user_id } if user_id == "77"
        ));
    }

    #[test]
    fn test_sender_login_falls_back_to_display_name() {
        let message = ChatMessage {
            display_name: "Ann".to_string(),
            ..Default::default()
        };
        assert_eq!(message.sender_login(), "Ann");
    }
}
