use crate::models::chat::EmoteRef;
use crate::utils::html::escape_html;

/// Replace every emote token in `text` with an inline image of its largest variant.
///
/// Emotes are applied in the order given and each one replaces every literal
/// occurrence of its name in the text produced so far. Names that are substrings
/// of other names or of ordinary words are replaced too.
pub fn substitute_emotes(text: &str, emotes: &[EmoteRef]) -> String {
    if text.is_empty() || emotes.is_empty() {
        return text.to_string();
    }

    let mut message = text.to_string();

    for emote in emotes {
        if emote.name.is_empty() {
            continue;
        }
        let Some(url) = emote.largest_url() else {
            continue;
        };

        let emote_img = format!("<img src='{}' class='emote'/>", escape_html(url));
        message = message.replace(&emote.name, &emote_img);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emote(name: &str, urls: serde_json::Value) -> EmoteRef {
        serde_json::from_value(json!({ "name": name, "urls": urls })).unwrap()
    }

    #[test]
    fn test_last_variant_replaces_every_occurrence() {
        let kappa = emote(
            "Kappa",
            json!({ "1": "https://cdn/kappa/1", "2": "https://cdn/kappa/2", "4": "https://cdn/kappa/4" }),
        );

        let result = substitute_emotes("Kappa hello Kappa", &[kappa]);

        assert_eq!(
            result,
            "<img src='https://cdn/kappa/4' class='emote'/> hello <img src='https://cdn/kappa/4' class='emote'/>"
        );
        assert!(!result.contains("kappa/1"));
    }

    #[test]
    fn test_empty_inputs_return_text() {
        assert_eq!(substitute_emotes("", &[emote("Kappa", json!({ "1": "u" }))]), "");
        assert_eq!(substitute_emotes("Kappa", &[]), "Kappa");
    }

    #[test]
    fn test_substring_names_are_replaced_literally() {
        let lul = emote("LUL", json!({ "1": "https://cdn/lul" }));

        let result = substitute_emotes("LULW", &[lul]);

        assert_eq!(result, "<img src='https://cdn/lul' class='emote'/>W");
    }

    #[test]
    fn test_emote_without_urls_is_skipped() {
        let broken = emote("Kappa", json!({}));
        assert_eq!(substitute_emotes("Kappa", &[broken]), "Kappa");
    }
}
