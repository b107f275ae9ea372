//! Messenger share links for a generated payload.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Longest payload prefix quoted in a share message, in characters.
pub const SHARE_TEXT_CHARS: usize = 100;

// Characters left as is in a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareTarget {
    Telegram,
    WhatsApp,
}

/// Payload shortened for a message body: the first 100 characters followed
/// by `...` when longer.
pub fn share_text(payload: &str) -> String {
    match payload.char_indices().nth(SHARE_TEXT_CHARS) {
        Some((byte, _)) => format!("{}...", &payload[..byte]),
        None => payload.to_string(),
    }
}

fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Deep link that opens `target` with the payload pre-filled.
pub fn share_url(target: ShareTarget, payload: &str) -> String {
    let text = share_text(payload);
    match target {
        ShareTarget::Telegram => format!(
            "https://t.me/share/url?url={}&text={}",
            encode_component(payload),
            encode_component(&format!("QR/Barcode: {text}"))
        ),
        ShareTarget::WhatsApp => format!("https://wa.me/?text={}", encode_component(&text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(share_text("Ism: Ali"), "Ism: Ali");
        assert_eq!(share_text(&"a".repeat(100)), "a".repeat(100));
    }

    #[test]
    fn long_text_is_cut_at_100_chars() {
        let text = "ў".repeat(101);
        let shared = share_text(&text);
        assert_eq!(shared, format!("{}...", "ў".repeat(100)));
    }

    #[test]
    fn whatsapp_link() {
        assert_eq!(
            share_url(ShareTarget::WhatsApp, "a&b=c\nd e"),
            "https://wa.me/?text=a%26b%3Dc%0Ad%20e"
        );
    }

    #[test]
    fn telegram_link_carries_full_payload_and_short_text() {
        let payload = format!("k=v&x\n{}", "y".repeat(120));
        let url = share_url(ShareTarget::Telegram, &payload);
        let (url_part, text_part) = url
            .strip_prefix("https://t.me/share/url?url=")
            .and_then(|rest| rest.split_once("&text="))
            .unwrap();
        assert_eq!(url_part, format!("k%3Dv%26x%0A{}", "y".repeat(120)));
        assert!(text_part.starts_with("QR%2FBarcode%3A%20k%3Dv%26x%0A"));
        assert!(text_part.ends_with("..."));
        assert!(!text_part.contains('&') && !text_part.contains('='));
    }

    #[test]
    fn unreserved_marks_are_kept() {
        assert_eq!(share_url(ShareTarget::WhatsApp, "a-b_c.d!~*'()"), "https://wa.me/?text=a-b_c.d!~*'()");
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        assert_eq!(share_url(ShareTarget::WhatsApp, "ў"), "https://wa.me/?text=%D1%9E");
    }
}
