//! Card token codec.
//!
//! A token is the record list serialized as a compact JSON array of
//! `[key, value]` pairs, then base64 encoded with the URL-safe alphabet and no
//! padding. The result only contains `[A-Za-z0-9_-]` and can be placed in a
//! query string as is.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::debug;

use crate::error::TokenError;
use crate::records::Record;

/// Encodes records into a token. The empty list encodes to `""`.
pub fn encode(records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let pairs: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r.key.as_str(), r.value.as_str()))
        .collect();
    // Serializing string tuples cannot fail.
    let json = serde_json::to_string(&pairs).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decodes a token, keeping the reason on failure. Blank pairs are dropped,
/// so the result is always a filtered record set.
pub fn try_decode(token: &str) -> Result<Vec<Record>, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = URL_SAFE_NO_PAD.decode(token)?;
    let json = String::from_utf8(bytes)?;
    let pairs: Vec<(String, String)> = serde_json::from_str(&json)?;
    Ok(pairs
        .into_iter()
        .map(|(key, value)| Record { key, value })
        .filter(|r| !r.is_blank())
        .collect())
}

/// Decodes a token. Any malformed token yields `None`, never an error, so a
/// page opened with a foreign or corrupted parameter simply shows no card.
pub fn decode(token: &str) -> Option<Vec<Record>> {
    match try_decode(token) {
        Ok(records) => Some(records),
        Err(e) => {
            debug!(error = %e, "ignoring malformed card token");
            None
        }
    }
}

/// `base?param=token`, or `base&param=token` when `base` already has a query.
pub fn card_url(base: &str, param: &str, token: &str) -> String {
    let (base, _fragment) = base.split_once('#').unwrap_or((base, ""));
    let sep = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{base}{sep}{param}={token}")
}

/// Extracts the raw value of `param` from a URL's query string.
/// The fragment is ignored; the first occurrence wins.
pub fn token_from_url<'a>(url: &'a str, param: &str) -> Option<&'a str> {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == param)
        .map(|(_, value)| value)
}

/// Decodes the card carried by a URL. `None` when the URL has no card
/// parameter or the token is malformed.
pub fn decode_url(url: &str, param: &str) -> Option<Vec<Record>> {
    decode(token_from_url(url, param)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<Record> {
        vec![Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")]
    }

    fn is_query_safe(token: &str) -> bool {
        token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn scenario_round_trips_in_order() {
        let token = encode(&scenario());
        assert!(!token.is_empty());
        assert!(is_query_safe(&token));
        assert_eq!(decode(&token), Some(scenario()));
    }

    #[test]
    fn compact_representation() {
        let json = URL_SAFE_NO_PAD.decode(encode(&scenario())).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"[["Ism","Ali"],["Telefon","+998901234567"]]"#
        );
    }

    #[test]
    fn empty_set_uses_empty_token() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode(""), Some(Vec::new()));
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("[]")), Some(Vec::new()));
    }

    #[test]
    fn reserved_characters_round_trip() {
        let records = vec![
            Record::new("a&b=c", "x+y/z%20"),
            Record::new("multi\nline", "tab\there  "),
            Record::new("\"quoted\"", "back\\slash"),
            Record::new("Manzil", "Toshkent sh., Chilonzor 5-uy — ўзбекча 🙂"),
            Record::new("", "value only"),
        ];
        let token = encode(&records);
        assert!(is_query_safe(&token));
        assert_eq!(decode(&token), Some(records));
    }

    #[test]
    fn blank_pairs_are_dropped_on_decode() {
        let token = URL_SAFE_NO_PAD.encode(r#"[["",""],["k","v"],["  ","\t"]]"#);
        assert_eq!(decode(&token), Some(vec![Record::new("k", "v")]));
        let token = URL_SAFE_NO_PAD.encode(r#"[["",""]]"#);
        assert_eq!(decode(&token), Some(Vec::new()));
    }

    #[test]
    fn malformed_tokens_decode_to_none() {
        assert_eq!(decode("not base64!"), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode([0xff, 0xfe])), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("{\"k\":1}")), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("[[\"only one\"]]")), None);
        assert!(matches!(try_decode("%%%"), Err(TokenError::Base64(_))));
        assert!(matches!(
            try_decode(&URL_SAFE_NO_PAD.encode("[1,2]")),
            Err(TokenError::Grammar(_))
        ));
    }

    #[test]
    fn card_url_building() {
        assert_eq!(card_url("https://x.app/", "card", "abc"), "https://x.app/?card=abc");
        assert_eq!(card_url("https://x.app/?lang=uz", "card", "abc"), "https://x.app/?lang=uz&card=abc");
        assert_eq!(card_url("https://x.app/?", "card", "abc"), "https://x.app/?card=abc");
    }

    #[test]
    fn token_extraction() {
        assert_eq!(token_from_url("https://x.app/?card=abc", "card"), Some("abc"));
        assert_eq!(token_from_url("https://x.app/?lang=uz&card=abc#top", "card"), Some("abc"));
        assert_eq!(token_from_url("https://x.app/?cards=abc", "card"), None);
        assert_eq!(token_from_url("https://x.app/", "card"), None);
    }

    #[test]
    fn url_round_trip() {
        let token = encode(&scenario());
        let url = card_url("https://x.app/", "card", &token);
        assert_eq!(decode_url(&url, "card"), Some(scenario()));
        assert_eq!(decode_url("https://x.app/?card=%%%", "card"), None);
        assert_eq!(decode_url("https://x.app/", "card"), None);
    }
}
