//! Share tokens
//!
//! A snapshot of the record list travels as
//! `base64(url_encode(json_array_of_records))`, standard alphabet with
//! padding, usually embedded in a share URL as the `data` query parameter:
//!
//! ```text
//! https://track.example.com/share?data=JTVCJTVE
//! ```
//!
//! Decoding is tolerant: absent or malformed input yields `None`, never an
//! error.

use crate::shared::{LogisticsRecord, SharedError};
use base64::{engine::general_purpose, Engine as _};

/// Query parameter carrying the token in share URLs
pub const SHARE_PARAM: &str = "data";

/// Encode records as a share token
pub fn encode_snapshot(records: &[LogisticsRecord]) -> Result<String, SharedError> {
    let json = serde_json::to_string(records)?;
    let encoded = urlencoding::encode(&json);
    Ok(general_purpose::STANDARD.encode(encoded.as_bytes()))
}

/// Decode a share token; `None` when it is not a valid snapshot
pub fn decode_snapshot(token: &str) -> Option<Vec<LogisticsRecord>> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let bytes = general_purpose::STANDARD.decode(token).ok()?;
    let encoded = String::from_utf8(bytes).ok()?;
    let json = urlencoding::decode(&encoded).ok()?;
    match serde_json::from_str(&json) {
        Ok(records) => Some(records),
        Err(e) => {
            tracing::debug!("[Export] Token payload is not a record list: {}", e);
            None
        }
    }
}

/// Pull the token out of a share URL, or accept a bare token
pub fn extract_token(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match reqwest::Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url
            .query_pairs()
            .find(|(key, _)| key == SHARE_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty()),
        _ => Some(input.to_string()),
    }
}

/// Build a share URL for `token` under `base_url`
pub fn share_url(base_url: &str, token: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base_url, separator, SHARE_PARAM, urlencoding::encode(token))
}
