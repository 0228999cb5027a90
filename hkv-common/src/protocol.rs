//! # Wire Frame Codec
//!
//! A request frame is the UTF-8 JSON encoding of an array of command
//! strings; the response is a JSON array of result strings in the
//! same order. Frames are not length-prefixed — one logical frame is
//! expected per transport `recv`, a known limitation carried over from
//! the original design rather than fixed here.

use crate::error::{HkvError, HkvResult};

/// Decodes one request frame: a JSON array of command strings.
pub fn decode_request(bytes: &[u8]) -> HkvResult<Vec<String>> {
    serde_json::from_slice::<Vec<String>>(bytes)
        .map_err(|err| HkvError::MalformedFrame(err.to_string()))
}

/// Encodes a response frame: a JSON array of result strings.
pub fn encode_response(results: &[String]) -> Vec<u8> {
    serde_json::to_vec(results).expect("Vec<String> always serializes")
}

/// Key and value bytes are restricted to `[A-Za-z0-9]+`.
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_command_array() {
        let frame = decode_request(br#"["set foo bar", "get foo"]"#).unwrap();
        assert_eq!(frame, vec!["set foo bar".to_string(), "get foo".to_string()]);
    }

    #[test]
    fn rejects_non_array_frame() {
        assert!(decode_request(br#"{"not": "an array"}"#).is_err());
    }

    #[test]
    fn encodes_results_array() {
        let bytes = encode_response(&["Inserted".to_string(), "bar".to_string()]);
        assert_eq!(bytes, br#"["Inserted","bar"]"#);
    }

    #[test]
    fn validates_alphanumeric_tokens() {
        assert!(is_valid_token("foo123"));
        assert!(!is_valid_token(""));
        assert!(!is_valid_token("foo bar"));
        assert!(!is_valid_token("foo-bar"));
    }
}
