use crate::protocol::error::{ProtocolError, Result};
use serde_json::Value;

/// Decode one newline-delimited record into a JSON value
pub fn decode_message(line: &str) -> Result<Value> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
        .map_err(|e| ProtocolError::DecodeError(e.to_string()))
}

/// Encode a JSON value as a single line, newline included
pub fn encode_message(message: &Value) -> Result<String> {
    let mut line =
        serde_json::to_string(message).map_err(|e| ProtocolError::EncodeError(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_line_ending() {
        let value = decode_message("{\"name\":\"get_cwd\"}\r\n").unwrap();
        assert_eq!(value["name"], "get_cwd");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_message("not json");
        assert!(matches!(result, Err(ProtocolError::DecodeError(_))));
    }

    #[test]
    fn test_encode_is_single_line() {
        // Embedded newlines in strings must stay escaped
        let value = serde_json::json!({ "text": "line1\nline2" });
        let line = encode_message(&value).unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(decode_message(&line).unwrap(), value);
    }

    #[test]
    fn test_special_characters() {
        let value = serde_json::json!({ "text": "你好🌮🎉 null\u{0}end" });
        let line = encode_message(&value).unwrap();
        assert_eq!(decode_message(&line).unwrap(), value);
    }
}
