use serde_json::Value;

/// Decode an upstream body. Blank bodies become `Null`; anything that is not
/// JSON (proxy error pages, plain text) is kept verbatim as a string.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_body_is_null() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b" \r\n"), Value::Null);
    }

    #[test]
    fn html_body_is_kept_as_text() {
        assert_eq!(
            decode_body(b"<h1>Bad Gateway</h1>"),
            Value::String("<h1>Bad Gateway</h1>".to_string())
        );
    }

    #[test]
    fn json_body_is_decoded() {
        assert_eq!(
            decode_body(br#"{"message":"Tag not found"}"#),
            json!({"message": "Tag not found"})
        );
    }
}
