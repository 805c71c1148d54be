use serde::Serialize;
use serde_json::Value;

/// What is known about the last executed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferInfo {
    /// URL of the final request, after any followed redirects.
    pub effective_url: String,
    pub response_code: u16,
    pub content_type: Option<String>,
    /// Seconds from the start of the request until the body was read.
    pub total_time: f64,
    pub size_download: u64,
    /// Response headers in received order.
    pub headers: Vec<(String, String)>,
}

impl TransferInfo {
    /// First response header called `name`, compared without case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn get(&self, key: TransferInfoKey) -> Value {
        match key {
            TransferInfoKey::EffectiveUrl => Value::from(self.effective_url.as_str()),
            TransferInfoKey::ResponseCode => Value::from(self.response_code),
            TransferInfoKey::ContentType => self
                .content_type
                .as_deref()
                .map_or(Value::Null, Value::from),
            TransferInfoKey::TotalTime => Value::from(self.total_time),
            TransferInfoKey::SizeDownload => Value::from(self.size_download),
            TransferInfoKey::Headers => self
                .headers
                .iter()
                .map(|(name, value)| Value::from(format!("{name}: {value}")))
                .collect(),
        }
    }
}

/// Selects a single entry of [`TransferInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferInfoKey {
    EffectiveUrl,
    ResponseCode,
    ContentType,
    TotalTime,
    SizeDownload,
    Headers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info() -> TransferInfo {
        TransferInfo {
            effective_url: "http://localhost/a".to_string(),
            response_code: 200,
            content_type: None,
            total_time: 0.5,
            size_download: 3,
            headers: vec![("Content-Length".to_string(), "3".to_string())],
        }
    }

    #[test]
    fn test_get_single_entries() {
        let info = info();
        assert_eq!(info.get(TransferInfoKey::ResponseCode), json!(200));
        assert_eq!(info.get(TransferInfoKey::ContentType), Value::Null);
        assert_eq!(info.get(TransferInfoKey::SizeDownload), json!(3));
        assert_eq!(info.get(TransferInfoKey::Headers), json!(["Content-Length: 3"]));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        assert_eq!(info().header("content-length"), Some("3"));
        assert_eq!(info().header("etag"), None);
    }
}
