// src/utils/image.rs — Remote image fetch and data-URL decoding

use base64::Engine as _;

/// GET `url` and return the body bytes.
///
/// Non-2xx responses and transport errors are logged and yield `None`.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    let resp = match client
        .get(url)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch image {}: {}", url, e);
            return None;
        }
    };

    let status = resp.status();
    if !status.is_success() {
        tracing::error!("Failed to fetch image {}: HTTP {}", url, status.as_u16());
        return None;
    }

    match resp.bytes().await {
        Ok(b) => Some(b.to_vec()),
        Err(e) => {
            tracing::error!("Failed to read image body {}: {}", url, e);
            None
        }
    }
}

/// Whether `s` looks like a remote http(s) URL.
pub fn is_remote(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Decode `data:image/<ext>;base64,<payload>` into `(ext, bytes)`.
pub fn decode_data_url(s: &str) -> Option<(String, Vec<u8>)> {
    let rest = s.strip_prefix("data:image/")?;
    let (ext, payload) = rest.split_once(";base64,")?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    Some((ext.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://a.com/x.png"));
        assert!(is_remote("https://a.com/x.png"));
        assert!(!is_remote("data:image/png;base64,AAAA"));
        assert!(!is_remote("ftp://a.com/x.png"));
    }

    #[test]
    fn test_decode_data_url() {
        let (ext, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(ext, "png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_data_url_rejects_malformed() {
        assert!(decode_data_url("data:text/plain;base64,aGVsbG8=").is_none());
        assert!(decode_data_url("data:image/png,aGVsbG8=").is_none());
        assert!(decode_data_url("data:image/svg+xml;base64,aGVsbG8=").is_none());
        assert!(decode_data_url("data:image/png;base64,***").is_none());
    }
}
