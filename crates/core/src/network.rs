//! The fetcher used for everything that isn't site-relative.

use base64::Engine;
use log::debug;
use percent_encoding::percent_decode_str;
use renderpdf_traits::{FetchError, FetchedResource, UrlFetcher};
use std::time::Duration;
use url::Url;

const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// Loads `data:`, `file://` and `http(s)://` URLs.
#[derive(Debug, Clone)]
pub struct DefaultUrlFetcher {
    timeout: Duration,
}

impl Default for DefaultUrlFetcher {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl DefaultUrlFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_http(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let network = |message: String| FetchError::Network {
            url: url.to_string(),
            message,
        };

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        let agent: ureq::Agent = config.into();

        let mut response = agent
            .get(url.as_str())
            .call()
            .map_err(|e| network(e.to_string()))?;

        let mime_type = response
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .and_then(essence);

        let content = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| network(e.to_string()))?;

        debug!("Fetched {} ({} bytes)", url, content.len());
        Ok(FetchedResource::new(content, mime_type))
    }
}

impl UrlFetcher for DefaultUrlFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => self.fetch_http(&parsed),
            "file" => {
                let path = parsed.to_file_path().map_err(|_| FetchError::InvalidUrl {
                    url: url.to_string(),
                    message: "not a local file path".to_string(),
                })?;
                let content = std::fs::read(&path)?;
                let mime_type = mime_guess::from_path(&path)
                    .first()
                    .map(|m| m.essence_str().to_string());
                Ok(FetchedResource::new(content, mime_type))
            }
            _ => Err(FetchError::UnsupportedScheme(url.to_string())),
        }
    }
}

/// `text/css; charset=utf-8` -> `text/css`.
fn essence(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    if essence.is_empty() {
        None
    } else {
        Some(essence.to_ascii_lowercase())
    }
}

fn decode_data_url(url: &str) -> Result<FetchedResource, FetchError> {
    let malformed = |message: &str| FetchError::InvalidUrl {
        url: url.chars().take(40).collect(),
        message: message.to_string(),
    };

    let (header, payload) = url["data:".len()..]
        .split_once(',')
        .ok_or_else(|| malformed("missing ',' in data URL"))?;

    let mut segments = header.split(';');
    let mime_type = segments.next().and_then(essence);
    let is_base64 = segments.any(|s| s.trim().eq_ignore_ascii_case("base64"));

    let content = if is_base64 {
        let compact: String = payload.split_ascii_whitespace().collect();
        base64::engine::general_purpose::STANDARD
            .decode(percent_decode_str(&compact).collect::<Vec<u8>>())
            .map_err(|e| malformed(&format!("invalid base64: {}", e)))?
    } else {
        percent_decode_str(payload).collect()
    };

    // RFC 2397 default when the media type is omitted.
    let mime_type = mime_type.or_else(|| Some("text/plain".to_string()));
    Ok(FetchedResource::new(content, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_base64_data_url() {
        let resource = DefaultUrlFetcher::default()
            .fetch("data:image/png;base64,aGVsbG8=")
            .unwrap();
        assert_eq!(resource.content, b"hello");
        assert_eq!(resource.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_percent_encoded_data_url() {
        let resource = DefaultUrlFetcher::default()
            .fetch("data:text/css;charset=utf-8,p%20%7B%20color:%20red%20%7D")
            .unwrap();
        assert_eq!(resource.content, b"p { color: red }");
        assert_eq!(resource.mime_type.as_deref(), Some("text/css"));
    }

    #[test]
    fn test_data_url_without_media_type() {
        let resource = DefaultUrlFetcher::default().fetch("data:,plain").unwrap();
        assert_eq!(resource.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_malformed_data_url() {
        let err = DefaultUrlFetcher::default().fetch("data:text/plain").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_file_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("style.css");
        fs::write(&path, "body {}").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let resource = DefaultUrlFetcher::default().fetch(url.as_str()).unwrap();
        assert_eq!(resource.content, b"body {}");
        assert_eq!(resource.mime_type.as_deref(), Some("text/css"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let url = Url::from_file_path(dir.path().join("gone.png")).unwrap();
        let err = DefaultUrlFetcher::default().fetch(url.as_str()).unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[test]
    fn test_unsupported_scheme() {
        let url = "ftp://example.com/a.css";
        let err = DefaultUrlFetcher::default().fetch(url).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(ref u) if u == url));
    }

    #[test]
    fn test_relative_url_is_invalid_here() {
        let err = DefaultUrlFetcher::default().fetch("images/logo.png").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_content_type_essence() {
        assert_eq!(essence("Text/CSS; charset=UTF-8").as_deref(), Some("text/css"));
        assert_eq!(essence(" ; x=y"), None);
    }
}
