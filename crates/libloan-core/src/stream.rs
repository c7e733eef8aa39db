//! Blocking HTTP fetch of text resources.
//!
//! Uses async reqwest internally on a shared runtime, but presents a sync
//! interface: rows are processed one at a time and the batch loop never
//! overlaps requests.

use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (headers + body)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Charset of the published loan-list files
pub const DEFAULT_CHARSET: &str = "euc-kr";

/// Error types for fetch operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
    /// Response decoded to nothing
    EmptyBody,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::EmptyBody => f.write_str("empty response body"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// HTTP settings, applied once at startup before the first request.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            timeout: REQUEST_TIMEOUT,
            user_agent: None,
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install HTTP settings. Later calls (or calls after the first request) are ignored.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already set, ignoring");
    }
}

/// Active HTTP settings (defaults when never set)
pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<Result<reqwest::Client, String>> = LazyLock::new(|| {
    let config = http_config();
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .pool_max_idle_per_host(2);
    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.clone());
    }
    builder.build().map_err(|e| e.to_string())
});

/// Get shared HTTP client.
pub fn http_client() -> Result<&'static reqwest::Client, StreamError> {
    SHARED_CLIENT.as_ref().map_err(|message| StreamError::Http {
        status: None,
        message: format!("failed to build HTTP client: {message}"),
    })
}

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<std::io::Result<tokio::runtime::Runtime>> = LazyLock::new(|| {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
});

fn runtime() -> Result<&'static tokio::runtime::Runtime, StreamError> {
    SHARED_RUNTIME
        .as_ref()
        .map_err(|e| StreamError::Io(std::io::Error::new(e.kind(), e.to_string())))
}

/// HTTP GET → status check → decode with `charset`.
///
/// Non-2xx responses and bodies that decode to only whitespace are errors.
/// Undecodable bytes are replaced, not rejected.
pub fn fetch_text(url: &str, charset: &str) -> Result<String, StreamError> {
    let client = http_client()?;
    runtime()?.block_on(async {
        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        let text = response
            .text_with_charset(charset)
            .await
            .map_err(|e| StreamError::from_reqwest(&e))?;

        if text.trim().is_empty() {
            return Err(StreamError::EmptyBody);
        }
        Ok(text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn display_http_with_status() {
        let err = http_err(404);
        assert_eq!(format!("{err}"), "HTTP 404: test");
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn display_io_error() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(format!("{err}").contains("IO error"));
    }

    #[test]
    fn display_empty_body() {
        assert_eq!(format!("{}", StreamError::EmptyBody), "empty response body");
    }

    #[test]
    fn default_http_config() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, CONNECT_TIMEOUT);
        assert_eq!(config.timeout, REQUEST_TIMEOUT);
        assert!(config.user_agent.is_none());
    }
}
