use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use url::Url;

use crate::config::Config;

/// Timeout for the reachability probe. Bounded so a stalled Instagram
/// response cannot hang the whole pipeline.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("That doesn't look like a URL")]
    Malformed,

    #[error("Not an Instagram Reel URL")]
    PatternMismatch,

    #[error("Video not found (404)")]
    NotFound,

    #[error("Instagram is having issues ({0})")]
    RemoteServer(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

/// Contract for URL validation: syntactic check, reel pattern match, and a
/// live reachability probe. Returns the extracted reel identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlValidator: Send + Sync {
    async fn validate(&self, url: &str) -> Result<String, ValidationError>;
}

/// Validates Instagram Reel URLs with a compiled pattern and one HEAD probe.
pub struct ReelValidator {
    pattern: Regex,
    client: reqwest::Client,
}

impl ReelValidator {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let pattern = Regex::new(&config.reel_url_pattern)?;
        let client = reqwest::Client::builder()
            .user_agent(config.download.user_agent.clone())
            .timeout(PROBE_TIMEOUT)
            .build()?;

        Ok(Self { pattern, client })
    }

    /// Syntactic validation and reel id extraction, no network involved.
    pub fn extract_reel_id(&self, url: &str) -> Result<String, ValidationError> {
        let parsed = Url::parse(url).map_err(|_| ValidationError::Malformed)?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::Malformed);
        }

        let captures = self
            .pattern
            .captures(url)
            .ok_or(ValidationError::PatternMismatch)?;

        captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or(ValidationError::PatternMismatch)
    }

    async fn probe(&self, url: &str) -> Result<(), ValidationError> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ValidationError::Timeout
            } else {
                ValidationError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ValidationError::NotFound);
        }
        if status.is_server_error() {
            return Err(ValidationError::RemoteServer(status.as_u16()));
        }

        Ok(())
    }
}

#[async_trait]
impl UrlValidator for ReelValidator {
    async fn validate(&self, url: &str) -> Result<String, ValidationError> {
        let reel_id = self.extract_reel_id(url)?;

        tracing::debug!("Probing reachability of {}", url);
        self.probe(url).await?;

        Ok(reel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn validator() -> ReelValidator {
        ReelValidator::new(&Config::default()).unwrap()
    }

    /// One-shot HTTP server that answers a single request with a fixed status line.
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!("{status_line}\r\ncontent-length: 0\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn rejects_malformed_url() {
        let err = validator().extract_reel_id("not a url").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = validator()
            .extract_reel_id("ftp://instagram.com/reel/ABC123")
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed));
    }

    #[test]
    fn rejects_non_reel_url() {
        let err = validator()
            .extract_reel_id("https://instagram.com/p/ABC123/")
            .unwrap_err();
        assert!(matches!(err, ValidationError::PatternMismatch));
    }

    #[test]
    fn extracts_reel_id() {
        let id = validator()
            .extract_reel_id("https://instagram.com/reel/ABC123")
            .unwrap();
        assert_eq!(id, "ABC123");

        let id = validator()
            .extract_reel_id("https://www.instagram.com/reels/xY_z-9/")
            .unwrap();
        assert_eq!(id, "xY_z-9");
    }

    #[tokio::test]
    async fn probe_accepts_200() {
        let base = serve_once("HTTP/1.1 200 OK").await;
        assert!(validator().probe(&base).await.is_ok());
    }

    #[tokio::test]
    async fn probe_maps_404_to_not_found() {
        let base = serve_once("HTTP/1.1 404 Not Found").await;
        let err = validator().probe(&base).await.unwrap_err();
        assert!(matches!(err, ValidationError::NotFound));
    }

    #[tokio::test]
    async fn probe_maps_5xx_to_remote_server() {
        let base = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let err = validator().probe(&base).await.unwrap_err();
        assert!(matches!(err, ValidationError::RemoteServer(503)));
    }

    #[tokio::test]
    async fn probe_maps_refused_connection_to_network() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = validator()
            .probe(&format!("http://{addr}"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Network(_) | ValidationError::Timeout
        ));
    }
}
