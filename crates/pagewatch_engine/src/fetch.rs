use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

/// Sent when no identity is configured. Some sites reject requests with an
/// empty or library-default agent.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; pagewatch/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: ["text/html", "application/xhtml+xml"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Single GET of a monitored page. Implementations never retry; the next
/// poll tick is the retry.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let user_agent = if settings.user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            settings.user_agent.as_str()
        };

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()?;

        Ok(Self { settings, client })
    }

    fn too_large(&self, url: &str, observed: u64) -> FetchError {
        FetchError::new(
            url,
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(observed),
            },
            format!("page exceeds {} bytes", self.settings.max_bytes),
        )
    }

    /// Drains the body, giving up as soon as the cap is crossed.
    async fn read_capped(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(url, err))?;
            let received = (body.len() + chunk.len()) as u64;
            if received > self.settings.max_bytes {
                return Err(self.too_large(url, received));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Compares only the media type, so `text/html; charset=utf-8` matches
/// `text/html`.
fn media_type_allowed(allowed: &[String], header: &str) -> bool {
    let media_type = header.split(';').next().unwrap_or_default().trim();
    allowed
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(media_type))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let target = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(url, FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err(FetchError::new(url, FailureKind::HttpStatus(code), status.to_string()));
        }

        match response.content_length() {
            Some(declared) if declared > self.settings.max_bytes => {
                return Err(self.too_large(url, declared));
            }
            _ => {}
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        // Pages without a Content-Type header are still parsed as HTML.
        if let Some(header) = &content_type {
            if !media_type_allowed(&self.settings.allowed_content_types, header) {
                return Err(FetchError::new(
                    url,
                    FailureKind::UnsupportedContentType {
                        content_type: header.clone(),
                    },
                    "not an HTML page",
                ));
            }
        }

        let final_url = response.url().to_string();
        let bytes = self.read_capped(url, response).await?;

        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_owned(),
                final_url,
                status: status.as_u16(),
                content_type,
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    FetchError::new(url, kind, err.to_string())
}
