use crate::domain::ports::{ConfigProvider, PageSource};
use crate::utils::error::{PollError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;

/// GETs the timer page over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    url: String,
}

impl HttpPageSource {
    /// No request timeout: a hung request only costs that one tick.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, None)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::with_timeout(config.page_url(), config.request_timeout())
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&self) -> Result<String> {
        tracing::debug!("Making page request to: {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        tracing::debug!("Page response status: {}", status);

        if !status.is_success() {
            return Err(PollError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        Ok(response.text().await?)
    }
}
