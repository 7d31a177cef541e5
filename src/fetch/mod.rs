// src/fetch/mod.rs

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client,
};
use tracing::{error, info};
use url::Url;

use crate::{
    config::Config,
    error::{EtlError, Result, TransportKind},
};

const API_KEY_HEADER: &str = "x-api-key";
const CHARSET_HEADER: &str = "charset";

/// HTTP session for the extract stage: static headers, fixed timeout, one default URL.
pub struct Extractor {
    client: Client,
    default_url: Url,
}

impl Extractor {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| EtlError::Config(format!("API key is not a valid header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(
            HeaderName::from_static(CHARSET_HEADER),
            HeaderValue::from_static("utf-8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            default_url: config.url.clone(),
        })
    }

    /// GET `url` (or the configured default) and return the body as UTF-8 text.
    ///
    /// Failures are logged with their transport kind and returned unchanged.
    pub async fn fetch(&self, url: Option<&Url>) -> Result<String> {
        let url = url.unwrap_or(&self.default_url);
        info!("Calling {}", url);

        match self.get_text(url).await {
            Ok(text) => {
                info!(bytes = text.len(), "Successfully extracted data from an API");
                Ok(text)
            }
            Err(e) => {
                let kind = TransportKind::of(&e);
                error!(url = %url, status = ?e.status(), "{}: {}", kind.label(), e);
                Err(EtlError::Http(e))
            }
        }
    }

    async fn get_text(&self, url: &Url) -> reqwest::Result<String> {
        let bytes = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
