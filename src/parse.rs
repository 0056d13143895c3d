//! Parse API client: turns a page URL into acquirable assets.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::asset::{Asset, MediaKind};
use crate::http::{HttpTimeouts, build_http_client};

/// Errors from the parse API.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The page URL or the configured endpoint is not a valid URL.
    #[error("invalid URL '{url}'")]
    InvalidUrl {
        /// The offending value.
        url: String,
    },

    /// The parse API could not be reached.
    #[error("parse API unreachable: {source}")]
    Network {
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The parse API answered with a non-2xx status.
    #[error("parse API returned HTTP {status} for {page}")]
    HttpStatus {
        /// Page being parsed.
        page: String,
        /// Status returned.
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("invalid parse API response: {source}")]
    InvalidResponse {
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The page parsed but yielded no downloadable media.
    #[error("no downloadable media found on {page}")]
    Empty {
        /// Page being parsed.
        page: String,
    },
}

/// One record as sent by the parse API.
#[derive(Debug, Clone, Deserialize)]
struct ParsedRecord {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    ua: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    subtitles: Vec<String>,
    #[serde(default)]
    kind: MediaKind,
}

impl From<ParsedRecord> for Asset {
    fn from(record: ParsedRecord) -> Self {
        Self {
            display_title: record.title,
            source_url: record.url,
            user_agent_hint: record.ua.filter(|ua| !ua.trim().is_empty()),
            kind: record.kind,
            thumbnail: record.thumbnail,
            subtitle_languages: record.subtitles,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParseResponse {
    Many { items: Vec<ParsedRecord> },
    One(ParsedRecord),
}

/// Resolves a page URL to its media assets.
#[async_trait]
pub trait ParseApi: Send + Sync {
    /// Parses `page_url`, returning at least one asset.
    async fn parse(&self, page_url: &str) -> Result<Vec<Asset>, ParseError>;
}

/// Parse API over HTTP: `GET {endpoint}?url=<page>`.
#[derive(Debug, Clone)]
pub struct HttpParseClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpParseClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUrl`] for a malformed endpoint and
    /// [`ParseError::Network`] when the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeouts: HttpTimeouts) -> Result<Self, ParseError> {
        let endpoint = Url::parse(endpoint).map_err(|_| ParseError::InvalidUrl {
            url: endpoint.to_string(),
        })?;
        let client =
            build_http_client(timeouts, true).map_err(|source| ParseError::Network { source })?;
        Ok(Self {
            client,
            endpoint,
            timeout: timeouts.response,
        })
    }
}

#[async_trait]
impl ParseApi for HttpParseClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn parse(&self, page_url: &str) -> Result<Vec<Asset>, ParseError> {
        let page = page_url.trim();
        if Url::parse(page).is_err() {
            return Err(ParseError::InvalidUrl {
                url: page.to_string(),
            });
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", page);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ParseError::Network { source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParseError::HttpStatus {
                page: page.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| ParseError::Network { source })?;

        let records = match serde_json::from_slice::<ParseResponse>(&body)
            .map_err(|source| ParseError::InvalidResponse { source })?
        {
            ParseResponse::Many { items } => items,
            ParseResponse::One(record) => vec![record],
        };

        let assets: Vec<Asset> = records
            .into_iter()
            .filter(|r| !r.url.trim().is_empty())
            .map(Asset::from)
            .collect();
        if assets.is_empty() {
            return Err(ParseError::Empty {
                page: page.to_string(),
            });
        }
        debug!(count = assets.len(), "parsed assets");
        Ok(assets)
    }
}
