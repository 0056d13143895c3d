//! Ordered relay endpoint pool.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::asset::Asset;

use super::RelayError;

/// Base URL of one relay.
///
/// Relays are stateless and interchangeable; their only ordering is their
/// position in the pool.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayEndpoint(String);

impl RelayEndpoint {
    /// Wraps a base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self(base_url.into())
    }

    /// Returns the base URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the GET URL asking this relay for `asset`.
    ///
    /// The query carries `title`, `url` and, when present, `ua`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidEndpoint`] when the base URL does not parse.
    pub fn request_url(&self, relay_index: usize, asset: &Asset) -> Result<Url, RelayError> {
        let mut url = Url::parse(&self.0)
            .map_err(|_| RelayError::invalid_endpoint(relay_index, self.0.clone()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("title", &asset.display_title);
            query.append_pair("url", &asset.source_url);
            if let Some(ua) = asset.user_agent_hint.as_deref() {
                query.append_pair("ua", ua);
            }
        }
        Ok(url)
    }
}

impl fmt::Debug for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelayEndpoint").field(&self.0).finish()
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable, priority-ordered list of relays.
///
/// Cloning is cheap; clones share the same endpoint list.
#[derive(Debug, Clone)]
pub struct RelayPool {
    endpoints: Arc<[RelayEndpoint]>,
}

impl RelayPool {
    /// Creates a pool; index 0 has the highest priority.
    #[must_use]
    pub fn new(endpoints: Vec<RelayEndpoint>) -> Self {
        Self {
            endpoints: endpoints.into(),
        }
    }

    /// Creates a pool from base URL strings.
    #[must_use]
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(urls.into_iter().map(RelayEndpoint::new).collect())
    }

    /// Number of relays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns true when no relay is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Relays in priority order with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RelayEndpoint)> {
        self.endpoints.iter().enumerate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_encodes_title_url_and_ua() {
        let endpoint = RelayEndpoint::new("https://relay.example/api/stream");
        let asset = Asset::new("A & B", "https://video.example/watch?v=1&t=2")
            .with_user_agent_hint("Mozilla/5.0 (X11)");

        let url = endpoint.request_url(0, &asset).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("title".to_string(), "A & B".to_string()),
                (
                    "url".to_string(),
                    "https://video.example/watch?v=1&t=2".to_string()
                ),
                ("ua".to_string(), "Mozilla/5.0 (X11)".to_string()),
            ]
        );
        assert_eq!(url.path(), "/api/stream");
    }

    #[test]
    fn test_request_url_omits_ua_without_hint() {
        let endpoint = RelayEndpoint::new("https://relay.example/");
        let asset = Asset::new("t", "yt:abc123");
        let url = endpoint.request_url(0, &asset).unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "ua"));
    }

    #[test]
    fn test_request_url_rejects_invalid_base() {
        let endpoint = RelayEndpoint::new("not a url");
        let asset = Asset::new("t", "yt:abc123");
        let result = endpoint.request_url(3, &asset);
        assert!(matches!(
            result,
            Err(RelayError::InvalidEndpoint { relay_index: 3, .. })
        ));
    }

    #[test]
    fn test_pool_iterates_in_priority_order() {
        let pool = RelayPool::from_urls(["https://a", "https://b", "https://c"]);
        let order: Vec<(usize, &str)> = pool.iter().map(|(i, r)| (i, r.as_str())).collect();
        assert_eq!(
            order,
            vec![(0, "https://a"), (1, "https://b"), (2, "https://c")]
        );
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_pool_clones_share_endpoints() {
        let pool = RelayPool::from_urls(["https://a"]);
        let clone = pool.clone();
        assert!(Arc::ptr_eq(&pool.endpoints, &clone.endpoints));
    }
}
