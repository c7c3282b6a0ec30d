//! Upstream provider boundary and its HTTP implementation.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::transit::models::{Agency, Predictions, Route, RouteConfig, Schedule};

/// Errors reported by the upstream provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or its body could not be read
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The configured base URL cannot carry a path
    #[error("Invalid upstream URL '{0}'")]
    InvalidUrl(String),
}

pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// The slow, rate-limited source of transit data.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn agencies(&self) -> UpstreamResult<Vec<Agency>>;

    async fn routes(&self, agency: &str) -> UpstreamResult<Vec<Route>>;

    async fn route_config(&self, agency: &str, route: &str) -> UpstreamResult<RouteConfig>;

    async fn predictions(
        &self,
        agency: &str,
        route: &str,
        stop: &str,
    ) -> UpstreamResult<Predictions>;

    async fn schedules(&self, agency: &str, route: &str) -> UpstreamResult<Vec<Schedule>>;
}

/// Fetches JSON documents from an HTTP provider rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| UpstreamError::InvalidUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> UpstreamResult<T> {
        let url = self.url(segments)?;
        debug!(url = %url, "Upstream GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn agencies(&self) -> UpstreamResult<Vec<Agency>> {
        self.get_json(&["agencies"]).await
    }

    async fn routes(&self, agency: &str) -> UpstreamResult<Vec<Route>> {
        self.get_json(&["agencies", agency, "routes"]).await
    }

    async fn route_config(&self, agency: &str, route: &str) -> UpstreamResult<RouteConfig> {
        self.get_json(&["agencies", agency, "routes", route, "config"])
            .await
    }

    async fn predictions(
        &self,
        agency: &str,
        route: &str,
        stop: &str,
    ) -> UpstreamResult<Predictions> {
        self.get_json(&[
            "agencies",
            agency,
            "routes",
            route,
            "stops",
            stop,
            "predictions",
        ])
        .await
    }

    async fn schedules(&self, agency: &str, route: &str) -> UpstreamResult<Vec<Schedule>> {
        self.get_json(&["agencies", agency, "routes", route, "schedules"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let upstream = HttpUpstream::new("http://provider.local/api/");
        assert_eq!(
            upstream.url(&["agencies"]).unwrap().as_str(),
            "http://provider.local/api/agencies"
        );
        let bare = HttpUpstream::new("http://provider.local");
        assert_eq!(
            bare.url(&["agencies"]).unwrap().as_str(),
            "http://provider.local/agencies"
        );
    }

    #[test]
    fn test_url_encodes_path_parameters() {
        let upstream = HttpUpstream::new("http://provider.local");
        assert_eq!(
            upstream.url(&["agencies", "sf/muni", "routes"]).unwrap().as_str(),
            "http://provider.local/agencies/sf%2Fmuni/routes"
        );
        assert_eq!(
            upstream.url(&["agencies", "a b", "routes"]).unwrap().as_str(),
            "http://provider.local/agencies/a%20b/routes"
        );
    }

    #[test]
    fn test_unparsable_base_url() {
        let upstream = HttpUpstream::new("not a url");
        assert!(matches!(
            upstream.url(&["agencies"]),
            Err(UpstreamError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_request_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let upstream = HttpUpstream::new("http://127.0.0.1:9");
        let result = upstream.agencies().await;
        assert!(matches!(result, Err(UpstreamError::Request(_))));
    }
}
