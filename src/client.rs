use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use urlencoding::encode;
use wreq::{Client, header};

use crate::types::{
    GeneralSearchResponse, GeoNameEntry, PostalCodeEntry, PostalCodeSearchResponse, PostalRecord,
};

pub const DEFAULT_BASE_URL: &str = "https://secure.geonames.org";
const MAX_ROWS: u32 = 20;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The three lookups issued for every query, in merge precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// Postcodes starting with the query
    PostcodePrefix,
    /// Place names starting with the query
    PlaceNamePrefix,
    /// Populated places matching the query anywhere
    GeneralSearch,
}

impl LookupKind {
    pub const ALL: [LookupKind; 3] = [
        LookupKind::PostcodePrefix,
        LookupKind::PlaceNamePrefix,
        LookupKind::GeneralSearch,
    ];
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostcodePrefix => write!(f, "postcode_prefix"),
            Self::PlaceNamePrefix => write!(f, "place_name_prefix"),
            Self::GeneralSearch => write!(f, "general_search"),
        }
    }
}

/// A source of postal records for a single lookup strategy.
///
/// Errors are reported to the caller; the search engine decides whether to absorb them.
pub trait PostcodeLookup: Send + Sync {
    fn lookup(
        &self,
        kind: LookupKind,
        query: &str,
        username: &str,
        country: &str,
    ) -> impl Future<Output = Result<Vec<PostalRecord>>> + Send;
}

/// Configuration for GeoNamesClient
#[derive(Debug, Clone)]
pub struct GeoNamesConfig {
    /// Service root, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GeoNamesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for the GeoNames web services.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct GeoNamesClient {
    http_client: Client,
    base_url: String,
}

impl GeoNamesClient {
    pub fn new() -> Result<Self> {
        Self::with_config(GeoNamesConfig::default())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(GeoNamesConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: GeoNamesConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .zstd(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request URL for a lookup. Every parameter is percent-encoded.
    pub fn lookup_url(&self, kind: LookupKind, query: &str, username: &str, country: &str) -> String {
        let (endpoint, search_param) = match kind {
            LookupKind::PostcodePrefix => ("postalCodeSearchJSON", "postalcode_startsWith"),
            LookupKind::PlaceNamePrefix => ("postalCodeSearchJSON", "placeName_startsWith"),
            LookupKind::GeneralSearch => ("searchJSON", "q"),
        };
        let feature_class = match kind {
            LookupKind::GeneralSearch => "&featureClass=P",
            _ => "",
        };

        format!(
            "{}/{}?{}={}&country={}{}&maxRows={}&username={}",
            self.base_url,
            endpoint,
            search_param,
            encode(query),
            encode(country),
            feature_class,
            MAX_ROWS,
            encode(username)
        )
    }

    /// GET a JSON payload, failing on transport errors, non-success status or bad JSON
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context("GeoNames request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read GeoNames response body")?;

        if !status.is_success() {
            anyhow::bail!("GeoNames request failed: {}", status);
        }

        serde_json::from_str(&body).context("Failed to parse GeoNames response")
    }
}

impl PostcodeLookup for GeoNamesClient {
    async fn lookup(
        &self,
        kind: LookupKind,
        query: &str,
        username: &str,
        country: &str,
    ) -> Result<Vec<PostalRecord>> {
        let url = self.lookup_url(kind, query, username, country);

        // GeoNames reports quota and auth problems in the body of a 200 response
        let records: Vec<PostalRecord> = match kind {
            LookupKind::PostcodePrefix | LookupKind::PlaceNamePrefix => {
                let response = self.fetch_json::<PostalCodeSearchResponse>(&url).await?;
                if let Some(status) = response.status {
                    anyhow::bail!(status.describe());
                }
                response
                    .postal_codes
                    .into_iter()
                    .map(PostalCodeEntry::into_record)
                    .collect()
            }
            LookupKind::GeneralSearch => {
                let response = self.fetch_json::<GeneralSearchResponse>(&url).await?;
                if let Some(status) = response.status {
                    anyhow::bail!(status.describe());
                }
                response
                    .geonames
                    .into_iter()
                    .filter_map(GeoNameEntry::into_record)
                    .collect()
            }
        };

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_urls() {
        let client = GeoNamesClient::with_base_url("https://geo.example.com/").unwrap();

        assert_eq!(
            client.lookup_url(LookupKind::PostcodePrefix, "10", "demo", "BE"),
            "https://geo.example.com/postalCodeSearchJSON?postalcode_startsWith=10&country=BE&maxRows=20&username=demo"
        );
        assert_eq!(
            client.lookup_url(LookupKind::PlaceNamePrefix, "Leu", "demo", "BE"),
            "https://geo.example.com/postalCodeSearchJSON?placeName_startsWith=Leu&country=BE&maxRows=20&username=demo"
        );
        assert_eq!(
            client.lookup_url(LookupKind::GeneralSearch, "Leu", "demo", "BE"),
            "https://geo.example.com/searchJSON?q=Leu&country=BE&featureClass=P&maxRows=20&username=demo"
        );
    }

    #[test]
    fn test_lookup_url_encodes_parameters() {
        let client = GeoNamesClient::new().unwrap();
        let url = client.lookup_url(LookupKind::PlaceNamePrefix, "Saint Gilles&x", "a b", "BE");

        assert!(url.starts_with(DEFAULT_BASE_URL));
        assert!(url.contains("placeName_startsWith=Saint%20Gilles%26x"));
        assert!(url.contains("username=a%20b"));
    }

    #[test]
    fn test_lookup_kind_order() {
        assert_eq!(
            LookupKind::ALL,
            [
                LookupKind::PostcodePrefix,
                LookupKind::PlaceNamePrefix,
                LookupKind::GeneralSearch
            ]
        );
        assert_eq!(LookupKind::GeneralSearch.to_string(), "general_search");
    }
}
