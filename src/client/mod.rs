// Country provider client
// Fetches the country catalog and detail records from a REST Countries style
// provider, and the map feature collection from an HTTP(S) URL or a local file.
// See: https://restcountries.com/#endpoints-all
//
// Every payload is converted through the identity normalizer before it leaves
// this module. Errors are reported as `FetchError`, which the loader stores in
// a `Failed` slot.

pub mod wire;

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::catalog::Entity;
use crate::identity::CanonicalKey;
use crate::map::feature::{FeatureCollection, IdentityFields};

pub use wire::{CATALOG_FIELDS, DETAIL_FIELDS};

/// Default provider base URL
pub const DEFAULT_API_BASE: &str = "https://restcountries.com/v3.1";

const USER_AGENT: &str = concat!("WorldWander/", env!("CARGO_PKG_VERSION"));

/// Error types for fetch operations
///
/// `resource` names what was being fetched ("catalog", "detail:FRA", ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure (DNS, connect, timeout, body read)
    #[error("Failed to fetch {resource}: network error: {reason}")]
    Network { resource: String, reason: String },
    /// The provider answered with a non-success status
    #[error("Failed to fetch {resource}: HTTP {status}")]
    Status { resource: String, status: u16 },
    /// The payload could not be understood
    #[error("Failed to fetch {resource}: {reason}")]
    Parse { resource: String, reason: String },
    /// The provider has no record for the key
    #[error("Failed to fetch {resource}: not found")]
    NotFound { resource: String },
}

impl FetchError {
    pub fn resource(&self) -> &str {
        match self {
            FetchError::Network { resource, .. }
            | FetchError::Status { resource, .. }
            | FetchError::Parse { resource, .. }
            | FetchError::NotFound { resource } => resource,
        }
    }

    pub fn network(resource: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Network {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(resource: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Parse {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

/// HTTP client for the country provider and the feature source
///
/// Cheap to clone: the underlying reqwest client is reference counted.
#[derive(Debug, Clone)]
pub struct CountryClient {
    http: Client,
    base_url: String,
}

impl CountryClient {
    /// Create a client against a provider base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::network("client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full catalog. Records that fail validation are skipped.
    pub async fn fetch_catalog(&self) -> Result<Vec<Entity>, FetchError> {
        let url = format!("{}/all", self.base_url);
        log::info!("Fetching country catalog from {}", url);

        let body = self.get_text("catalog", &url, &[("fields", CATALOG_FIELDS)]).await?;
        let (entities, skipped) = wire::parse_catalog(&body).map_err(|e| FetchError::parse("catalog", e))?;

        if skipped > 0 {
            log::warn!("Catalog: {} records loaded, {} skipped", entities.len(), skipped);
        } else {
            log::info!("Catalog: {} records loaded", entities.len());
        }
        Ok(entities)
    }

    /// Fetch one country's detail record
    pub async fn fetch_detail(&self, key: CanonicalKey) -> Result<Entity, FetchError> {
        let resource = format!("detail:{}", key);
        let url = format!("{}/alpha/{}", self.base_url, key);
        log::debug!("Fetching detail for {}", key);

        let body = match self.get_text(&resource, &url, &[("fields", DETAIL_FIELDS)]).await {
            Err(FetchError::Status { resource, status: 404 }) => return Err(FetchError::NotFound { resource }),
            other => other?,
        };

        match wire::parse_detail(&body).map_err(|e| FetchError::parse(&resource, e))? {
            wire::DetailParse::Found(entity) if entity.code == key => Ok(entity),
            wire::DetailParse::Found(entity) => Err(FetchError::parse(
                &resource,
                format!("provider answered with {}", entity.code),
            )),
            wire::DetailParse::Empty => Err(FetchError::NotFound { resource }),
        }
    }

    /// Fetch the map feature collection from a URL or a local file path
    pub async fn fetch_features(
        &self,
        source: &str,
        fields: &IdentityFields,
    ) -> Result<FeatureCollection, FetchError> {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            log::info!("Fetching map features from {}", source);
            self.get_text("features", source, &[]).await?
        } else {
            read_local_features(Path::new(source)).await?
        };

        let collection = FeatureCollection::parse(&body, fields).map_err(|e| FetchError::parse("features", e))?;
        log::info!(
            "Map features: {} loaded, {} interactive",
            collection.len(),
            collection.interactive_count()
        );
        Ok(collection)
    }

    async fn get_text(&self, resource: &str, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::network(resource, e))?;

        let status = response.status();
        log::debug!("{} response status: {}", resource, status);
        if !status.is_success() {
            return Err(FetchError::Status {
                resource: resource.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::network(resource, e))
    }
}

async fn read_local_features(path: &Path) -> Result<String, FetchError> {
    log::info!("Reading map features from {}", path.display());
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FetchError::network("features", format!("{}: {}", path.display(), e)))
}
