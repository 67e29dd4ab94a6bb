//! Remote catalog client: one HTTPS GET per validation attempt.
//!
//! Retry policy belongs to the validation state machine, not this layer. A
//! fetch either yields the raw response bytes or a transport failure; the
//! scanner decides what the bytes mean.

mod scanner;

pub use scanner::{scan, CatalogRecord};

use std::time::Duration;
use tracing::debug;

use crate::error::{IdlerError, Result};

const STORE_ENDPOINT: &str = "https://store.steampowered.com/api/appdetails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Catalog returned an empty response")]
    EmptyResponse,
}

pub trait CatalogTransport {
    fn fetch(&self, appid: &str) -> std::result::Result<Vec<u8>, TransportError>;
}

/// The real transport: blocking HTTPS against the Steam Store.
pub struct HttpCatalog {
    client: reqwest::blocking::Client,
}

impl HttpCatalog {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("steam-idler/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(IdlerError::HttpClient)?;
        Ok(Self { client })
    }
}

impl CatalogTransport for HttpCatalog {
    fn fetch(&self, appid: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let url = format!("{}?appids={}", STORE_ENDPOINT, appid);
        debug!(%url, "Fetching catalog entry");
        // The scanner decides existence from the body, so the HTTP status is
        // deliberately not inspected here.
        let response = self.client.get(&url).send()?;
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }
}
