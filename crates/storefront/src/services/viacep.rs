//! `ViaCEP` postal code client.
//!
//! Resolves Brazilian zip codes with `GET {base}/{zip}/json/`. Answers are
//! cached for 24 hours, including "not found" answers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;
use vitrine_core::ZipCode;

use crate::postal::{LookupError, PostalAddress, PostalLookup};

/// Default `ViaCEP` endpoint.
pub const DEFAULT_BASE_URL: &str = "https://viacep.com.br/ws";

const CACHE_CAPACITY: u64 = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// HTTP client for the `ViaCEP` service.
#[derive(Clone)]
pub struct ViaCepClient {
    inner: Arc<ViaCepClientInner>,
}

struct ViaCepClientInner {
    client: reqwest::Client,
    base_url: Url,
    /// `None` caches a "not found" answer.
    cache: Cache<ZipCode, Option<PostalAddress>>,
}

impl ViaCepClient {
    /// Create a client for `base_url` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Unavailable` if the HTTP client fails to build.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Unavailable(format!("could not build HTTP client: {e}")))?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ViaCepClientInner {
                client,
                base_url,
                cache,
            }),
        })
    }

    fn endpoint(&self, zip: &ZipCode) -> String {
        endpoint_for(&self.inner.base_url, zip)
    }

    async fn fetch(&self, zip: &ZipCode) -> Result<Option<PostalAddress>, LookupError> {
        let response = self
            .inner
            .client
            .get(self.endpoint(zip))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        // ViaCEP answers 400 for malformed codes; treat it as unknown.
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: serde_json::Value = response.json().await.map_err(request_error)?;
        parse_response(&body)
    }
}

#[async_trait]
impl PostalLookup for ViaCepClient {
    #[instrument(skip(self), fields(zip_code = %zip))]
    async fn lookup(&self, zip: &ZipCode) -> Result<PostalAddress, LookupError> {
        if let Some(cached) = self.inner.cache.get(zip).await {
            debug!("Cache hit for zip code");
            return cached.ok_or_else(|| LookupError::NotFound(zip.clone()));
        }

        let found = self.fetch(zip).await.inspect_err(|e| {
            warn!(error = %e, "Postal lookup failed");
        })?;

        self.inner.cache.insert(zip.clone(), found.clone()).await;
        found.ok_or_else(|| LookupError::NotFound(zip.clone()))
    }
}

fn endpoint_for(base_url: &Url, zip: &ZipCode) -> String {
    format!(
        "{}/{}/json/",
        base_url.as_str().trim_end_matches('/'),
        zip.as_str()
    )
}

fn request_error(error: reqwest::Error) -> LookupError {
    if error.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Unavailable(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

/// Decode a `ViaCEP` body. `Ok(None)` means the service reported the code as unknown.
fn parse_response(body: &serde_json::Value) -> Result<Option<PostalAddress>, LookupError> {
    let response: ViaCepResponse = serde_json::from_value(body.clone())
        .map_err(|e| LookupError::Unavailable(format!("unexpected response: {e}")))?;

    let not_found = match &response.erro {
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if not_found {
        return Ok(None);
    }

    Ok(Some(PostalAddress {
        street: response.logradouro,
        neighborhood: response.bairro,
        city: response.localidade,
        state: response.uf,
    }))
}
