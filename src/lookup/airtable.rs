//! Airtable-compatible REST backend for the manager directory.
//!
//! Only the first page of any listing is read. Credentials are checked when a
//! request is made, not when the store is built, so a missing key surfaces as
//! a failed lookup rather than a startup error.

use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::data_url;
use crate::lookup::store::{Attachment, RecordStore, StoreRecord};
use crate::{Error, Result, StoreConfig};

/// Page size requested for name listings (the API maximum).
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    fields: WireFields,
}

#[derive(Debug, Default, Deserialize)]
struct WireFields {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Photo", default)]
    photo: Vec<Attachment>,
}

/// Escape `query` for use inside a single-quoted formula string.
pub fn quote_formula_string(query: &str) -> String {
    query.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Formula matching names equal to `query` or containing it, ignoring case.
pub fn match_formula(query: &str) -> String {
    let q = quote_formula_string(query.trim());
    format!(
        "OR(LOWER({{Name}}) = LOWER('{q}'), FIND(LOWER('{q}'), LOWER({{Name}})) > 0)",
        q = q
    )
}

pub struct AirtableStore {
    client: Client,
    config: StoreConfig,
}

impl AirtableStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("AIRTABLE_API_KEY is not set".into()))?;
        let base = self
            .config
            .base_id
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("AIRTABLE_BASE_ID is not set".into()))?;
        Ok((key, base))
    }

    /// `{api_url}/v0/{base}/{table}` with path segments escaped.
    fn endpoint(&self, base: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| Error::ConfigError(format!("invalid api url '{}': {}", self.config.api_url, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::ConfigError(format!("api url '{}' cannot take a path", self.config.api_url)))?;
            segments.pop_if_empty().extend(["v0", base, self.config.table.as_str()]);
        }
        Ok(url)
    }

    async fn list(&self, params: &[(&str, String)]) -> Result<Vec<WireRecord>> {
        let (key, base) = self.credentials()?;
        let url = self.endpoint(base)?;
        debug!("GET {} {:?}", url, params);

        let resp = self
            .client
            .get(url)
            .bearer_auth(key)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let body: ListResponse = resp.json().await?;
        debug!("store returned {} records", body.records.len());
        Ok(body.records)
    }
}

impl RecordStore for AirtableStore {
    fn list_names(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let params = [
                ("fields[]", "Name".to_string()),
                ("sort[0][field]", "Name".to_string()),
                ("sort[0][direction]", "asc".to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            let records = self.list(&params).await?;
            Ok(records.into_iter().filter_map(|r| r.fields.name).collect())
        })
    }

    fn find_candidates<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<StoreRecord>>> {
        Box::pin(async move {
            let params = [
                ("filterByFormula", match_formula(query)),
                ("maxRecords", limit.to_string()),
            ];
            let records = self.list(&params).await?;
            Ok(records
                .into_iter()
                .map(|r| StoreRecord {
                    name: r.fields.name.unwrap_or_default(),
                    photo: r.fields.photo,
                })
                .collect())
        })
    }
}

/// Download a remote photo and return it as a `data:` URL.
///
/// The mime type comes from the payload itself, not the response headers;
/// formats the rasterizer cannot decode fail with `UnsupportedImage`.
pub async fn fetch_photo(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    let mime = data_url::image_mime(&bytes)?;
    debug!("fetched photo {} ({} bytes, {})", url, bytes.len(), mime);
    Ok(data_url::encode(mime, &bytes))
}
