use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use shared::{
    domain::{Fields, Record, RecordId},
    error::StoreErrorBody,
};
use tracing::debug;
use url::Url;

use crate::{collection::CollectionSpec, config::Settings, error::StoreError};

/// The hosted backend that owns every row. The view only ever reads whole
/// collections and submits single-row mutations through it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows of the collection in server order.
    async fn list(&self, spec: &CollectionSpec) -> Result<Vec<Record>, StoreError>;
    async fn insert(&self, spec: &CollectionSpec, fields: Fields) -> Result<Record, StoreError>;
    async fn update(
        &self,
        spec: &CollectionSpec,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Record, StoreError>;
    async fn delete(&self, spec: &CollectionSpec, id: &RecordId) -> Result<(), StoreError>;
}

/// [`RemoteStore`] over the Supabase REST endpoint (PostgREST).
pub struct HttpStore {
    http: Client,
    rest_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl HttpStore {
    /// `rest_url` is the `/rest/v1/` base and must end with a slash.
    pub fn new(rest_url: Url, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            rest_url,
            anon_key: anon_key.into(),
            access_token: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            rest_url: settings.rest_base_url()?,
            anon_key: settings.anon_key.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    /// Authorize requests as the signed-in user instead of the anonymous role.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn table_url(&self, spec: &CollectionSpec) -> Result<Url, StoreError> {
        self.rest_url
            .join(spec.table)
            .map_err(|err| StoreError::Network(format!("invalid table url: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn mutation(&self, method: Method, url: Url) -> RequestBuilder {
        self.request(method, url)
            .header("Prefer", "return=representation")
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list(&self, spec: &CollectionSpec) -> Result<Vec<Record>, StoreError> {
        let url = self.table_url(spec)?;
        debug!(table = spec.table, "store: listing rows");
        let response = self
            .request(Method::GET, url)
            .query(&[("select", "*".to_string()), ("order", spec.order_param())])
            .send()
            .await?;
        read_rows(response).await
    }

    async fn insert(&self, spec: &CollectionSpec, fields: Fields) -> Result<Record, StoreError> {
        let url = self.table_url(spec)?;
        debug!(table = spec.table, "store: inserting row");
        let response = self
            .mutation(Method::POST, url)
            .json(&[fields])
            .send()
            .await?;
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no representation".into()))
    }

    async fn update(
        &self,
        spec: &CollectionSpec,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let url = self.table_url(spec)?;
        debug!(table = spec.table, id = %id, "store: updating row");
        let response = self
            .mutation(Method::PATCH, url)
            .query(&[("id", format!("eq.{id}"))])
            .json(&fields)
            .send()
            .await?;
        read_rows(response)
            .await
            .map_err(|err| not_found_for(err, id))?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn delete(&self, spec: &CollectionSpec, id: &RecordId) -> Result<(), StoreError> {
        let url = self.table_url(spec)?;
        debug!(table = spec.table, id = %id, "store: deleting row");
        let response = self
            .mutation(Method::DELETE, url)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        let removed = read_rows(response)
            .await
            .map_err(|err| not_found_for(err, id))?;
        if removed.is_empty() {
            return Err(StoreError::NotFound { id: id.clone() });
        }
        Ok(())
    }
}

async fn read_rows(response: Response) -> Result<Vec<Record>, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<StoreErrorBody>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) if text.is_empty() => (None, status.to_string()),
        Err(_) => (None, text),
    };
    Err(StoreError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}

fn not_found_for(err: StoreError, id: &RecordId) -> StoreError {
    match err {
        StoreError::Rejected { code: Some(code), .. }
            if code == shared::error::NO_ROWS_CODE =>
        {
            StoreError::NotFound { id: id.clone() }
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
