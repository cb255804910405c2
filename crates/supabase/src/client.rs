//! PostgREST client for a Supabase project.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, StoreError};
use crate::query::Select;
use crate::realtime;
use crate::store::{Subscription, TableStore};

/// Client for the Supabase REST API, authenticated with the public anon key.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    rest_base: Url,
    anon_key: String,
    database_url: Option<SecretString>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_base", &self.inner.rest_base.as_str())
            .field("realtime", &self.inner.database_url.is_some())
            .finish_non_exhaustive()
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl SupabaseClient {
    /// Create a client for the project at `project_url`.
    ///
    /// `database_url` enables the change feed; without it `subscribe` fails
    /// with [`StoreError::RealtimeUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the REST endpoint URL cannot be derived.
    pub fn new(
        project_url: &Url,
        anon_key: &SecretString,
        database_url: Option<SecretString>,
    ) -> Result<Self> {
        let rest_base = Url::parse(&format!(
            "{}/rest/v1/",
            project_url.as_str().trim_end_matches('/')
        ))?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http: reqwest::Client::new(),
                rest_base,
                anon_key: anon_key.expose_secret().to_string(),
                database_url,
            }),
        })
    }

    /// REST endpoint for a table.
    fn table_url(&self, table: &str) -> Result<Url> {
        Ok(self.inner.rest_base.join(table)?)
    }

    fn select_url(&self, table: &str, query: &Select) -> Result<Url> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }

    fn row_url(&self, table: &str, id: &str) -> Result<Url> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .http
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(&self.inner.anon_key)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StoreError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Supabase returned non-success status"
            );
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Supabase response"
            );
            StoreError::Parse(e)
        })
    }
}

impl TableStore for SupabaseClient {
    #[instrument(skip_all, fields(table = %table))]
    async fn select(&self, table: &str, query: &Select) -> Result<Vec<Value>> {
        let url = self.select_url(table, query)?;
        let rows = self.send_rows(self.request(Method::GET, url)).await?;
        debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip_all, fields(table = %table, count = rows.len()))]
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let url = self.table_url(table)?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_rows(request).await
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()> {
        let url = self.row_url(table, id)?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let url = self.row_url(table, id)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn subscribe(&self, table: &str) -> Result<Subscription> {
        let database_url = self
            .inner
            .database_url
            .as_ref()
            .ok_or(StoreError::RealtimeUnavailable)?;
        realtime::listen(database_url, table).await
    }
}
