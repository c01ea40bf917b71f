use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::fmt;
use std::future::Future;

use crate::config::Config;
use crate::models::{Record, UpsertResponse};

/// Anything that can take a batch of rows and upsert them into a named table.
pub trait RecordStore {
    fn upsert(
        &self,
        table: &str,
        on_conflict: &[&str],
        rows: &[Record],
    ) -> impl Future<Output = Result<UpsertResponse>>;
}

/// PostgREST client for the Supabase warehouse.
pub struct SupabaseClient {
    client: Client,
    rest_url: String,
}

impl SupabaseClient {
    pub fn new(url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("SUPABASE_KEY is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("SUPABASE_KEY is not a valid header value")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // merge on primary-key conflict instead of failing the insert
        headers.insert(
            "prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }
}

impl RecordStore for SupabaseClient {
    async fn upsert(&self, table: &str, on_conflict: &[&str], rows: &[Record]) -> Result<UpsertResponse> {
        let url = format!("{}/{}", self.rest_url, table);

        let response = self
            .client
            .post(&url)
            .query(&[("on_conflict", on_conflict.join(","))])
            .json(rows)
            .send()
            .await
            .with_context(|| format!("Upsert request to {} failed", table))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(UpsertResponse { status, body })
    }
}

/// Build the warehouse client from the run configuration.
pub fn connect(config: &Config) -> Result<SupabaseClient> {
    SupabaseClient::new(&config.supabase_url, &config.supabase_key)
}

/// Outcome of a chunked upsert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpsertReport {
    pub table: String,
    pub total_records: usize,
    pub batches: usize,
    /// `(start, end)` row ranges of batches the warehouse rejected
    pub failed_batches: Vec<(usize, usize)>,
}

impl UpsertReport {
    pub fn has_failures(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}

impl fmt::Display for UpsertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upsert complete: {} records into {} in {} batches ({} failed)",
            self.total_records,
            self.table,
            self.batches,
            self.failed_batches.len()
        )
    }
}

/// Upsert `records` into `table` in slices of `chunk_size`.
///
/// A batch the warehouse rejects is logged and skipped; later batches still
/// run. Transport errors abort.
pub async fn upsert_in_chunks<S: RecordStore>(
    store: &S,
    table: &str,
    on_conflict: &[&str],
    records: &[Record],
    chunk_size: usize,
) -> Result<UpsertReport> {
    let chunk_size = chunk_size.max(1);
    let mut report = UpsertReport {
        table: table.to_string(),
        total_records: records.len(),
        ..Default::default()
    };

    for (i, chunk) in records.chunks(chunk_size).enumerate() {
        let start = i * chunk_size;
        let end = start + chunk.len();
        tracing::info!("Upserting records {} to {} into {}...", start, end, table);

        let response = store.upsert(table, on_conflict, chunk).await?;
        report.batches += 1;

        if response.is_success() {
            tracing::info!("Successfully upserted records {} to {}.", start, end);
        } else {
            tracing::error!(
                "Error upserting chunk {} to {} ({}): {}",
                start,
                end,
                response.status,
                response.body
            );
            report.failed_batches.push((start, end));
        }
    }

    Ok(report)
}
