//! PostgREST upserts keyed on the row fingerprint.

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::{Client, Url};
use tracing::{debug, info};

use fatura_core::models::config::SyncConfig;
use fatura_core::{LineItemRow, SupabaseSettings};

use super::{endpoint, ensure_success, http_client};

/// Conflict column for upserts.
const CONFLICT_COLUMN: &str = "row_hash";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// Client for upserting rows into one table.
pub struct RestClient {
    http: Client,
    url: Url,
    table: String,
}

impl RestClient {
    pub fn new(settings: &SupabaseSettings, sync: &SyncConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(settings, upsert_timeout(sync))?,
            url: upsert_url(&settings.url, &settings.table)?,
            table: settings.table.clone(),
        })
    }

    /// Upsert rows in batches; existing rows with the same fingerprint are
    /// merged. Returns the number of rows sent.
    pub async fn upsert(
        &self,
        rows: &[LineItemRow],
        batch_size: usize,
        mut on_batch: impl FnMut(usize),
    ) -> anyhow::Result<usize> {
        let batch_size = batch_size.max(1);
        let mut sent = 0;

        for (idx, batch) in rows.chunks(batch_size).enumerate() {
            let first = idx * batch_size + 1;
            info!(
                "POST {} batch={} ({}-{} of {})",
                self.table,
                batch.len(),
                first,
                first + batch.len() - 1,
                rows.len()
            );

            let response = self
                .http
                .post(self.url.clone())
                .header("Prefer", HeaderValue::from_static(PREFER_MERGE))
                .json(batch)
                .send()
                .await?;
            let response = ensure_success(response, "Upsert").await?;
            debug!("Upsert status {}", response.status());

            sent += batch.len();
            on_batch(batch.len());
        }

        Ok(sent)
    }
}

fn upsert_timeout(sync: &SyncConfig) -> Duration {
    Duration::from_secs(sync.upsert_timeout_secs)
}

fn upsert_url(base: &str, table: &str) -> anyhow::Result<Url> {
    let mut url = endpoint(base, ["rest", "v1", table])?;
    url.query_pairs_mut().append_pair("on_conflict", CONFLICT_COLUMN);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_timeout_is_separate_from_downloads() {
        let mut sync = SyncConfig::default();
        assert_eq!(upsert_timeout(&sync), Duration::from_secs(120));

        sync.download_timeout_secs = 600;
        assert_eq!(upsert_timeout(&sync), Duration::from_secs(120));
    }

    #[test]
    fn test_upsert_url() {
        let url = upsert_url("https://demo.supabase.co", "faturas_elektro_itens").unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/faturas_elektro_itens?on_conflict=row_hash"
        );
    }
}
