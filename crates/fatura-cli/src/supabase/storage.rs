//! Supabase Storage: month listing and authenticated downloads.
//!
//! Invoices are stored as `YYYY-MM/<customer>/<code>.pdf`.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use fatura_core::models::config::SyncConfig;
use fatura_core::models::row::strip_pdf_extension;
use fatura_core::{DocumentContext, SupabaseSettings};

use super::{endpoint, ensure_success, http_client};

/// One entry returned by the list endpoint; folders and files alike.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEntry {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

/// An invoice PDF found under a month prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthDocument {
    pub customer: String,
    pub code: String,
    pub object_key: String,
}

impl MonthDocument {
    /// Identity of the document for the given reference month.
    pub fn context(&self, reference_month: &str) -> anyhow::Result<DocumentContext> {
        Ok(DocumentContext::new(
            reference_month,
            self.customer.as_str(),
            self.code.as_str(),
        )?)
    }
}

/// Client for the Storage API of one bucket.
pub struct StorageClient {
    list_http: Client,
    download_http: Client,
    base_url: String,
    bucket: String,
    page_size: usize,
}

impl StorageClient {
    pub fn new(settings: &SupabaseSettings, sync: &SyncConfig) -> anyhow::Result<Self> {
        Ok(Self {
            list_http: http_client(settings, Duration::from_secs(sync.list_timeout_secs))?,
            download_http: http_client(settings, Duration::from_secs(sync.download_timeout_secs))?,
            base_url: settings.url.clone(),
            bucket: settings.bucket.clone(),
            page_size: sync.list_page_size.max(1),
        })
    }

    /// List every entry under `prefix`, following pages until a short one.
    pub async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StorageEntry>> {
        let url = endpoint(
            &self.base_url,
            ["storage", "v1", "object", "list", self.bucket.as_str()],
        )?;

        let mut entries = Vec::new();
        let mut offset = 0;
        loop {
            let request = ListRequest {
                prefix,
                limit: self.page_size,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            };

            trace!("POST {} prefix={} offset={}", url, prefix, offset);
            let response = self.list_http.post(url.clone()).json(&request).send().await?;
            let response = ensure_success(response, "Storage list").await?;

            let body = response.text().await?;
            let page: Vec<StorageEntry> = if body.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&body)?
            };

            let page_len = page.len();
            entries.extend(page);
            if page_len < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        debug!("Listed {} entries under {}", entries.len(), prefix);
        Ok(entries)
    }

    /// Find every invoice PDF of a month, customer by customer.
    pub async fn list_month_documents(&self, month: &str) -> anyhow::Result<Vec<MonthDocument>> {
        let top = self.list(&format!("{}/", month)).await?;

        let mut documents = Vec::new();
        for customer in customer_folders(&top) {
            let entries = self.list(&format!("{}/{}/", month, customer)).await?;
            documents.extend(month_documents(month, &customer, &entries));
        }

        Ok(documents)
    }

    /// Download an object as bytes.
    pub async fn download(&self, object_key: &str) -> anyhow::Result<Vec<u8>> {
        let url = endpoint(
            &self.base_url,
            ["storage", "v1", "object", "authenticated", self.bucket.as_str()]
                .into_iter()
                .chain(object_key.split('/')),
        )?;

        let response = self.download_http.get(url).send().await?;
        let response = ensure_success(response, "Storage download").await?;

        let mut data = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        debug!("Downloaded {} ({} bytes)", object_key, data.len());
        Ok(data)
    }
}

/// First-level names that are not PDFs, sorted and deduplicated.
pub fn customer_folders(entries: &[StorageEntry]) -> Vec<String> {
    let mut folders: Vec<String> = entries
        .iter()
        .map(|e| e.name.trim())
        .filter(|name| !name.is_empty() && strip_pdf_extension(name).is_none())
        .map(str::to_string)
        .collect();

    folders.sort();
    folders.dedup();
    folders
}

/// PDF entries of one customer folder.
pub fn month_documents(month: &str, customer: &str, entries: &[StorageEntry]) -> Vec<MonthDocument> {
    entries
        .iter()
        .filter_map(|e| {
            let name = e.name.trim();
            let code = strip_pdf_extension(name)?;
            Some(MonthDocument {
                customer: customer.to_string(),
                code: code.to_string(),
                object_key: format!("{}/{}/{}", month, customer, name),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(names: &[&str]) -> Vec<StorageEntry> {
        names
            .iter()
            .map(|n| StorageEntry {
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_customer_folders() {
        let top = entries(&["ZETA", "ACME", "stray.PDF", " ", "ACME", "Beta Ltda"]);
        assert_eq!(customer_folders(&top), vec!["ACME", "Beta Ltda", "ZETA"]);
    }

    #[test]
    fn test_month_documents() {
        let items = entries(&["123456.pdf", "notes.txt", "654321.PDF", ".emptyFolderPlaceholder"]);
        let docs = month_documents("2025-01", "ACME", &items);

        assert_eq!(
            docs,
            vec![
                MonthDocument {
                    customer: "ACME".to_string(),
                    code: "123456".to_string(),
                    object_key: "2025-01/ACME/123456.pdf".to_string(),
                },
                MonthDocument {
                    customer: "ACME".to_string(),
                    code: "654321".to_string(),
                    object_key: "2025-01/ACME/654321.PDF".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_document_context() {
        let doc = MonthDocument {
            customer: "ACME".to_string(),
            code: "123".to_string(),
            object_key: "2025-01/ACME/123.pdf".to_string(),
        };
        let ctx = doc.context("2025-01").unwrap();
        assert_eq!(ctx.customer_code, "123");
        assert!(doc.context("2025").is_err());
    }

    #[test]
    fn test_list_request_shape() {
        let request = ListRequest {
            prefix: "2025-01/",
            limit: 1000,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prefix": "2025-01/",
                "limit": 1000,
                "offset": 0,
                "sortBy": {"column": "name", "order": "asc"}
            })
        );
    }

    #[test]
    fn test_entry_tolerates_missing_fields() {
        let parsed: Vec<StorageEntry> =
            serde_json::from_str(r#"[{"name": "ACME", "id": null}, {"id": "x"}]"#).unwrap();
        assert_eq!(parsed[0].name, "ACME");
        assert_eq!(parsed[1].name, "");
    }
}
