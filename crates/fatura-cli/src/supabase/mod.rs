//! Supabase collaborators: Storage for invoice PDFs, PostgREST for rows.

mod rest;
mod storage;

pub use rest::RestClient;
pub use storage::{MonthDocument, StorageClient};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};

use fatura_core::SupabaseSettings;

/// Longest response body quoted in error messages, in characters.
const ERROR_BODY_CHARS: usize = 800;

/// HTTP client carrying the service role credentials on every request.
fn http_client(settings: &SupabaseSettings, timeout: Duration) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(&settings.service_role_key)?;
    key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.service_role_key))?;
    bearer.set_sensitive(true);

    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .user_agent(concat!("fatura-cli/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Pass 2xx responses through; turn anything else into an error quoting the
/// start of the body.
async fn ensure_success(response: Response, action: &str) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    anyhow::bail!(
        "{} failed (HTTP {}): {}",
        action,
        status.as_u16(),
        truncate_chars(&body, ERROR_BODY_CHARS)
    )
}

/// Append path segments to the project URL, percent-encoding each one.
fn endpoint<'a, I>(base: &str, segments: I) -> anyhow::Result<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Supabase URL cannot be a base: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("ação!", 3), "açã");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint(
            "https://demo.supabase.co",
            ["storage", "v1", "object", "authenticated", "faturas"]
                .into_iter()
                .chain("2025-01/ACME LTDA/123.pdf".split('/')),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/storage/v1/object/authenticated/faturas/2025-01/ACME%20LTDA/123.pdf"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(endpoint("not a url", ["rest"]).is_err());
    }
}
