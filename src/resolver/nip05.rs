//! NIP-05 identity lookups over HTTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use nostr_sdk::PublicKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::IdentityService;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Nip05Document {
    #[serde(default)]
    names: HashMap<String, String>,
}

/// Split `name@domain` (or a bare `domain`) into `(local, domain)`.
///
/// A bare domain and `_@domain` both address the root identity `_`.
pub fn split_identifier(identifier: &str) -> Option<(String, String)> {
    let identifier = identifier.trim();
    let (local, domain) = match identifier.split_once('@') {
        Some((local, domain)) => (local, domain),
        None => ("_", identifier),
    };
    let local = if local.is_empty() { "_" } else { local };
    if domain.is_empty() || !domain.contains('.') || domain.contains('/') {
        return None;
    }
    Some((local.to_lowercase(), domain.to_lowercase()))
}

/// Resolves `name@domain` through `https://domain/.well-known/nostr.json`.
#[derive(Clone)]
pub struct Nip05Client {
    http: reqwest::Client,
    /// Replaces `https://<domain>` when set; used for tests and proxies.
    base_url: Option<String>,
}

impl Default for Nip05Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Nip05Client {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: None,
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::new()
        }
    }

    fn document_url(&self, domain: &str) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{domain}"));
        format!("{}/.well-known/nostr.json", base.trim_end_matches('/'))
    }

    async fn fetch_names(&self, local: &str, domain: &str) -> Result<HashMap<String, String>> {
        let url = self.document_url(domain);
        debug!(%url, name = local, "Fetching NIP-05 document");
        let doc: Nip05Document = self
            .http
            .get(&url)
            .query(&[("name", local)])
            .send()
            .await
            .with_context(|| format!("NIP-05 request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("NIP-05 endpoint returned an error: {url}"))?
            .json()
            .await
            .context("Invalid NIP-05 document")?;
        Ok(doc.names)
    }
}

fn pick_name(names: &HashMap<String, String>, local: &str) -> Option<PublicKey> {
    let hex = names.get(local).or_else(|| {
        names
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(local))
            .map(|(_, hex)| hex)
    })?;
    PublicKey::from_hex(hex).ok()
}

#[async_trait]
impl IdentityService for Nip05Client {
    async fn lookup(&self, identifier: &str) -> Result<Option<PublicKey>> {
        let Some((local, domain)) = split_identifier(identifier) else {
            return Ok(None);
        };
        let names = self.fetch_names(&local, &domain).await?;
        Ok(pick_name(&names, &local))
    }

    async fn verify(&self, pubkey: &PublicKey, identifier: &str) -> Result<bool> {
        Ok(self.lookup(identifier).await? == Some(*pubkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::Keys;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn splits_identifiers() {
        assert_eq!(
            split_identifier("Alice@Example.com"),
            Some(("alice".into(), "example.com".into()))
        );
        assert_eq!(
            split_identifier("example.com"),
            Some(("_".into(), "example.com".into()))
        );
        assert_eq!(
            split_identifier("@example.com"),
            Some(("_".into(), "example.com".into()))
        );
        assert_eq!(split_identifier("alice"), None);
        assert_eq!(split_identifier("alice@"), None);
    }

    async fn server_with(name: &str, hex: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/nostr.json"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "names": { name: hex }
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn resolves_and_verifies() {
        let pk = Keys::generate().public_key();
        let server = server_with("alice", &pk.to_hex()).await;
        let client = Nip05Client::with_base_url(server.uri());

        assert_eq!(client.lookup("alice@example.com").await.unwrap(), Some(pk));
        assert!(client.verify(&pk, "alice@example.com").await.unwrap());

        let other = Keys::generate().public_key();
        assert!(!client.verify(&other, "alice@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_name_is_none() {
        let pk = Keys::generate().public_key();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "names": { "carol": pk.to_hex() }
            })))
            .mount(&server)
            .await;
        let client = Nip05Client::with_base_url(server.uri());
        assert_eq!(client.lookup("dave@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn local_part_is_query_encoded() {
        let pk = Keys::generate().public_key();
        let server = server_with("a&b #c", &pk.to_hex()).await;
        let client = Nip05Client::with_base_url(server.uri());
        assert_eq!(client.lookup("a&b #c@example.com").await.unwrap(), Some(pk));
    }

    #[tokio::test]
    async fn http_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = Nip05Client::with_base_url(server.uri());
        assert!(client.lookup("alice@example.com").await.is_err());
    }
}
