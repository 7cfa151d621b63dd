//! Lazily loaded shortcut rule table.
//!
//! The rule file is fetched at most once per store. A failed load is
//! logged and cached as an empty table, so replacements quietly become a
//! no-op for the rest of the session instead of retrying on every query.

use anyhow::{Context, Result};
use nostr_core::replacements::ReplacementRules;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const RULE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the rule file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Url(String),
    File(PathBuf),
    Inline(String),
}

impl RuleSource {
    /// `http(s)://…` is a URL, anything else a (tilde-expanded) path.
    pub fn from_location(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(shellexpand::tilde(location).as_ref()))
        }
    }
}

pub struct ReplacementStore {
    source: Option<RuleSource>,
    http: reqwest::Client,
    rules: OnceCell<Arc<ReplacementRules>>,
}

impl ReplacementStore {
    pub fn new(source: Option<RuleSource>) -> Self {
        Self::with_timeout(source, RULE_FETCH_TIMEOUT)
    }

    /// A stalled rule endpoint counts as a failed load after `timeout`.
    pub fn with_timeout(source: Option<RuleSource>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self::with_client(source, http)
    }

    pub fn with_client(source: Option<RuleSource>, http: reqwest::Client) -> Self {
        Self {
            source,
            http,
            rules: OnceCell::new(),
        }
    }

    /// A store that never loads anything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// The rule table, loading it on first use.
    pub async fn rules(&self) -> Arc<ReplacementRules> {
        self.rules
            .get_or_init(|| async {
                let rules = match self.load().await {
                    Ok(Some(text)) => ReplacementRules::parse(&text),
                    Ok(None) => ReplacementRules::empty(),
                    Err(e) => {
                        warn!("Failed to load replacement rules, continuing without: {e:#}");
                        ReplacementRules::empty()
                    }
                };
                info!(rules = rules.len(), "Replacement rules ready");
                Arc::new(rules)
            })
            .await
            .clone()
    }

    /// Apply the shortcut rules to a query.
    pub async fn apply(&self, query: &str) -> String {
        let rules = self.rules().await;
        let replaced = rules.apply(query);
        if replaced != query {
            debug!(from = query, to = %replaced, "Applied replacement rules");
        }
        replaced
    }

    pub fn is_loaded(&self) -> bool {
        self.rules.initialized()
    }

    async fn load(&self) -> Result<Option<String>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        let text = match source {
            RuleSource::Inline(text) => text.clone(),
            RuleSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read rule file: {}", path.display()))?,
            RuleSource::Url(url) => self
                .http
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to fetch rules from {url}"))?
                .error_for_status()
                .with_context(|| format!("Rule endpoint returned an error: {url}"))?
                .text()
                .await
                .context("Failed to read rule response body")?,
        };
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RULES: &str = "is:code => kind:1337\nis:highlight => kind:9802\n";

    #[test]
    fn location_classification() {
        assert_eq!(
            RuleSource::from_location("https://x.io/r.txt"),
            RuleSource::Url("https://x.io/r.txt".into())
        );
        assert!(matches!(
            RuleSource::from_location("/etc/rules.txt"),
            RuleSource::File(_)
        ));
    }

    #[tokio::test]
    async fn inline_rules_apply() {
        let store = ReplacementStore::new(Some(RuleSource::Inline(RULES.into())));
        assert!(!store.is_loaded());
        assert_eq!(store.apply("is:code #rust").await, "kind:1337 #rust");
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn disabled_store_is_identity() {
        let store = ReplacementStore::disabled();
        assert_eq!(store.apply("is:code").await, "is:code");
    }

    #[tokio::test]
    async fn url_is_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/replacements.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RULES))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/replacements.txt", server.uri());
        let store = ReplacementStore::new(Some(RuleSource::Url(url)));
        assert_eq!(store.apply("is:code").await, "kind:1337");
        assert_eq!(store.apply("is:highlight").await, "kind:9802");
    }

    #[tokio::test]
    async fn failed_load_degrades_to_noop_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = ReplacementStore::new(Some(RuleSource::Url(server.uri())));
        assert_eq!(store.apply("is:code").await, "is:code");
        assert_eq!(store.apply("is:code").await, "is:code");
        assert!(store.rules().await.is_empty());
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out_to_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RULES)
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let store = ReplacementStore::with_timeout(
            Some(RuleSource::Url(server.uri())),
            Duration::from_millis(200),
        );
        let applied = tokio::time::timeout(Duration::from_secs(5), store.apply("is:code")).await;
        assert_eq!(applied.unwrap(), "is:code");
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn missing_file_degrades_to_noop() {
        let store = ReplacementStore::new(Some(RuleSource::File("/no/such/rules.txt".into())));
        assert_eq!(store.apply("is:code").await, "is:code");
    }
}
