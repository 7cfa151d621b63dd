use anyhow::{Context, Result};
use clap::Subcommand;
use nostr_core::filter::QueryFilter;
use nostr_core::pointer::{normalize_pubkey, to_npub};
use nostr_core::RelayClient;
use nostr_sdk::prelude::*;
use serde::Serialize;
use std::time::Instant;

use nostr_search::replacements::ReplacementStore;
use nostr_search::search::QueryPlan;
use nostr_search::{Config, HitKind, SearchContext, SearchOrchestrator, SearchOutcome};

const PREVIEW_CHARS: usize = 120;

#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Run a search against the configured relays
    Search {
        /// Query, e.g. `by:alice@example.com (rust OR tokio)`
        query: String,
        /// Search inside this profile (npub or hex)
        #[clap(long)]
        profile: Option<String>,
        /// Override the configured result ceiling
        #[clap(long)]
        limit: Option<usize>,
        /// Print results as JSON lines
        #[clap(long)]
        json: bool,
    },
    /// Show how a query expands, without touching relays
    Expand {
        query: String,
    },
    /// Resolve an author token to an npub
    Resolve {
        /// npub, hex, name@domain or display name
        token: String,
        /// Also check the NIP-05 identifier against the resolved key
        #[clap(long)]
        verify: bool,
    },
    /// List configured relays
    Relays {
        /// Also check that the relays answer
        #[clap(long)]
        check: bool,
    },
}

pub async fn handle_command(cmd: SearchCommands, mut config: Config) -> Result<()> {
    match cmd {
        SearchCommands::Search {
            query,
            profile,
            limit,
            json,
        } => {
            if let Some(limit) = limit {
                config.search.limit = limit;
            }
            cmd_search(&query, profile.as_deref(), json, &config).await
        }
        SearchCommands::Expand { query } => cmd_expand(&query, &config).await,
        SearchCommands::Resolve { token, verify } => cmd_resolve(&token, verify, &config).await,
        SearchCommands::Relays { check } => cmd_relays(check, &config).await,
    }
}

#[derive(Serialize)]
struct Hit<'a> {
    id: String,
    author: String,
    kind: HitKind,
    created_at: u64,
    content: &'a str,
}

async fn cmd_search(query: &str, profile: Option<&str>, json: bool, config: &Config) -> Result<()> {
    let context = match profile {
        Some(raw) => SearchContext::profile(
            normalize_pubkey(raw).with_context(|| format!("Not a public key: {raw}"))?,
        ),
        None => SearchContext::global(),
    };

    let orchestrator = SearchOrchestrator::connect(config).await?;
    let started = Instant::now();
    let outcome = tokio::select! {
        outcome = orchestrator.handle_search(query, &context) => outcome,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.clear();
            println!("Search cancelled.");
            return Ok(());
        }
    };
    let elapsed = started.elapsed();

    match outcome {
        SearchOutcome::Redirected(redirect) => {
            println!("Query belongs to another profile: {}", redirect.npub);
            println!("  re-run with: --profile {} \"{}\"", redirect.npub, redirect.query);
            return Ok(());
        }
        SearchOutcome::Cleared => {
            println!("Empty query.");
            return Ok(());
        }
        SearchOutcome::Superseded | SearchOutcome::Committed { .. } => {}
    }

    let state = orchestrator.state();
    if json {
        for event in &state.results {
            let hit = Hit {
                id: event.id.to_hex(),
                author: to_npub(&event.pubkey),
                kind: HitKind::of(event),
                created_at: event.created_at.as_u64(),
                content: &event.content,
            };
            println!("{}", serde_json::to_string(&hit)?);
        }
        return Ok(());
    }

    if state.results.is_empty() {
        println!("No results ({:.1}s).", elapsed.as_secs_f64());
        return Ok(());
    }
    for event in &state.results {
        println!(
            "[{:<9}] {}  {}  {}",
            HitKind::of(event).label(),
            format_date(event.created_at.as_u64()),
            event.id.to_bech32().unwrap_or_else(|_| event.id.to_hex()),
            to_npub(&event.pubkey)
        );
        println!("            {}", preview(&event.content));
    }
    println!("\n{} result(s) in {:.1}s", state.results.len(), elapsed.as_secs_f64());
    Ok(())
}

#[derive(Serialize)]
struct ExpandedBranch {
    query: String,
    filter: QueryFilter,
}

#[derive(Serialize)]
struct Expansion {
    input: String,
    replaced: String,
    authors_to_resolve: Vec<String>,
    branches: Vec<ExpandedBranch>,
}

async fn cmd_expand(query: &str, config: &Config) -> Result<()> {
    let replacements = ReplacementStore::new(config.rule_source());
    let replaced = replacements.apply(query).await;
    let plan = QueryPlan::build(&replaced);

    let expansion = Expansion {
        input: query.to_string(),
        replaced: plan.query.clone(),
        authors_to_resolve: plan.author_tokens.clone(),
        branches: plan
            .branches
            .iter()
            .map(|branch| ExpandedBranch {
                query: branch.clone(),
                filter: QueryFilter::from_query(branch, &config.search.default_kinds),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&expansion)?);
    Ok(())
}

async fn cmd_resolve(token: &str, verify: bool, config: &Config) -> Result<()> {
    let orchestrator = SearchOrchestrator::connect(config).await?;
    let resolver = orchestrator.resolver();

    let pubkey = resolver
        .resolve(token)
        .await
        .with_context(|| format!("Could not resolve {token}"))?;

    println!("  npub: {}", to_npub(&pubkey));
    println!("  hex:  {}", pubkey.to_hex());

    if verify {
        let verified = resolver.verify_identity(&pubkey, token).await;
        println!("  nip05 verified: {}", if verified { "yes" } else { "no" });
    }
    Ok(())
}

async fn cmd_relays(check: bool, config: &Config) -> Result<()> {
    if config.relays.urls.is_empty() {
        println!("No relays configured.");
        return Ok(());
    }
    println!("Configured relays:");
    for url in &config.relays.urls {
        println!("  {url}");
    }
    if check {
        let relay = RelayClient::new(config.relays.urls.clone()).await?;
        let reachable = relay.is_reachable(config.fetch_timeout()).await;
        println!("\nReachable: {}", if reachable { "yes" } else { "no" });
    }
    Ok(())
}

fn format_date(created_at: u64) -> String {
    i64::try_from(created_at)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn preview(content: &str) -> String {
    let flat: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let truncated: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{truncated}…")
}
