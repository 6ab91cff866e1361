//! Query engine: three GeoNames lookups merged into one canonical result list.
//!
//! GeoNames matches postal codes, place names and general place searches with
//! separate semantics, so every query is sent to all three and the answers are
//! merged in a fixed precedence order:
//!
//! 1. postcode prefix
//! 2. place-name prefix
//! 3. general place search (skipped for purely numeric queries)
//!
//! The lookups run concurrently but are merged only after all have settled, so
//! the output never depends on which response arrived first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::client::{LookupKind, PostcodeLookup};
use crate::result_cache::ResultCache;
use crate::types::PostalRecord;

/// Queries shorter than this never reach the network
pub const MIN_QUERY_LEN: usize = 2;
/// Upper bound on a merged result set
pub const MAX_RESULTS: usize = 20;

static NUMERIC_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid numeric query regex"));

pub fn is_numeric_query(query: &str) -> bool {
    NUMERIC_QUERY.is_match(query)
}

/// Whether a query is long enough to be looked up (and cached) at all
pub fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_LEN
}

/// Search postcodes and cities matching `query` within `country`.
///
/// Never fails: short queries, upstream errors and malformed payloads all
/// degrade to fewer (or no) results. A query whose lookups all failed is not
/// cached, so it is retried on the next call.
pub async fn search<L: PostcodeLookup>(
    backend: &L,
    cache: &ResultCache,
    query: &str,
    username: &str,
    country: &str,
) -> Vec<PostalRecord> {
    if !is_searchable(query) {
        return Vec::new();
    }

    if let Some(hit) = cache.get(query).await {
        tracing::debug!("Cache hit for {:?} ({} results)", query, hit.len());
        return hit;
    }

    let general = async {
        if is_numeric_query(query) {
            None
        } else {
            Some(
                backend
                    .lookup(LookupKind::GeneralSearch, query, username, country)
                    .await,
            )
        }
    };

    let (postcode_prefix, place_name_prefix, general) = futures::join!(
        backend.lookup(LookupKind::PostcodePrefix, query, username, country),
        backend.lookup(LookupKind::PlaceNamePrefix, query, username, country),
        general,
    );

    let outcomes = [
        (LookupKind::PostcodePrefix, Some(postcode_prefix)),
        (LookupKind::PlaceNamePrefix, Some(place_name_prefix)),
        (LookupKind::GeneralSearch, general),
    ];

    let mut attempted = 0;
    let mut ranked = Vec::with_capacity(outcomes.len());
    for (kind, outcome) in outcomes {
        let Some(outcome) = outcome else { continue };
        attempted += 1;
        match outcome {
            Ok(records) => {
                tracing::debug!("{} lookup for {:?} returned {} rows", kind, query, records.len());
                ranked.push(records);
            }
            Err(e) => tracing::warn!("{} lookup for {:?} failed: {:#}", kind, query, e),
        }
    }

    if ranked.is_empty() {
        tracing::warn!("All {} lookups failed for {:?}, not caching", attempted, query);
        return Vec::new();
    }

    let results = merge_ranked(ranked);
    cache.put(query, results.clone()).await;
    results
}

/// Merge result lists in the order given.
///
/// Invalid records are dropped, the first occurrence of each `(postcode, city)`
/// pair wins, and the output is capped at [`MAX_RESULTS`].
pub fn merge_ranked<I>(lists: I) -> Vec<PostalRecord>
where
    I: IntoIterator<Item = Vec<PostalRecord>>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged = Vec::new();

    for record in lists.into_iter().flatten() {
        if !record.is_valid() {
            continue;
        }
        if seen.insert((record.postcode.clone(), record.city.clone())) {
            merged.push(record);
            if merged.len() == MAX_RESULTS {
                break;
            }
        }
    }

    merged
}

/// Offline search over a locally held dataset.
///
/// Case-insensitive substring match on postcode or city, dataset order, first
/// [`MAX_RESULTS`] matches.
pub fn search_local(query: &str, dataset: &[PostalRecord]) -> Vec<PostalRecord> {
    if !is_searchable(query) {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    dataset
        .iter()
        .filter(|item| {
            item.postcode.to_lowercase().contains(&needle)
                || item.city.to_lowercase().contains(&needle)
        })
        .take(MAX_RESULTS)
        .cloned()
        .collect()
}
