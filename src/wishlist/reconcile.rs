//! Reconciliation of the stored wishlist against the product catalog.
use super::error::PruneWarning;
use super::item::WishlistItem;
use crate::api::{ApiClient, ApiError, WishlistEntry};
use futures::stream::{self, StreamExt};
use secrecy::SecretString;
use std::collections::HashSet;

/// Default number of catalog lookups in flight during a refresh.
pub const DEFAULT_CATALOG_CONCURRENCY: usize = 8;

/// Outcome of one best-effort prune delete.
#[derive(Debug)]
pub struct PruneOutcome {
    pub product_id: String,
    pub result: Result<(), PruneWarning>,
}

/// What a `refresh()` did.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Items after reconciliation, in store order.
    pub items: Vec<WishlistItem>,
    /// Items whose product is gone from the catalog, with the result of their remote delete.
    pub pruned: Vec<PruneOutcome>,
    /// Items kept as stored because their catalog lookup failed for another reason.
    pub unverified: Vec<String>,
    /// False when the result was discarded (superseded by a newer refresh).
    pub applied: bool,
}

enum Verdict {
    Keep(WishlistItem),
    Unverified(WishlistItem),
    Prune(PruneOutcome),
}

/// Query the catalog for every entry and sort each into keep, keep-unverified or prune.
///
/// Lookups run with bounded concurrency; results keep store order. One entry's
/// catalog failure never affects another entry.
pub(crate) async fn reconcile(
    api: &ApiClient,
    token: &SecretString,
    entries: Vec<WishlistEntry>,
    concurrency: usize,
) -> RefreshReport {
    let entries = dedupe(entries);
    let total = entries.len();

    let verdicts: Vec<Verdict> = stream::iter(entries)
        .map(|entry| reconcile_one(api, token, entry))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = RefreshReport {
        items: Vec::with_capacity(total),
        ..RefreshReport::default()
    };
    for verdict in verdicts {
        match verdict {
            Verdict::Keep(item) => report.items.push(item),
            Verdict::Unverified(item) => {
                report.unverified.push(item.product_id.clone());
                report.items.push(item);
            }
            Verdict::Prune(outcome) => report.pruned.push(outcome),
        }
    }

    tracing::debug!(
        total,
        kept = report.items.len(),
        pruned = report.pruned.len(),
        unverified = report.unverified.len(),
        "Wishlist reconciled against catalog"
    );
    report
}

async fn reconcile_one(api: &ApiClient, token: &SecretString, entry: WishlistEntry) -> Verdict {
    let mut item = WishlistItem::from(entry);
    match api.fetch_product(&item.product_id).await {
        Ok(product) => {
            item.merge_catalog(&product);
            Verdict::Keep(item)
        }
        Err(e) if e.is_missing_product() => {
            tracing::info!(product_id = %item.product_id, reason = %e, "Pruning wishlist item for deleted product");
            let result = prune(api, token, &item.product_id).await;
            Verdict::Prune(PruneOutcome {
                product_id: item.product_id,
                result,
            })
        }
        Err(e) => {
            // Unknown failures keep the stored item; only 404/410 prove deletion
            tracing::warn!(product_id = %item.product_id, error = %e, "Catalog lookup failed, keeping stored item");
            Verdict::Unverified(item)
        }
    }
}

/// Best-effort delete of a stale item from the wishlist store.
pub(crate) async fn prune(
    api: &ApiClient,
    token: &SecretString,
    product_id: &str,
) -> Result<(), PruneWarning> {
    api.remove_from_wishlist(token, product_id)
        .await
        .or_else(|e| match e {
            // Already gone from the store is what we wanted
            ApiError::NotFound | ApiError::Gone => Ok(()),
            other => Err(other),
        })
        .map_err(|source| {
            tracing::warn!(product_id = %product_id, error = %source, "Failed to prune stale wishlist item");
            PruneWarning {
                product_id: product_id.to_string(),
                source,
            }
        })
}

/// Drop entries without a product id and repeated product ids (first one wins).
fn dedupe(entries: Vec<WishlistEntry>) -> Vec<WishlistEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| {
            let id = entry.product_id.trim();
            if id.is_empty() {
                tracing::warn!("Skipping wishlist entry without product id");
                return false;
            }
            if !seen.insert(id.to_string()) {
                tracing::debug!(product_id = %id, "Skipping duplicate wishlist entry");
                return false;
            }
            true
        })
        .collect()
}
