use super::error::WishlistError;
use super::feedback::{
    FeedbackKey, DEFAULT_FEEDBACK_TTL_MS, MSG_ADDED_TO_CART, MSG_ADD_TO_CART_FAILED, MSG_CLEARED,
    MSG_CLEAR_FAILED, MSG_INVALID_PRODUCT, MSG_LOAD_FAILED, MSG_LOGIN_REQUIRED,
    MSG_PRODUCT_UNAVAILABLE, MSG_REMOVED, MSG_REMOVE_FAILED, TimerSlot,
};
use super::item::WishlistItem;
use super::reconcile::{self, RefreshReport, DEFAULT_CATALOG_CONCURRENCY};
use super::state::{Shared, WishlistSnapshot};
use crate::api::{ApiClient, ApiError};
use crate::session::Session;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Tuning knobs for a [`WishlistController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Lifetime of feedback entries and transient errors.
    pub feedback_ttl: Duration,
    /// Catalog lookups in flight during a refresh.
    pub catalog_concurrency: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            feedback_ttl: Duration::from_millis(DEFAULT_FEEDBACK_TTL_MS),
            catalog_concurrency: DEFAULT_CATALOG_CONCURRENCY,
        }
    }
}

/// Keeps one user's wishlist view in sync with the storefront API.
///
/// All operations take `&self`, so a controller behind an `Arc` can serve
/// overlapping requests. Overlap policy:
///
/// - Last writer wins on the item list, with one exception: items removed
///   while a refresh is in flight stay removed when that refresh lands.
/// - A refresh started later supersedes one started earlier; the older
///   result is discarded.
/// - After [`dispose`](Self::dispose) every response is dropped on arrival and
///   the operation returns [`WishlistError::Disposed`].
pub struct WishlistController {
    api: ApiClient,
    session: Session,
    shared: Arc<Shared>,
    catalog_concurrency: usize,
}

impl WishlistController {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self::with_options(api, session, ControllerOptions::default())
    }

    pub fn with_options(api: ApiClient, session: Session, options: ControllerOptions) -> Self {
        Self {
            api,
            session,
            shared: Shared::new(options.feedback_ttl),
            catalog_concurrency: options.catalog_concurrency.max(1),
        }
    }

    // ------------------------------------------------------------------------
    // Presentation surface
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> WishlistSnapshot {
        self.shared.read(|inner| inner.snapshot())
    }

    /// Revision counter bumped on every state change, for re-render triggers.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }

    pub fn item(&self, product_id: &str) -> Option<WishlistItem> {
        self.shared.read(|inner| {
            inner
                .view
                .items
                .iter()
                .find(|item| item.product_id == product_id)
                .cloned()
        })
    }

    /// Whether an expiry timer is pending for `key`.
    pub fn has_pending_expiry(&self, key: &FeedbackKey) -> bool {
        self.shared
            .read(|inner| inner.timers.is_pending(&TimerSlot::Feedback(key.clone())))
    }

    /// When the feedback entry for `key` expires, if one is showing.
    pub fn feedback_expires_at(&self, key: &FeedbackKey) -> Option<Instant> {
        self.shared
            .read(|inner| inner.view.feedback.get(key).map(|entry| entry.expires_at))
    }

    /// Number of pending expiry timers (feedback entries plus a transient error).
    pub fn pending_expiries(&self) -> usize {
        self.shared.read(|inner| inner.timers.len())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.read(|inner| inner.disposed)
    }

    // ------------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------------

    /// Reload the wishlist from the store and reconcile it against the catalog.
    ///
    /// Items whose product is gone (404/410) are dropped and deleted from the
    /// store on a best-effort basis. Other catalog failures keep the stored
    /// item. Only a failure of the wishlist fetch itself is reported.
    pub async fn refresh(&self) -> Result<RefreshReport, WishlistError> {
        let Some(token) = self.session.token() else {
            tracing::debug!("Refresh skipped: no session token");
            self.shared
                .update_live(|inner| {
                    inner.view.loading = false;
                    inner.set_error(MSG_LOGIN_REQUIRED);
                })
                .ok_or(WishlistError::Disposed)?;
            return Err(WishlistError::AuthenticationMissing);
        };

        let generation = self
            .shared
            .update_live(|inner| {
                inner.refresh_generation += 1;
                inner.tombstones.reset();
                inner.view.loading = true;
                inner.clear_error();
                inner.refresh_generation
            })
            .ok_or(WishlistError::Disposed)?;

        let entries = match self.api.fetch_wishlist(token).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch wishlist");
                self.shared
                    .update_live(|inner| {
                        if inner.refresh_generation == generation {
                            inner.view.loading = false;
                            inner.set_error(MSG_LOAD_FAILED);
                        }
                    })
                    .ok_or(WishlistError::Disposed)?;
                return Err(e.into());
            }
        };

        let mut report =
            reconcile::reconcile(&self.api, token, entries, self.catalog_concurrency).await;

        report.applied = self
            .shared
            .update_live(|inner| {
                if inner.refresh_generation != generation {
                    tracing::debug!(generation, "Discarding superseded refresh result");
                    return false;
                }
                inner.view.items = inner.tombstones.apply(report.items.clone());
                inner.view.loading = false;
                true
            })
            .ok_or(WishlistError::Disposed)?;

        if report.applied {
            tracing::info!(
                items = report.items.len(),
                pruned = report.pruned.len(),
                "Wishlist refreshed"
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Delete one item from the store, then from local state.
    ///
    /// On failure nothing changes locally and a generic message is shown.
    pub async fn remove(&self, product_id: &str) -> Result<(), WishlistError> {
        let Some(credentials) = self.session.credentials() else {
            return self.reject(WishlistError::AuthenticationMissing, MSG_LOGIN_REQUIRED);
        };
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return self.reject(WishlistError::InvalidProduct, MSG_INVALID_PRODUCT);
        }

        match self
            .api
            .remove_from_wishlist(credentials.token, product_id)
            .await
        {
            Ok(()) => {
                self.shared
                    .update_live(|inner| {
                        inner.remove_item(product_id);
                        self.shared.show_feedback(
                            inner,
                            FeedbackKey::product(product_id),
                            MSG_REMOVED,
                        );
                    })
                    .ok_or(WishlistError::Disposed)?;
                tracing::info!(product_id = %product_id, "Removed item from wishlist");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "Failed to remove wishlist item");
                self.shared
                    .update_live(|inner| inner.set_error(MSG_REMOVE_FAILED))
                    .ok_or(WishlistError::Disposed)?;
                Err(e.into())
            }
        }
    }

    /// Move a wishlist item into the cart after re-checking the catalog.
    ///
    /// A product that no longer resolves is pruned from the wishlist instead and
    /// the cart endpoint is never called.
    pub async fn add_to_cart(&self, item: &WishlistItem) -> Result<(), WishlistError> {
        let Some(credentials) = self.session.credentials() else {
            return self.reject(WishlistError::AuthenticationMissing, MSG_LOGIN_REQUIRED);
        };
        let product_id = item.product_id.trim();
        if product_id.is_empty() {
            return self.reject(WishlistError::InvalidProduct, MSG_INVALID_PRODUCT);
        }

        match self.api.fetch_product(product_id).await {
            Ok(_) => {}
            Err(e) if e.is_missing_product() => {
                tracing::info!(product_id = %product_id, reason = %e, "Product vanished before add-to-cart, pruning");
                let pruned = reconcile::prune(&self.api, credentials.token, product_id).await;
                self.shared
                    .update_live(|inner| {
                        inner.remove_item(product_id);
                        self.shared
                            .show_transient_error(inner, MSG_PRODUCT_UNAVAILABLE);
                    })
                    .ok_or(WishlistError::Disposed)?;
                if let Err(warning) = pruned {
                    tracing::debug!(warning = %warning, "Stale item may remain in wishlist store");
                }
                return Err(WishlistError::ProductUnavailable {
                    product_id: product_id.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "Product re-validation failed");
                return self.fail_transient(e, MSG_ADD_TO_CART_FAILED.into());
            }
        }

        if self.is_disposed() {
            return Err(WishlistError::Disposed);
        }

        let request = item.cart_request(credentials.user_id);
        match self.api.add_to_cart(credentials.token, &request).await {
            Ok(()) => {
                self.shared
                    .update_live(|inner| {
                        self.shared.show_feedback(
                            inner,
                            FeedbackKey::product(product_id),
                            MSG_ADDED_TO_CART,
                        );
                    })
                    .ok_or(WishlistError::Disposed)?;
                tracing::info!(product_id = %product_id, quantity = request.product.quantity, "Added wishlist item to cart");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "Add to cart failed");
                let message = e
                    .server_message()
                    .map(|m| Cow::Owned(m.to_string()))
                    .unwrap_or(Cow::Borrowed(MSG_ADD_TO_CART_FAILED));
                self.fail_transient(e, message)
            }
        }
    }

    /// Open the clear-wishlist confirmation prompt. No side effects.
    pub fn request_clear(&self) {
        self.shared
            .update_live(|inner| inner.view.confirming_clear = true);
    }

    /// Close the confirmation prompt without clearing.
    pub fn cancel_clear(&self) {
        self.shared
            .update_live(|inner| inner.view.confirming_clear = false);
    }

    /// Delete every wishlist entry. The prompt closes whatever the outcome.
    pub async fn confirm_clear(&self) -> Result<(), WishlistError> {
        let Some(credentials) = self.session.credentials() else {
            self.shared
                .update_live(|inner| inner.view.confirming_clear = false);
            return self.reject(WishlistError::AuthenticationMissing, MSG_LOGIN_REQUIRED);
        };

        let result = self.api.clear_wishlist(credentials.token).await;
        self.shared
            .update_live(|inner| {
                inner.view.confirming_clear = false;
                match &result {
                    Ok(()) => {
                        inner.view.items.clear();
                        inner.tombstones.bury_all();
                        self.shared
                            .show_feedback(inner, FeedbackKey::Clear, MSG_CLEARED);
                    }
                    Err(_) => inner.set_error(MSG_CLEAR_FAILED),
                }
            })
            .ok_or(WishlistError::Disposed)?;

        match result {
            Ok(()) => {
                tracing::info!("Wishlist cleared");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear wishlist");
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Feedback lifecycle
    // ------------------------------------------------------------------------

    /// User dismissal of a feedback entry. Returns true if one was showing.
    pub fn dismiss_feedback(&self, key: &FeedbackKey) -> bool {
        self.shared.dismiss_feedback(key)
    }

    pub fn dismiss_error(&self) {
        self.shared.update_live(|inner| inner.clear_error());
    }

    /// Tear down the view: cancel every pending timer and drop local state.
    ///
    /// In-flight requests are not cancelled; their responses are discarded.
    pub fn dispose(&self) {
        let cancelled = self.shared.dispose();
        tracing::debug!(cancelled_timers = cancelled, "Wishlist view disposed");
    }

    /// Show a transient message for a precondition failure and return `err`.
    fn reject(&self, err: WishlistError, message: &'static str) -> Result<(), WishlistError> {
        tracing::debug!(error = %err, "Wishlist operation rejected");
        self.shared
            .update_live(|inner| self.shared.show_transient_error(inner, message))
            .ok_or(WishlistError::Disposed)?;
        Err(err)
    }

    fn fail_transient(
        &self,
        err: ApiError,
        message: Cow<'static, str>,
    ) -> Result<(), WishlistError> {
        self.shared
            .update_live(|inner| self.shared.show_transient_error(inner, message))
            .ok_or(WishlistError::Disposed)?;
        Err(err.into())
    }
}

/// Timers must not outlive the view.
impl Drop for WishlistController {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl std::fmt::Debug for WishlistController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistController")
            .field("base_url", &self.api.base_url().as_str())
            .field("session", &self.session)
            .field("catalog_concurrency", &self.catalog_concurrency)
            .finish()
    }
}
