//! Wishlist synchronization and feedback controller.
//!
//! [`WishlistController`] owns the local view of one user's wishlist and keeps
//! it consistent with the remote store and product catalog:
//!
//! - **Reconciliation** ([`WishlistController::refresh`]): reload, merge catalog
//!   data, prune items whose product was deleted
//! - **Mutations**: remove, add-to-cart (with catalog re-validation), two-phase clear
//! - **Feedback**: per-item and whole-list success messages that expire after a
//!   TTL, backed by a per-controller timer registry with one timer per key
//!
//! The presentation layer reads [`WishlistSnapshot`]s and listens on
//! [`WishlistController::subscribe`] for changes.

mod controller;
mod error;
mod feedback;
mod item;
mod reconcile;
mod state;

pub use controller::{ControllerOptions, WishlistController};
pub use error::{PruneWarning, WishlistError};
pub use feedback::{
    FeedbackKey, DEFAULT_FEEDBACK_TTL_MS, MSG_ADDED_TO_CART, MSG_ADD_TO_CART_FAILED,
    MSG_CLEARED, MSG_CLEAR_FAILED, MSG_INVALID_PRODUCT, MSG_LOAD_FAILED, MSG_LOGIN_REQUIRED,
    MSG_PRODUCT_UNAVAILABLE, MSG_REMOVED, MSG_REMOVE_FAILED,
};
pub use item::{WishlistItem, UNKNOWN_PRODUCT_NAME};
pub use reconcile::{PruneOutcome, RefreshReport, DEFAULT_CATALOG_CONCURRENCY};
pub use state::WishlistSnapshot;
