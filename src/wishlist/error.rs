use crate::api::ApiError;
use thiserror::Error;

/// Top-level failure of a controller operation.
///
/// The controller also records a user-facing message in its snapshot; this
/// type carries the detail for logs and callers.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// No token (or no user id, for mutations) in the session. Never retried.
    #[error("Authentication required")]
    AuthenticationMissing,
    /// The item has no usable product id.
    #[error("Invalid product")]
    InvalidProduct,
    /// Add-to-cart found the product deleted from the catalog; the item was pruned.
    #[error("Product {product_id} is no longer available")]
    ProductUnavailable { product_id: String },
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The view was torn down while the operation was in flight.
    #[error("Wishlist view has been disposed")]
    Disposed,
}

/// A best-effort prune delete that the store rejected.
///
/// Pruning still drops the item locally; the warning only records that the
/// remote store may still hold it.
#[derive(Debug, Error)]
#[error("Failed to prune {product_id} from wishlist store: {source}")]
pub struct PruneWarning {
    pub product_id: String,
    #[source]
    pub source: ApiError,
}
