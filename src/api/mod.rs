//! HTTP collaborators of the wishlist view.
//!
//! A single [`ApiClient`] talks to three remote services sharing one base URL:
//!
//! - **ProductCatalogService**: `GET /products/{id}`
//! - **WishlistStore**: `GET /wishlist`, `DELETE /wishlist/{id}`, `DELETE /wishlist`
//! - **CartService**: `POST /cart/add`
//!
//! Wishlist and cart calls carry the session's bearer token. Missing tokens are
//! rejected by the caller before any request is built.

mod client;
mod error;
mod types;

pub use client::{ApiClient, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use types::{CartAddRequest, CartProduct, Product, WishlistEntry};
