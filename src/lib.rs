//! Storefront wishlist synchronization.
//!
//! Reconciles a server-held wishlist with the product catalog and keeps the
//! transient UI state (loading flag, errors, expiring feedback messages) of a
//! wishlist view.
//!
//! - [`api`]: HTTP client for the catalog, wishlist store and cart endpoints
//! - [`wishlist`]: the controller and its state
//! - [`session`]: bearer token and user identity handed in by the host
//! - [`config`]: optional TOML configuration

pub mod api;
pub mod config;
pub mod session;
pub mod util;
pub mod wishlist;

pub use api::{ApiClient, ApiError};
pub use session::Session;
pub use wishlist::{WishlistController, WishlistError, WishlistSnapshot};
