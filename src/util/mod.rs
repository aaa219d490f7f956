//! Utility functions shared by the API client and configuration layer.
//!
//! - **Base URL validation**: HTTPS enforcement for the storefront API (loopback excepted)
//! - **Path joining**: percent-encoded path segments for opaque product ids
//!
//! # Examples
//!
//! ```
//! use storefront_wishlist::util::{join_segments, validate_base_url};
//!
//! let base = validate_base_url("https://shop.example.com/api").unwrap();
//! let url = join_segments(&base, &["products", "sku-42"]);
//! assert_eq!(url.as_str(), "https://shop.example.com/api/products/sku-42");
//! ```

mod base_url;

pub use base_url::{join_segments, validate_base_url, BaseUrlError};
