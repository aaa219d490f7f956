use crate::api::{CartAddRequest, CartProduct, Product, WishlistEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name sent to the cart when neither the store nor the catalog knows one.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

/// A wishlist row as the view renders it.
///
/// Starts from the stored [`WishlistEntry`] and is overlaid with catalog data
/// during reconciliation. `added_at` is never touched after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WishlistItem {
    pub product_id: String,
    /// Current selling price (catalog discounted price, else catalog price, else stored).
    pub price: Option<f64>,
    /// List price before discount.
    pub mrp: Option<f64>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub added_at: Option<DateTime<Utc>>,
    pub quantity: Option<u32>,
}

impl From<WishlistEntry> for WishlistItem {
    fn from(entry: WishlistEntry) -> Self {
        Self {
            product_id: entry.product_id.trim().to_string(),
            price: entry.price,
            mrp: entry.mrp,
            image: non_blank(entry.image),
            name: non_blank(entry.name),
            description: non_blank(entry.description),
            category: non_blank(entry.category),
            added_at: entry.added_at,
            quantity: entry.quantity,
        }
    }
}

impl WishlistItem {
    /// Overlay catalog values; the catalog wins wherever it has a value.
    pub fn merge_catalog(&mut self, product: &Product) {
        if let Some(price) = product.effective_price() {
            self.price = Some(price);
        }
        if let Some(mrp) = product.mrp.or(product.price) {
            self.mrp = Some(mrp);
        }
        overlay(&mut self.image, &product.image);
        overlay(&mut self.name, &product.name);
        overlay(&mut self.description, &product.description);
        overlay(&mut self.category, &product.category);
    }

    /// List price for the cart: mrp, else price, else 0.
    pub fn list_price(&self) -> f64 {
        self.mrp.or(self.price).unwrap_or(0.0)
    }

    /// Discounted price for the cart: price, else mrp, else 0.
    pub fn sale_price(&self) -> f64 {
        self.price.or(self.mrp).unwrap_or(0.0)
    }

    pub(crate) fn cart_request(&self, user_id: &str) -> CartAddRequest {
        CartAddRequest {
            user_id: user_id.to_string(),
            product: CartProduct {
                product_id: self.product_id.trim().to_string(),
                name: self
                    .name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
                image: self.image.clone(),
                mrp: self.list_price(),
                discounted_price: self.sale_price(),
                quantity: self.quantity.filter(|q| *q > 0).unwrap_or(1),
            },
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn overlay(field: &mut Option<String>, catalog: &Option<String>) {
    if let Some(value) = catalog.as_ref().filter(|v| !v.trim().is_empty()) {
        *field = Some(value.clone());
    }
}
