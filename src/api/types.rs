use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Wishlist Store
// ============================================================================

/// Raw wishlist entry as stored server-side.
///
/// Only `productId` is required; everything else is display data that the
/// catalog may later override. Prices and quantity also accept numeric
/// strings, and a value that still does not fit reads as absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mrp: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<u32>,
}

/// `GET /wishlist` body: either a bare array or an object wrapping one.
///
/// Entries stay raw JSON until [`into_entries`](Self::into_entries) so one
/// malformed entry cannot fail the whole listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WishlistPayload {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(alias = "wishlist")]
        items: Vec<Value>,
    },
}

impl WishlistPayload {
    /// Decode each entry on its own, skipping the ones that do not parse.
    pub(crate) fn into_entries(self) -> Vec<WishlistEntry> {
        let raw = match self {
            WishlistPayload::Bare(entries) | WishlistPayload::Wrapped { items: entries } => entries,
        };
        raw.into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed wishlist entry");
                    None
                }
            })
            .collect()
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => parse_timestamp(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// RFC 3339, or a naive ISO 8601 datetime taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
        })
        .ok()
}

// ============================================================================
// Product Catalog
// ============================================================================

/// Current catalog record for a product.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub discounted_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mrp: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Product {
    /// The price a customer pays now: discounted price when set, else list price.
    pub fn effective_price(&self) -> Option<f64> {
        self.discounted_price.or(self.price)
    }
}

/// `GET /products/{id}` body: bare record or `{"product": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductPayload {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductPayload {
    pub(crate) fn into_product(self) -> Product {
        match self {
            ProductPayload::Wrapped { product } | ProductPayload::Bare(product) => product,
        }
    }
}

// ============================================================================
// Cart
// ============================================================================

/// `POST /cart/add` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest {
    pub user_id: String,
    pub product: CartProduct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub mrp: f64,
    pub discounted_price: f64,
    pub quantity: u32,
}

/// Error body shape shared by the storefront endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wishlist_payload_bare_array() {
        let json = r#"[{"productId":"p1","price":10,"addedAt":"2024-01-01T00:00:00Z"}]"#;
        let entries = serde_json::from_str::<WishlistPayload>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_id, "p1");
        assert_eq!(entries[0].price, Some(10.0));
        assert!(entries[0].added_at.is_some());
    }

    #[test]
    fn test_wishlist_payload_wrapped() {
        let json = r#"{"wishlist":[{"productId":"p1"},{"productId":"p2","image":"i2"}]}"#;
        let entries = serde_json::from_str::<WishlistPayload>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].image.as_deref(), Some("i2"));
    }

    #[test]
    fn test_malformed_entry_is_skipped_alone() {
        let json = r#"[
            {"productId":"p1","addedAt":"2024-03-01T10:00:00Z"},
            {"name":"no id"},
            {"productId":"p3","name":42}
        ]"#;
        let entries = serde_json::from_str::<WishlistPayload>(json)
            .unwrap()
            .into_entries();
        let ids: Vec<&str> = entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_loose_field_formats_degrade_instead_of_failing() {
        let json = r#"[
            {"productId":"p1","price":"10","mrp":"n/a","quantity":"2","addedAt":"2024-03-01T10:00:00.123456"},
            {"productId":"p2","price":true,"quantity":-1,"addedAt":"yesterday"}
        ]"#;
        let entries = serde_json::from_str::<WishlistPayload>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].price, Some(10.0));
        assert_eq!(entries[0].mrp, None);
        assert_eq!(entries[0].quantity, Some(2));
        assert_eq!(
            entries[0].added_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:00:00.123456+00:00".to_string())
        );

        assert_eq!(entries[1].price, None);
        assert_eq!(entries[1].quantity, None);
        assert_eq!(entries[1].added_at, None);
    }

    #[test]
    fn test_product_string_prices() {
        let product = serde_json::from_str::<ProductPayload>(r#"{"price":"15","discountedPrice":"12.5"}"#)
            .unwrap()
            .into_product();
        assert_eq!(product.effective_price(), Some(12.5));
    }

    #[test]
    fn test_product_payload_wrapped_and_bare() {
        let wrapped = r#"{"product":{"discountedPrice":12,"image":"img1"}}"#;
        let product = serde_json::from_str::<ProductPayload>(wrapped)
            .unwrap()
            .into_product();
        assert_eq!(product.effective_price(), Some(12.0));
        assert_eq!(product.image.as_deref(), Some("img1"));

        let bare = r#"{"price":9.5,"name":"Lamp"}"#;
        let product = serde_json::from_str::<ProductPayload>(bare)
            .unwrap()
            .into_product();
        assert_eq!(product.effective_price(), Some(9.5));
        assert_eq!(product.name.as_deref(), Some("Lamp"));
    }

    #[test]
    fn test_cart_request_wire_format() {
        let request = CartAddRequest {
            user_id: "u1".to_string(),
            product: CartProduct {
                product_id: "p1".to_string(),
                name: "Lamp".to_string(),
                image: None,
                mrp: 20.0,
                discounted_price: 15.0,
                quantity: 1,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["product"]["productId"], "p1");
        assert_eq!(value["product"]["discountedPrice"], 15.0);
        assert_eq!(value["product"]["quantity"], 1);
    }
}
