use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

use crate::pricing::SalePricing;

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Always scale 2, within `[1.00, 100000.00]`
    pub price: Decimal,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    /// Reference to the product image, if any
    pub photo: Option<String>,
}

impl Product {
    /// Both bounds must be set; the window is inclusive on both ends.
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        match (self.sale_start, self.sale_end) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }

    pub fn current_price(&self, now: DateTime<Utc>, pricing: &dyn SalePricing) -> Decimal {
        if self.is_on_sale(now) {
            pricing.sale_price(self.price)
        } else {
            self.price
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
        }
    }
}

/// Validated input for inserting a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub photo: Option<String>,
}

impl NewProduct {
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            sale_start: self.sale_start,
            sale_end: self.sale_end,
            photo: self.photo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingCartItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// A cart item as embedded in a serialized product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    /// Product id
    pub product: i64,
    #[schema(minimum = 1, maximum = 100)]
    pub quantity: i32,
}

impl From<ShoppingCartItem> for CartItem {
    fn from(item: ShoppingCartItem) -> Self {
        Self {
            product: item.product_id,
            quantity: item.quantity,
        }
    }
}

/// Body of `POST /{id}/cart-items`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CartItemPayload {
    #[validate(range(min = 1, max = 100, message = "Ensure this value is between 1 and 100."))]
    #[schema(minimum = 1, maximum = 100, example = 2)]
    pub quantity: i32,
}

/// Value written to the cache after a successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// Placeholder time series returned by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductStats {
    #[schema(example = json!({"2019-01-01": [5, 10, 15], "2019-01-02": [20, 1, 1]}))]
    pub stats: BTreeMap<String, Vec<i64>>,
}

impl ProductStats {
    pub fn placeholder() -> Self {
        let stats = BTreeMap::from([
            ("2019-01-01".to_string(), vec![5, 10, 15]),
            ("2019-01-02".to_string(), vec![20, 1, 1]),
        ]);
        Self { stats }
    }
}
