//! Sea-ORM entities for the `products` and `shopping_cart_items` tables.

pub mod product;
pub mod shopping_cart_item;
