pub mod custom;
pub mod models;
pub mod store;

pub use models::{CartItem, CartItemPatch, CartSnapshot, CustomItemRequest};
pub use store::CartStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("buyer is required")]
    MissingBuyer,
    #[error("item model is required")]
    MissingModel,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("cart storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Trims a buyer key and rejects blanks.
pub fn buyer_key(raw: &str) -> Result<String, CartError> {
    let buyer = raw.trim();
    if buyer.is_empty() {
        return Err(CartError::MissingBuyer);
    }
    Ok(buyer.to_string())
}
