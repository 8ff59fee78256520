use crate::cart::{CartItem, CartItemPatch, CartSnapshot, CustomItemRequest};
use crate::catalog::{Product, RefreshOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BuyerQuery {
    #[serde(default)]
    pub buyer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub u: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartAddRequest {
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub item: CartItemPatch,
}

#[derive(Debug, Deserialize)]
pub struct CartRemoveRequest {
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct CartCustomRequest {
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub item: Option<CustomItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub ok: bool,
    pub items: Vec<CartItem>,
    pub version: u64,
}

impl From<CartSnapshot> for CartResponse {
    fn from(snapshot: CartSnapshot) -> Self {
        Self {
            ok: true,
            items: snapshot.items,
            version: snapshot.version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub ok: bool,
    pub count: usize,
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub ok: bool,
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: RefreshOutcome,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub ok: bool,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub buyers: Vec<String>,
    pub placeholder_image: String,
    pub image_sync: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}
