use serde::{Deserialize, Serialize};

/// One line of a buyer's selection. Either a catalog product referenced by
/// model or a free-standing custom item with a locally stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub model: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub pvp: Option<f64>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub is_custom: bool,
}

impl CartItem {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            note: String::new(),
            short: String::new(),
            price: None,
            pvp: None,
            image: String::new(),
            is_custom: false,
        }
    }

    /// Overwrites every field the patch carries and leaves the rest.
    pub fn apply(&mut self, patch: &CartItemPatch) {
        if let Some(note) = &patch.note {
            self.note = note.clone();
        }
        if let Some(short) = &patch.short {
            self.short = short.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(pvp) = patch.pvp {
            self.pvp = pvp;
        }
        if let Some(image) = &patch.image {
            self.image = image.clone();
        }
        if let Some(is_custom) = patch.is_custom {
            self.is_custom = is_custom;
        }
    }
}

/// Partial item sent by clients. Absent fields keep their stored value;
/// an explicit `null` price clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPatch {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub price: Option<Option<f64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub pvp: Option<Option<f64>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_custom: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomItemRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub note: Option<String>,
    /// `data:image/<type>;base64,<payload>`
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub version: u64,
}
