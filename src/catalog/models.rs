use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

/// Logical catalog fields that are located in the sheet by alias matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Model,
    Image,
    Short,
    Name,
    PackagingType,
    MasterPack,
    CbmPerPiece,
    BulbTech,
    NumBulbs,
    ColorBulb,
    WireColor,
    TotalLengthM,
    PowerSupply,
    LightedLengthM,
    LeadInM,
    LeadOutM,
    EndConnector,
    Functions,
    IncludedAccessories,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Model,
        Field::Image,
        Field::Short,
        Field::Name,
        Field::PackagingType,
        Field::MasterPack,
        Field::CbmPerPiece,
        Field::BulbTech,
        Field::NumBulbs,
        Field::ColorBulb,
        Field::WireColor,
        Field::TotalLengthM,
        Field::PowerSupply,
        Field::LightedLengthM,
        Field::LeadInM,
        Field::LeadOutM,
        Field::EndConnector,
        Field::Functions,
        Field::IncludedAccessories,
    ];

    /// Display label used in the product details view. The image column is
    /// not a descriptive attribute and has none.
    pub fn label(self) -> Option<&'static str> {
        let label = match self {
            Field::Model => "2026 model",
            Field::Image => return None,
            Field::Short => "Short description",
            Field::Name => "Item Description",
            Field::PackagingType => "Packaging type",
            Field::MasterPack => "Master Pack",
            Field::CbmPerPiece => "CBMs x piece",
            Field::BulbTech => "Bulb Tech",
            Field::NumBulbs => "# of Bulbs",
            Field::ColorBulb => "Color Bulb",
            Field::WireColor => "Wire Color",
            Field::TotalLengthM => "Total Length (m)",
            Field::PowerSupply => "Power supply",
            Field::LightedLengthM => "Lighted Length (m)",
            Field::LeadInM => "Lead in (m)",
            Field::LeadOutM => "Lead out (m)",
            Field::EndConnector => "End connector",
            Field::Functions => "Function (#)",
            Field::IncludedAccessories => "Included accessories",
        };
        Some(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerPrices {
    pub fob: Option<f64>,
    pub pvp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub model: String,
    pub name: String,
    pub short: String,
    pub image: String,
    pub packaging_type: String,
    pub master_pack: String,
    pub prices: BTreeMap<String, BuyerPrices>,
    pub details: Vec<Detail>,
    pub raw: BTreeMap<String, String>,
}

impl Product {
    pub fn prices_for(&self, buyer: &str) -> BuyerPrices {
        self.prices.get(buyer).copied().unwrap_or_default()
    }

    fn haystack(&self) -> String {
        format!("{} {} {}", self.model, self.name, self.short).to_lowercase()
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub items: Vec<Product>,
    pub headers: Vec<String>,
    pub header_row: usize,
    pub sheet_name: String,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn find(&self, model: &str) -> Option<&Product> {
        self.items.iter().find(|product| product.model == model)
    }

    /// Case-insensitive search over model, name and short description.
    /// Any matching keyword wins; keywords take priority over `query`.
    pub fn search(&self, query: &str, keywords: &str, limit: usize) -> Vec<&Product> {
        let keywords: Vec<String> = keywords
            .split(',')
            .map(|kw| kw.trim().to_lowercase())
            .filter(|kw| !kw.is_empty())
            .collect();
        let query = query.trim().to_lowercase();

        self.items
            .iter()
            .filter(|product| {
                if !keywords.is_empty() {
                    let text = product.haystack();
                    keywords.iter().any(|kw| text.contains(kw.as_str()))
                } else if !query.is_empty() {
                    product.haystack().contains(&query)
                } else {
                    true
                }
            })
            .take(limit)
            .collect()
    }
}
