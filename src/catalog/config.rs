use crate::catalog::models::Field;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    env,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PLACEHOLDER_IMAGE: &str =
    "https://dummyimage.com/800x800/e2e8f0/94a3b8&text=Sin+imagen";

const DEFAULT_BUYER_PRICE_NAMES: &[(&str, &[&str])] = &[
    ("SORIANA", &["Soriana"]),
    ("CHEDRAUI", &["Chedraui"]),
    ("HEB", &["HEB"]),
    ("LA COMER", &["La comer", "La Comer"]),
    ("LIVERPOOL", &["Liverpool"]),
    ("SEARS", &["Sears"]),
    ("3B", &["3B"]),
    ("CLUBES", &["Clubes"]),
    ("DSW", &["DSW"]),
    ("CALIMAX", &["Calimax"]),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read alias file {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid alias file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Where the catalog workbook comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetSource {
    Url(String),
    Path(PathBuf),
}

/// How catalog image URLs are derived from a product model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    /// Base URL with a `{model}` placeholder.
    pub template: String,
    /// Cache-busting version appended as `?v=`.
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyerAliases {
    #[serde(default)]
    pub fob: Vec<String>,
    #[serde(default)]
    pub pvp: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ColumnAliases {
    by_field: HashMap<Field, Vec<String>>,
}

impl ColumnAliases {
    pub fn for_field(&self, field: Field) -> &[String] {
        self.by_field
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set(&mut self, field: Field, aliases: Vec<String>) {
        self.by_field.insert(field, aliases);
    }
}

impl Default for ColumnAliases {
    fn default() -> Self {
        let by_field = Field::ALL
            .iter()
            .map(|field| (*field, split_list(default_aliases(*field))))
            .collect();
        Self { by_field }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub source: Option<SpreadsheetSource>,
    pub sheet_name: Option<String>,
    pub header_row: Option<usize>,
    pub columns: ColumnAliases,
    pub buyer_prices: BTreeMap<String, BuyerAliases>,
    /// When set, every buyer reads this buyer's price columns.
    pub price_source_buyer: Option<String>,
    pub cdn: Option<CdnConfig>,
    pub placeholder_image: String,
    pub image_version: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: None,
            sheet_name: None,
            header_row: None,
            columns: ColumnAliases::default(),
            buyer_prices: default_buyer_prices(),
            price_source_buyer: None,
            cdn: None,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            image_version: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AliasFile {
    #[serde(default)]
    columns: HashMap<Field, Vec<String>>,
    #[serde(default)]
    buyers: BTreeMap<String, BuyerAliases>,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            source: source_from_env(),
            sheet_name: non_empty_env("SHEET_NAME"),
            header_row: env::var("HEADER_ROW")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0),
            price_source_buyer: non_empty_env("PRICE_SOURCE_BUYER"),
            image_version: non_empty_env("IMG_VER"),
            placeholder_image: non_empty_env("PLACEHOLDER_IMAGE_URL")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_IMAGE.to_string()),
            ..Self::default()
        };
        config.cdn = cdn_from_env(config.image_version.clone());

        for field in Field::ALL {
            if let Some(raw) = non_empty_env(env_key(field)) {
                let aliases = split_list(&raw);
                if !aliases.is_empty() {
                    config.columns.set(field, aliases);
                }
            }
        }

        if let Some(path) = non_empty_env("CATALOG_ALIASES_FILE") {
            config.apply_alias_file(Path::new(&path))?;
        }

        Ok(config)
    }

    /// Overlays a YAML alias file: listed fields replace their defaults and a
    /// non-empty `buyers` table replaces the built-in buyer price map.
    pub fn apply_alias_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        self.apply_alias_yaml(&raw).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        info!(
            target = "showroom.catalog",
            path = %path.display(),
            buyers = self.buyer_prices.len(),
            "column aliases loaded from file"
        );
        Ok(())
    }

    fn apply_alias_yaml(&mut self, raw: &str) -> Result<(), String> {
        let file: AliasFile = serde_yaml::from_str(raw).map_err(|err| err.to_string())?;
        for (field, aliases) in file.columns {
            if aliases.is_empty() {
                warn!(target = "showroom.catalog", ?field, "ignoring empty alias list");
                continue;
            }
            self.columns.set(field, aliases);
        }
        if !file.buyers.is_empty() {
            self.buyer_prices = file.buyers;
        }
        Ok(())
    }
}

pub fn default_buyer_prices() -> BTreeMap<String, BuyerAliases> {
    DEFAULT_BUYER_PRICE_NAMES
        .iter()
        .map(|(buyer, spellings)| {
            // Some masters carry a doubled space before the currency tag.
            let fob = spellings
                .iter()
                .flat_map(|name| {
                    [
                        format!("Precio FOB {name} ($USD)"),
                        format!("Precio FOB {name}  ($USD)"),
                    ]
                })
                .collect();
            let pvp = spellings
                .iter()
                .flat_map(|name| {
                    [
                        format!("PVP {name} Estimado ($MXN)"),
                        format!("PVP {name}  Estimado ($MXN)"),
                    ]
                })
                .collect();
            (buyer.to_string(), BuyerAliases { fob, pvp })
        })
        .collect()
}

fn default_aliases(field: Field) -> &'static str {
    match field {
        Field::Model => "2026 Model,2026 model,Model,Item #,Item,Modelo,#Item,Item#",
        Field::Image => "Picture,Extra Pictures,image_url,picture,Imagen,Image",
        Field::Short => "Short description,Descripción genérica,Descripcion generica,Short",
        Field::Name => {
            "Item Description,Description of Goods,Descripción de Goods,Descripcion de Goods"
        }
        Field::PackagingType => "Packaging type,Packaging",
        Field::MasterPack => "Master Pack,Master pack",
        Field::CbmPerPiece => "CBMs x piece,CBM x piece,CBM/piece",
        Field::BulbTech => "Bulb Tech",
        Field::NumBulbs => "# of Bulbs,Number of Bulbs",
        Field::ColorBulb => "Color Bulb",
        Field::WireColor => "Wire Color",
        Field::TotalLengthM => "Total Length (m),Total Lenght (m)",
        Field::PowerSupply => "Power supply",
        Field::LightedLengthM => "Lighted Length (m),Lighted Lenght (m)",
        Field::LeadInM => "Lead in (m)",
        Field::LeadOutM => "Lead out (m)",
        Field::EndConnector => "End connector",
        Field::Functions => "Function (#),# of Functions,Functions",
        Field::IncludedAccessories => "Included accessories,Included accesories,Accessories",
    }
}

fn env_key(field: Field) -> &'static str {
    match field {
        Field::Model => "COL_MODEL",
        Field::Image => "COL_IMAGE",
        Field::Short => "COL_SHORT",
        Field::Name => "COL_NAME",
        Field::PackagingType => "COL_PACKAGING_TYPE",
        Field::MasterPack => "COL_MASTER_PACK",
        Field::CbmPerPiece => "COL_CBM_PER_PIECE",
        Field::BulbTech => "COL_BULB_TECH",
        Field::NumBulbs => "COL_NUM_BULBS",
        Field::ColorBulb => "COL_COLOR_BULB",
        Field::WireColor => "COL_WIRE_COLOR",
        Field::TotalLengthM => "COL_TOTAL_LENGTH_M",
        Field::PowerSupply => "COL_POWER_SUPPLY",
        Field::LightedLengthM => "COL_LIGHTED_LENGTH_M",
        Field::LeadInM => "COL_LEAD_IN_M",
        Field::LeadOutM => "COL_LEAD_OUT_M",
        Field::EndConnector => "COL_END_CONNECTOR",
        Field::Functions => "COL_FUNCTIONS",
        Field::IncludedAccessories => "COL_INCLUDED_ACCESSORIES",
    }
}

fn source_from_env() -> Option<SpreadsheetSource> {
    if let Some(url) = non_empty_env("EXCEL_URL") {
        return Some(SpreadsheetSource::Url(url));
    }
    non_empty_env("EXCEL_PATH").map(|path| SpreadsheetSource::Path(PathBuf::from(path)))
}

fn cdn_from_env(version: Option<String>) -> Option<CdnConfig> {
    if let Some(template) = non_empty_env("IMAGE_CDN_TEMPLATE") {
        return Some(CdnConfig { template, version });
    }
    let cloud = non_empty_env("CLOUDINARY_CLOUD_NAME")?;
    let folder =
        non_empty_env("CLOUDINARY_FOLDER").unwrap_or_else(|| "showroom_2025".to_string());
    Some(CdnConfig {
        template: format!(
            "https://res.cloudinary.com/{cloud}/image/upload/f_auto,q_auto/{folder}/{{model}}"
        ),
        version,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
