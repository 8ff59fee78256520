pub mod builder;
pub mod columns;
pub mod config;
pub mod header;
pub mod image;
pub mod models;
pub mod normalize;
pub mod sheet;
pub mod source;
pub mod store;

pub use config::CatalogConfig;
pub use models::{Catalog, Product};
pub use store::{CatalogStore, RefreshOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no spreadsheet source configured (set EXCEL_URL or EXCEL_PATH)")]
    Configuration,
    #[error("unable to fetch spreadsheet: {0}")]
    SourceFetch(String),
    #[error("unable to read workbook: {0}")]
    Workbook(String),
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),
}
