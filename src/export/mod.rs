//! Cart exports: a spreadsheet and a printable PDF of a buyer's selection.
//!
//! Both documents show each item with the same image the UI shows, fetched
//! server-side and embedded. An image that cannot be fetched or decoded
//! leaves its cell empty rather than failing the export.

pub mod excel;
pub mod media;
pub mod pdf;

use crate::cart::CartItem;
use crate::catalog::{Catalog, image::with_version};
use chrono::NaiveDate;
use media::{ImageFetcher, Picture};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("buyer is required")]
    MissingBuyer,
    #[error("cart is empty")]
    EmptyCart,
    #[error("unable to render document: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// One line of an exported selection with everything resolved.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub model: String,
    pub description: String,
    pub note: String,
    pub image_url: String,
    pub is_custom: bool,
    pub picture: Option<Picture>,
}

pub fn attachment_name(buyer: &str, format: ExportFormat) -> String {
    format!("seleccion-{buyer}.{}", format.extension())
}

/// The URL the UI displays for a cart item: the item's own image, else the
/// catalog product's, with the image version appended to absolute URLs.
pub fn ui_image_url(item: &CartItem, catalog: &Catalog, version: Option<&str>) -> String {
    let url = if item.image.trim().is_empty() {
        catalog
            .find(&item.model)
            .map(|product| product.image.as_str())
            .unwrap_or_default()
    } else {
        item.image.as_str()
    };
    if url.is_empty() {
        return String::new();
    }
    with_version(url, version)
}

fn description(item: &CartItem, catalog: &Catalog) -> String {
    if item.is_custom {
        return item.note.clone();
    }
    if !item.short.trim().is_empty() {
        return item.short.clone();
    }
    catalog
        .find(&item.model)
        .map(|product| {
            if product.short.is_empty() {
                product.name.clone()
            } else {
                product.short.clone()
            }
        })
        .unwrap_or_default()
}

/// Builds export rows without pictures. Catalog items come first, custom
/// items after, each group in cart order.
pub fn plan_rows(items: &[CartItem], catalog: &Catalog, version: Option<&str>) -> Vec<ExportRow> {
    let (regular, custom): (Vec<&CartItem>, Vec<&CartItem>) =
        items.iter().partition(|item| !item.is_custom);
    regular
        .into_iter()
        .chain(custom)
        .map(|item| ExportRow {
            model: item.model.clone(),
            description: description(item, catalog),
            note: item.note.clone(),
            image_url: ui_image_url(item, catalog, version),
            is_custom: item.is_custom,
            picture: None,
        })
        .collect()
}

/// Renders cart exports. Holds what every export needs besides the cart.
#[derive(Clone)]
pub struct Exporter {
    fetcher: ImageFetcher,
    image_version: Option<String>,
    title: String,
}

impl Exporter {
    pub fn new(fetcher: ImageFetcher, image_version: Option<String>, title: String) -> Self {
        Self {
            fetcher,
            image_version,
            title,
        }
    }

    pub async fn render(
        &self,
        format: ExportFormat,
        buyer: &str,
        items: &[CartItem],
        catalog: &Catalog,
    ) -> Result<Vec<u8>, ExportError> {
        let buyer = buyer.trim().to_string();
        if buyer.is_empty() {
            return Err(ExportError::MissingBuyer);
        }
        if items.is_empty() {
            return Err(ExportError::EmptyCart);
        }

        let started = Instant::now();
        let mut rows = plan_rows(items, catalog, self.image_version.as_deref());
        for row in rows.iter_mut() {
            row.picture = self.fetcher.fetch(&row.image_url).await;
        }
        let embedded = rows.iter().filter(|row| row.picture.is_some()).count();

        let title = self.title.clone();
        let buyer_for_doc = buyer.clone();
        let rows_total = rows.len();
        let bytes = tokio::task::spawn_blocking(move || match format {
            ExportFormat::Excel => excel::render(&rows),
            ExportFormat::Pdf => pdf::render(&title, &buyer_for_doc, today(), &rows),
        })
        .await
        .map_err(|err| ExportError::Render(format!("render task failed: {err}")))??;

        info!(
            target = "showroom.export",
            buyer = %buyer,
            format = format.extension(),
            rows = rows_total,
            images = embedded,
            bytes = bytes.len(),
            "cart exported"
        );
        crate::metrics::export_rendered(format.extension(), started.elapsed().as_millis());
        Ok(bytes)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
