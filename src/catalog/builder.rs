use crate::catalog::CatalogError;
use crate::catalog::columns::{
    BuyerColumns, BuyerPriceColumnMap, ColumnIndexMap, cell_at, resolve_buyer_price_columns,
};
use crate::catalog::config::CatalogConfig;
use crate::catalog::header::detect_header_row;
use crate::catalog::image::resolve_image;
use crate::catalog::models::{BuyerPrices, Catalog, Detail, Field, Product};
use crate::catalog::normalize::{parse_number, round_two};
use crate::catalog::sheet::{RawSheet, Workbook};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Parses workbook bytes into a fresh catalog.
pub fn build(bytes: Vec<u8>, config: &CatalogConfig) -> Result<Catalog, CatalogError> {
    let mut workbook = Workbook::open(bytes)?;
    let sheet = workbook.read_sheet(config.sheet_name.as_deref())?;
    Ok(build_from_sheet(&sheet, config))
}

pub fn build_from_sheet(sheet: &RawSheet, config: &CatalogConfig) -> Catalog {
    let header_row = detect_header_row(&sheet.rows, config.header_row);
    let headers: Vec<String> = sheet
        .rows
        .get(header_row - 1)
        .map(|row| row.iter().map(|cell| cell.trim().to_string()).collect())
        .unwrap_or_default();

    let columns = ColumnIndexMap::resolve(&headers, &config.columns);
    let buyer_columns = price_columns(&headers, config);
    if columns.get(Field::Model).is_none() {
        warn!(
            target = "showroom.catalog",
            sheet = %sheet.name,
            header_row,
            "no model column found; catalog will be empty"
        );
    }
    let missing = columns.missing();
    if !missing.is_empty() {
        debug!(target = "showroom.catalog", ?missing, "unresolved catalog columns");
    }

    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    let mut items = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate().skip(header_row) {
        let numbers = sheet.numbers.get(idx).map(Vec::as_slice).unwrap_or_default();
        let Some(product) = build_product(row, numbers, &headers, &columns, &buyer_columns, config)
        else {
            continue;
        };
        if !seen.insert(product.model.clone()) {
            duplicates += 1;
            continue;
        }
        items.push(product);
    }

    info!(
        target = "showroom.catalog",
        sheet = %sheet.name,
        header_row,
        items = items.len(),
        duplicates,
        "catalog built"
    );

    Catalog {
        items,
        headers,
        header_row,
        sheet_name: sheet.name.clone(),
        loaded_at: Some(Utc::now()),
    }
}

/// Resolves each buyer's FOB/PVP columns. With a price source buyer
/// configured, every buyer reads that buyer's columns instead.
fn price_columns(headers: &[String], config: &CatalogConfig) -> BuyerPriceColumnMap {
    let resolved = resolve_buyer_price_columns(headers, &config.buyer_prices);
    let Some(source) = config.price_source_buyer.as_deref() else {
        return resolved;
    };
    let Some(forced) = resolved.get(source).copied() else {
        warn!(
            target = "showroom.catalog",
            buyer = source,
            "price source buyer has no alias entry; using per-buyer prices"
        );
        return resolved;
    };
    resolved
        .keys()
        .map(|buyer| (buyer.clone(), forced))
        .collect()
}

fn build_product(
    row: &[String],
    numbers: &[Option<f64>],
    headers: &[String],
    columns: &ColumnIndexMap,
    buyer_columns: &BuyerPriceColumnMap,
    config: &CatalogConfig,
) -> Option<Product> {
    let model = columns.cell(row, Field::Model);
    if model.is_empty() {
        return None;
    }

    let name = columns.cell(row, Field::Name).to_string();
    let short = match columns.cell(row, Field::Short) {
        "" => name.clone(),
        value => value.to_string(),
    };
    let image = resolve_image(model, columns.cell(row, Field::Image), config);

    let prices = buyer_columns
        .iter()
        .map(|(buyer, cols)| (buyer.clone(), read_prices(row, numbers, *cols)))
        .collect();

    let details = Field::ALL
        .iter()
        .filter_map(|field| {
            field.label().map(|label| Detail {
                label: label.to_string(),
                value: columns.cell(row, *field).to_string(),
            })
        })
        .collect();

    Some(Product {
        model: model.to_string(),
        name,
        short,
        image,
        packaging_type: columns.cell(row, Field::PackagingType).to_string(),
        master_pack: columns.cell(row, Field::MasterPack).to_string(),
        prices,
        details,
        raw: raw_row(headers, row),
    })
}

/// Numeric cells are taken as typed; only text cells go through
/// `parse_number` and its separator heuristics.
fn read_prices(row: &[String], numbers: &[Option<f64>], cols: BuyerColumns) -> BuyerPrices {
    let read = |idx: Option<usize>| {
        idx.and_then(|i| numbers.get(i).copied().flatten())
            .or_else(|| parse_number(cell_at(row, idx)))
            .map(round_two)
    };
    BuyerPrices {
        fob: read(cols.fob),
        pvp: read(cols.pvp),
    }
}

/// Header to cell map; blank headers are skipped and repeated headers keep
/// their first column.
fn raw_row(headers: &[String], row: &[String]) -> BTreeMap<String, String> {
    let mut raw = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        raw.entry(header.clone())
            .or_insert_with(|| row.get(idx).cloned().unwrap_or_default());
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::config::CdnConfig;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sheet(rows: Vec<Vec<String>>) -> RawSheet {
        RawSheet {
            name: "Master FOB".into(),
            rows,
            numbers: Vec::new(),
        }
    }

    fn header() -> Vec<String> {
        row(&[
            "Item #",
            "Short",
            "Precio FOB Soriana ($USD)",
            "PVP Soriana Estimado ($MXN)",
        ])
    }

    fn workbook_bytes(rows: &[(u32, Vec<String>)]) -> Vec<u8> {
        let mut book = XlsxWorkbook::new();
        let ws = book.add_worksheet();
        ws.set_name("S26 Master FOB").expect("name");
        for (r, cells) in rows {
            for (c, value) in cells.iter().enumerate() {
                ws.write_string(*r, c as u16, value).expect("write");
            }
        }
        book.save_to_buffer().expect("save")
    }

    #[test]
    fn builds_products_from_header_at_row_eight() {
        let bytes = workbook_bytes(&[
            (0, row(&["Lumina Showroom 2026"])),
            (7, header()),
            (8, row(&["SKU-1", "Nice lamp", "12.50", "750.00"])),
        ]);
        let catalog = build(bytes, &CatalogConfig::default()).expect("catalog");
        assert_eq!(catalog.header_row, 8);
        assert_eq!(catalog.sheet_name, "S26 Master FOB");
        assert_eq!(catalog.items.len(), 1);

        let product = &catalog.items[0];
        assert_eq!(product.model, "SKU-1");
        assert_eq!(product.short, "Nice lamp");
        assert_eq!(
            product.prices_for("SORIANA"),
            BuyerPrices {
                fob: Some(12.5),
                pvp: Some(750.0)
            }
        );
        assert_eq!(product.prices_for("HEB"), BuyerPrices::default());
        assert_eq!(product.image, CatalogConfig::default().placeholder_image);
    }

    #[test]
    fn numeric_price_cells_keep_their_typed_value() {
        let mut book = XlsxWorkbook::new();
        let ws = book.add_worksheet();
        ws.set_name("Master FOB").expect("name");
        for (c, title) in header().iter().enumerate() {
            ws.write_string(0, c as u16, title).expect("write");
        }
        ws.write_string(1, 0, "SKU-9").expect("write");
        ws.write_string(1, 1, "Numeric").expect("write");
        ws.write_number(1, 2, 2.375).expect("write");
        ws.write_number(1, 3, 1234.0).expect("write");
        let bytes = book.save_to_buffer().expect("save");

        let catalog = build(bytes, &CatalogConfig::default()).expect("catalog");
        let prices = catalog.items[0].prices_for("SORIANA");
        assert_eq!(prices.fob, Some(2.38));
        assert_eq!(prices.pvp, Some(1234.0));
        assert_eq!(catalog.items[0].raw["Precio FOB Soriana ($USD)"], "2.375");
    }

    #[test]
    fn rows_without_model_are_skipped() {
        let raw = sheet(vec![
            header(),
            row(&["", "orphan", "1", "2"]),
            row(&["SKU-2", "kept", "", ""]),
            row(&[]),
        ]);
        let catalog = build_from_sheet(&raw, &CatalogConfig::default());
        let models: Vec<&str> = catalog.items.iter().map(|p| p.model.as_str()).collect();
        assert_eq!(models, vec!["SKU-2"]);
    }

    #[test]
    fn unparseable_prices_are_null_and_rounded_otherwise() {
        let raw = sheet(vec![header(), row(&["SKU-3", "x", "n/a", "$1,234.567"])]);
        let catalog = build_from_sheet(&raw, &CatalogConfig::default());
        let prices = catalog.items[0].prices_for("SORIANA");
        assert_eq!(prices.fob, None);
        assert_eq!(prices.pvp, Some(1234567.0));

        let raw = sheet(vec![header(), row(&["SKU-4", "x", "3.14159", "1,5"])]);
        let prices = build_from_sheet(&raw, &CatalogConfig::default()).items[0].prices_for("SORIANA");
        assert_eq!(prices.fob, Some(3.14));
        assert_eq!(prices.pvp, Some(1.5));
    }

    #[test]
    fn header_override_is_honoured() {
        let raw = sheet(vec![
            row(&["Model", "Picture", "Description", "Price"]),
            header(),
            row(&["SKU-5", "desc", "1", "2"]),
        ]);
        let config = CatalogConfig {
            header_row: Some(2),
            ..CatalogConfig::default()
        };
        let catalog = build_from_sheet(&raw, &config);
        assert_eq!(catalog.header_row, 2);
        assert_eq!(catalog.items.len(), 1);
        assert_eq!(catalog.items[0].model, "SKU-5");
    }

    #[test]
    fn forced_price_source_applies_to_every_buyer() {
        let raw = sheet(vec![
            row(&[
                "Item #",
                "Precio FOB Soriana ($USD)",
                "PVP Soriana Estimado ($MXN)",
                "Precio FOB HEB ($USD)",
            ]),
            row(&["SKU-6", "10", "100", "99"]),
        ]);
        let per_buyer = build_from_sheet(&raw, &CatalogConfig::default());
        assert_eq!(per_buyer.items[0].prices_for("HEB").fob, Some(99.0));

        let config = CatalogConfig {
            price_source_buyer: Some("SORIANA".into()),
            ..CatalogConfig::default()
        };
        let forced = build_from_sheet(&raw, &config);
        assert_eq!(
            forced.items[0].prices_for("HEB"),
            BuyerPrices {
                fob: Some(10.0),
                pvp: Some(100.0)
            }
        );
    }

    #[test]
    fn details_raw_and_image_are_populated() {
        let raw = sheet(vec![
            row(&["Model", "Item Description", "Picture", "Model", "", "Master Pack"]),
            row(&["SKU-7", "Warm lights", "https://example.com/7.jpg", "dup", "x", "12"]),
        ]);
        let config = CatalogConfig {
            cdn: Some(CdnConfig {
                template: "https://cdn.test/{model}".into(),
                version: None,
            }),
            ..CatalogConfig::default()
        };
        let catalog = build_from_sheet(&raw, &config);
        let product = &catalog.items[0];
        assert_eq!(product.image, "https://cdn.test/SKU-7");
        assert_eq!(product.short, "Warm lights");
        assert_eq!(product.master_pack, "12");
        assert_eq!(product.raw["Model"], "SKU-7");
        assert!(!product.raw.contains_key(""));
        let master = product
            .details
            .iter()
            .find(|d| d.label == "Master Pack")
            .expect("detail");
        assert_eq!(master.value, "12");
        assert_eq!(product.details.len(), 18);
    }

    #[test]
    fn repeated_models_keep_first_row() {
        let raw = sheet(vec![
            header(),
            row(&["SKU-8", "first", "1", "1"]),
            row(&["SKU-8", "second", "2", "2"]),
        ]);
        let catalog = build_from_sheet(&raw, &CatalogConfig::default());
        assert_eq!(catalog.items.len(), 1);
        assert_eq!(catalog.items[0].short, "first");
    }

    #[test]
    fn header_beyond_sheet_yields_empty_catalog() {
        let raw = sheet(vec![header()]);
        let config = CatalogConfig {
            header_row: Some(40),
            ..CatalogConfig::default()
        };
        let catalog = build_from_sheet(&raw, &config);
        assert!(catalog.items.is_empty());
        assert!(catalog.headers.is_empty());
    }
}
