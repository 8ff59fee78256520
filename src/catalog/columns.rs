use crate::catalog::config::{BuyerAliases, ColumnAliases};
use crate::catalog::models::Field;
use crate::catalog::normalize::normalize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Finds the sheet column for one logical field.
///
/// Exact matches (after normalization) are tried alias by alias, so earlier
/// aliases win. Only when no alias matches exactly does a header that merely
/// contains an alias qualify, scanning headers left to right. Duplicate
/// header names always resolve to their first occurrence.
pub fn resolve_column<H, A>(headers: &[H], aliases: &[A]) -> Option<usize>
where
    H: AsRef<str>,
    A: AsRef<str>,
{
    let headers: Vec<String> = headers.iter().map(|h| normalize(h.as_ref())).collect();
    let aliases: Vec<String> = aliases
        .iter()
        .map(|a| normalize(a.as_ref()))
        .filter(|a| !a.is_empty())
        .collect();

    for alias in &aliases {
        if let Some(idx) = headers.iter().position(|header| header == alias) {
            return Some(idx);
        }
    }

    headers.iter().position(|header| {
        !header.is_empty() && aliases.iter().any(|alias| header.contains(alias.as_str()))
    })
}

/// Logical field to zero-based column, computed once per catalog load.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndexMap {
    columns: HashMap<Field, usize>,
}

impl ColumnIndexMap {
    pub fn resolve<H: AsRef<str>>(headers: &[H], aliases: &ColumnAliases) -> Self {
        let columns = Field::ALL
            .iter()
            .filter_map(|field| {
                resolve_column(headers, aliases.for_field(*field)).map(|idx| (*field, idx))
            })
            .collect();
        Self { columns }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Trimmed cell for `field` in `row`; empty when the column is unresolved
    /// or the row is short.
    pub fn cell<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        cell_at(row, self.get(field))
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|field| !self.columns.contains_key(field))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuyerColumns {
    pub fob: Option<usize>,
    pub pvp: Option<usize>,
}

pub type BuyerPriceColumnMap = BTreeMap<String, BuyerColumns>;

pub fn resolve_buyer_price_columns<H: AsRef<str>>(
    headers: &[H],
    buyers: &BTreeMap<String, BuyerAliases>,
) -> BuyerPriceColumnMap {
    buyers
        .iter()
        .map(|(buyer, aliases)| {
            let columns = BuyerColumns {
                fob: resolve_column(headers, &aliases.fob),
                pvp: resolve_column(headers, &aliases.pvp),
            };
            (buyer.clone(), columns)
        })
        .collect()
}

pub fn cell_at(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|cell| cell.trim()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_ignores_spacing_and_case() {
        let headers = ["Item #", "  Precio FOB Soriana  ($USD) ", "PVP"];
        assert_eq!(
            resolve_column(&headers, &["Precio FOB Soriana ($USD)"]),
            Some(1)
        );
    }

    #[test]
    fn duplicate_headers_resolve_to_first() {
        let headers = ["Model", "Model"];
        assert_eq!(resolve_column(&headers, &["Model"]), Some(0));
    }

    #[test]
    fn alias_order_breaks_ties() {
        let headers = ["Item #", "2026 Model"];
        assert_eq!(resolve_column(&headers, &["2026 Model", "Item #"]), Some(1));
        assert_eq!(resolve_column(&headers, &["Item #", "2026 Model"]), Some(0));
    }

    #[test]
    fn exact_match_beats_earlier_substring() {
        let headers = ["Model (old)", "Model"];
        assert_eq!(resolve_column(&headers, &["Model"]), Some(1));
    }

    #[test]
    fn substring_fallback_scans_headers_in_order() {
        let headers = ["Notes", "Packaging type / Tipo de empaque", "Packaging"];
        assert_eq!(resolve_column(&headers, &["Packaging type"]), Some(1));
    }

    #[test]
    fn unresolved_and_empty_aliases() {
        let headers = ["", "Model"];
        assert_eq!(resolve_column(&headers, &["Picture"]), None);
        assert_eq!(resolve_column(&headers, &["   "]), None);
        let none: [&str; 0] = [];
        assert_eq!(resolve_column(&headers, &none), None);
    }

    #[test]
    fn buyer_columns_resolve_independently() {
        let headers = [
            "Item #",
            "Precio FOB HEB ($USD)",
            "Precio FOB Soriana ($USD)",
            "PVP Soriana Estimado ($MXN)",
        ];
        let mut buyers = BTreeMap::new();
        buyers.insert(
            "SORIANA".to_string(),
            BuyerAliases {
                fob: vec!["Precio FOB Soriana ($USD)".into()],
                pvp: vec!["PVP Soriana Estimado ($MXN)".into()],
            },
        );
        buyers.insert(
            "HEB".to_string(),
            BuyerAliases {
                fob: vec!["Precio FOB HEB ($USD)".into()],
                pvp: vec!["PVP HEB Estimado ($MXN)".into()],
            },
        );
        let map = resolve_buyer_price_columns(&headers, &buyers);
        assert_eq!(
            map["SORIANA"],
            BuyerColumns {
                fob: Some(2),
                pvp: Some(3)
            }
        );
        assert_eq!(
            map["HEB"],
            BuyerColumns {
                fob: Some(1),
                pvp: None
            }
        );
    }

    #[test]
    fn cell_lookup_tolerates_short_rows() {
        let row = vec!["SKU-1".to_string(), "  lamp ".to_string()];
        assert_eq!(cell_at(&row, Some(1)), "lamp");
        assert_eq!(cell_at(&row, Some(5)), "");
        assert_eq!(cell_at(&row, None), "");
    }
}
