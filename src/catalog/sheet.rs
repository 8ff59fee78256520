use crate::catalog::CatalogError;
use calamine::{Data, Reader, Sheets, open_workbook_auto_from_rs};
use std::io::Cursor;
use tracing::warn;

const SHEET_HINTS: &[&str] = &["fob", "master"];

/// The selected worksheet as a string matrix. Rows and columns keep their
/// sheet positions, so row `n` of the sheet is `rows[n - 1]`.
///
/// `numbers` mirrors `rows` and holds the typed value of numeric cells, so
/// prices never go through text parsing when the workbook stores a number.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
    pub numbers: Vec<Vec<Option<f64>>>,
}

pub struct Workbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn open(bytes: Vec<u8>) -> Result<Self, CatalogError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|err| CatalogError::Workbook(err.to_string()))?;
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Reads the preferred worksheet, falling back to the first one whose name
    /// looks like a price master and then to the first worksheet.
    pub fn read_sheet(&mut self, preferred: Option<&str>) -> Result<RawSheet, CatalogError> {
        let names = self.sheet_names();
        let name = select_sheet(&names, preferred).ok_or_else(|| {
            CatalogError::WorksheetNotFound(preferred.unwrap_or("<any>").to_string())
        })?;
        let range = self
            .sheets
            .worksheet_range(&name)
            .map_err(|err| CatalogError::Workbook(err.to_string()))?;

        let (row_offset, col_offset) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); row_offset];
        let mut numbers = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![String::new(); col_offset];
            cells.extend(row.iter().map(cell_text));
            rows.push(cells);
            let mut values = vec![None; col_offset];
            values.extend(row.iter().map(cell_number));
            numbers.push(values);
        }
        Ok(RawSheet {
            name,
            rows,
            numbers,
        })
    }
}

pub fn select_sheet(names: &[String], preferred: Option<&str>) -> Option<String> {
    if let Some(wanted) = preferred {
        if let Some(found) = names.iter().find(|name| name.as_str() == wanted) {
            return Some(found.clone());
        }
        warn!(
            target = "showroom.catalog",
            sheet = wanted,
            available = ?names,
            "configured worksheet not found; using heuristic selection"
        );
    }
    names
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            SHEET_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .or_else(|| names.first())
        .cloned()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(value) => Some(*value).filter(|v| v.is_finite()),
        Data::Int(value) => Some(*value as f64),
        _ => None,
    }
}
