use crate::catalog::normalize::normalize;

const SCAN_ROWS: usize = 30;

const KEY_HINTS: &[&str] = &[
    "item",
    "model",
    "#",
    "picture",
    "image",
    "description",
    "short",
    "precio",
    "price",
    "pvp",
    "packaging",
    "master",
    "cbm",
    "bulb",
    "length",
    "power",
    "lead",
    "connector",
    "function",
    "accesor",
    "accessor",
];

/// Returns the 1-indexed header row of `matrix`.
///
/// A positive `override_row` is returned as is. Otherwise each of the first
/// 30 rows scores one point per non-empty cell plus two per cell mentioning a
/// known column keyword; the highest score wins and ties keep the earlier row.
pub fn detect_header_row(matrix: &[Vec<String>], override_row: Option<usize>) -> usize {
    if let Some(row) = override_row.filter(|row| *row > 0) {
        return row;
    }

    let mut best_row = 1;
    let mut best_score = 0;
    for (idx, row) in matrix.iter().take(SCAN_ROWS).enumerate() {
        let score = score_row(row);
        if score > best_score {
            best_score = score;
            best_row = idx + 1;
        }
    }
    best_row
}

fn score_row(row: &[String]) -> usize {
    row.iter()
        .map(|cell| normalize(cell))
        .filter(|cell| !cell.is_empty())
        .map(|cell| {
            if KEY_HINTS.iter().any(|hint| cell.contains(hint)) {
                3
            } else {
                1
            }
        })
        .sum()
}
