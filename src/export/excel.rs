use crate::export::{ExportError, ExportRow};
use rust_xlsxwriter::{Format, FormatAlign, Image, Workbook, XlsxError};
use tracing::warn;

pub const SHEET_NAME: &str = "Selección";

const COLUMNS: [(&str, f64); 5] = [
    ("Imagen", 16.0),
    ("Modelo", 18.0),
    ("Descripción", 60.0),
    ("Comentario", 40.0),
    ("Imagen URL", 80.0),
];
const HEADER_HEIGHT: f64 = 22.0;
const ROW_HEIGHT: f64 = 90.0;

pub fn render(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    write_workbook(rows).map_err(|err| ExportError::Render(err.to_string()))
}

fn write_workbook(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::VerticalCenter);
    let wrapped = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let plain = Format::new().set_align(FormatAlign::Top);

    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, *width)?;
        sheet.write_string_with_format(0, col, *title, &header)?;
    }
    sheet.set_row_height(0, HEADER_HEIGHT)?;
    sheet.set_freeze_panes(1, 0)?;

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet.set_row_height(r, ROW_HEIGHT)?;
        sheet.write_string_with_format(r, 1, &row.model, &plain)?;
        sheet.write_string_with_format(r, 2, &row.description, &wrapped)?;
        sheet.write_string_with_format(r, 3, &row.note, &wrapped)?;
        sheet.write_string_with_format(r, 4, &row.image_url, &plain)?;

        let Some(picture) = &row.picture else {
            continue;
        };
        match Image::new_from_buffer(&picture.encoded) {
            Ok(image) => {
                sheet.insert_image_fit_to_cell(r, 0, &image, true)?;
            }
            Err(err) => {
                warn!(target = "showroom.export", model = %row.model, error = %err, "image not embeddable in sheet");
            }
        }
    }

    book.save_to_buffer()
}
