use crate::export::{ExportError, ExportRow};
use chrono::{Datelike, NaiveDate};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb,
    image_crate::{DynamicImage, RgbImage},
    path::PaintMode,
};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 16.0;
const MARGIN_Y: f32 = 14.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN_X;
/// Column share of the content width: image, model, description, note.
const COLUMN_SHARES: [f32; 4] = [0.14, 0.20, 0.30, 0.36];
const COLUMN_TITLES: [&str; 4] = ["Imagen", "Modelo", "Descripción", "Comentario"];
const HEADER_H: f32 = 8.0;
const MIN_ROW_H: f32 = 30.0;
const PAD: f32 = 2.0;
const BODY_PT: f32 = 9.0;
const LINE_H: f32 = 4.0;
/// Rough Helvetica advance at 9pt, used for wrapping.
const CHAR_W: f32 = 1.65;
const IMAGE_DPI: f32 = 300.0;
/// Tallest row that still fits under a table header on a fresh page.
const MAX_ROW_H: f32 = PAGE_H - 2.0 * MARGIN_Y - HEADER_H;
const MAX_CELL_LINES: usize = ((MAX_ROW_H - 2.0 * PAD - 2.0) / LINE_H) as usize;
const CUSTOM_SECTION: &str = "Productos Adicionales";

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub fn render(
    title: &str,
    buyer: &str,
    date: NaiveDate,
    rows: &[ExportRow],
) -> Result<Vec<u8>, ExportError> {
    let mut writer = PdfWriter::new(&format!("{title} - Selección"))?;
    writer.text(&format!("{title} - Selección"), 18.0, MARGIN_X, true);
    writer.advance(7.0);
    writer.set_fill(0.33, 0.33, 0.33);
    writer.text(
        &format!("Comprador: {buyer}   |   Fecha: {}", long_date(date)),
        10.0,
        MARGIN_X,
        false,
    );
    writer.set_fill(0.0, 0.0, 0.0);
    writer.advance(10.0);

    let (regular, custom): (Vec<&ExportRow>, Vec<&ExportRow>) =
        rows.iter().partition(|row| !row.is_custom);
    if !regular.is_empty() {
        writer.table(&regular);
    }
    if !custom.is_empty() {
        writer.section(CUSTOM_SECTION);
        writer.table(&custom);
    }
    writer.finish()
}

/// "19 de octubre de 2026"
pub fn long_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} de {month} de {}", date.day(), date.year())
}

/// Greedy word wrap to at most `width` characters per line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while word.chars().count() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let split = word
                    .char_indices()
                    .nth(width)
                    .map(|(idx, _)| idx)
                    .unwrap_or(word.len());
                lines.push(word[..split].to_string());
                word = &word[split..];
            }
            if word.is_empty() {
                continue;
            }
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Wraps a cell and cuts it to what one page can hold, marking the cut.
fn cell_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = wrap(text, width);
    if lines.len() > MAX_CELL_LINES {
        lines.truncate(MAX_CELL_LINES);
        if let Some(last) = lines.last_mut() {
            let keep = width.saturating_sub(3);
            *last = last.chars().take(keep).collect::<String>() + "...";
        }
    }
    lines
}

fn row_height(lines: usize) -> f32 {
    MIN_ROW_H.max(2.0 * PAD + 2.0 + lines as f32 * LINE_H)
}

fn column_widths() -> [f32; 4] {
    COLUMN_SHARES.map(|share| share * CONTENT_W)
}

fn chars_for(width_mm: f32) -> usize {
    ((width_mm - 2.0 * PAD) / CHAR_W).floor().max(1.0) as usize
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance from the bottom edge of the next line to draw.
    y: f32,
    striped: bool,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_H - MARGIN_Y,
            striped: true,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN_Y;
    }

    fn remaining(&self) -> f32 {
        self.y - MARGIN_Y
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn set_fill(&self, r: f32, g: f32, b: f32) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(x), Mm(self.y - size * 0.3528), font);
    }

    fn rect(&self, x: f32, top: f32, w: f32, h: f32, mode: PaintMode) {
        let rect = Rect::new(Mm(x), Mm(top - h), Mm(x + w), Mm(top)).with_mode(mode);
        self.layer.add_rect(rect);
    }

    fn outline(&self, top: f32, h: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.898, 0.906, 0.922, None)));
        self.layer.set_outline_thickness(0.5);
        self.rect(MARGIN_X, top, CONTENT_W, h, PaintMode::Stroke);
    }

    fn section(&mut self, title: &str) {
        if self.remaining() < 42.0 {
            self.new_page();
        }
        self.advance(6.0);
        self.set_fill(0.0, 0.0, 0.0);
        self.text(title, 14.0, MARGIN_X, true);
        self.advance(8.0);
    }

    fn table_header(&mut self) {
        let top = self.y;
        self.set_fill(0.953, 0.957, 0.965);
        self.rect(MARGIN_X, top, CONTENT_W, HEADER_H, PaintMode::Fill);
        self.set_fill(0.216, 0.255, 0.318);
        let mut x = MARGIN_X;
        for (title, width) in COLUMN_TITLES.iter().zip(column_widths()) {
            self.y = top - 2.5;
            self.text(title, BODY_PT, x + PAD, true);
            x += width;
        }
        self.y = top - HEADER_H;
    }

    fn table(&mut self, rows: &[&ExportRow]) {
        let widths = column_widths();
        if self.remaining() < HEADER_H + MIN_ROW_H {
            self.new_page();
        }
        self.table_header();

        for row in rows {
            let description = cell_lines(&row.description, chars_for(widths[2]));
            let note = cell_lines(&row.note, chars_for(widths[3]));
            let model = cell_lines(&row.model, chars_for(widths[1]));
            let row_h = row_height(description.len().max(note.len()).max(model.len()));

            if self.remaining() < row_h {
                self.new_page();
                self.table_header();
            }
            let top = self.y;

            if self.striped {
                self.set_fill(0.98, 0.98, 0.98);
                self.rect(MARGIN_X, top, CONTENT_W, row_h, PaintMode::Fill);
            }
            self.striped = !self.striped;
            self.outline(top, row_h);

            self.draw_picture(row, top, widths[0], row_h);

            self.set_fill(0.122, 0.161, 0.216);
            let mut x = MARGIN_X + widths[0];
            for (column, width) in [model, description, note].iter().zip(&widths[1..]) {
                self.y = top - PAD - 1.0;
                for line in column {
                    self.text(line, BODY_PT, x + PAD, false);
                    self.y -= LINE_H;
                }
                x += width;
            }
            self.y = top - row_h;
        }
    }

    fn draw_picture(&mut self, row: &ExportRow, top: f32, width: f32, height: f32) {
        let box_w = width - 2.0 * PAD;
        let box_h = height - 2.0 * PAD;
        let left = MARGIN_X + PAD;

        let Some(picture) = &row.picture else {
            self.set_fill(0.953, 0.957, 0.965);
            self.rect(left, top - PAD, box_w, box_h, PaintMode::Fill);
            self.set_fill(0.612, 0.639, 0.686);
            self.y = top - height / 2.0 + 1.0;
            self.text("Sin imagen", 8.0, left + 2.0, false);
            return;
        };

        let (px_w, px_h) = picture.pixels.dimensions();
        let Some(buffer) = RgbImage::from_raw(px_w, px_h, picture.pixels.as_raw().clone()) else {
            return;
        };
        let native_w = px_w as f32 / IMAGE_DPI * 25.4;
        let native_h = px_h as f32 / IMAGE_DPI * 25.4;
        if native_w <= 0.0 || native_h <= 0.0 {
            return;
        }
        let scale = (box_w / native_w).min(box_h / native_h);
        let drawn_w = native_w * scale;
        let drawn_h = native_h * scale;

        Image::from_dynamic_image(&DynamicImage::ImageRgb8(buffer)).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(left + (box_w - drawn_w) / 2.0)),
                translate_y: Some(Mm(top - PAD - box_h + (box_h - drawn_h) / 2.0)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..ImageTransform::default()
            },
        );
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        self.doc.save_to_bytes().map_err(render_error)
    }
}

fn render_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::media::Picture;

    fn row(model: &str, custom: bool, picture: Option<Picture>) -> ExportRow {
        ExportRow {
            model: model.into(),
            description: "Serie de luces LED cálidas con controlador de ocho funciones".into(),
            note: "Pedir en caja master".into(),
            image_url: String::new(),
            is_custom: custom,
            picture,
        }
    }

    #[test]
    fn spanish_long_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(long_date(date), "19 de octubre de 2026");
    }

    #[test]
    fn wraps_words_and_splits_long_tokens() {
        assert_eq!(wrap("one two three", 7), ["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap("a\nb", 10), ["a", "b"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn oversized_cells_are_cut_to_one_page() {
        let width = chars_for(column_widths()[3]);
        let note = "palabra ".repeat(2000);
        let lines = cell_lines(&note, width);
        assert_eq!(lines.len(), MAX_CELL_LINES);
        assert!(lines.last().unwrap().ends_with("..."));
        assert!(lines.iter().all(|line| line.chars().count() <= width));
        assert!(row_height(lines.len()) <= MAX_ROW_H);
        assert_eq!(cell_lines("corto", width), ["corto"]);
    }

    #[test]
    fn renders_row_with_very_long_note() {
        let mut long = row("SKU-LONG", false, None);
        long.note = "comentario largo ".repeat(1500);
        let rows = vec![row("SKU-1", false, None), long];
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let bytes = render("Showroom", "HEB", date, &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_pdf_with_sections_and_pages() {
        let pixels = image::RgbImage::from_pixel(6, 4, image::Rgb([10, 200, 10]));
        let mut png = Vec::new();
        pixels
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let picture = Picture::from_bytes(png).unwrap();

        let mut rows: Vec<ExportRow> = (0..20)
            .map(|idx| row(&format!("SKU-{idx}"), false, Some(picture.clone())))
            .collect();
        rows.push(row("Custom", true, None));
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let bytes = render("Showroom", "HEB", date, &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
