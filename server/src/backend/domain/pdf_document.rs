//! Minimal paginated A4 text layout on top of printpdf's built-in fonts.

use anyhow::Result;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::io::BufWriter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_RIGHT: f32 = 195.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 22.0;
const FOOTER_Y: f32 = 12.0;

/// Longest line, in characters, printed at body size before wrapping
const WRAP_COLUMNS: usize = 95;

/// Format an amount as `R$ 1.234,56`
pub fn format_money(value: f64, symbol: &str) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let integer = (cents / 100).to_string();
    let mut grouped = String::new();
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{} {},{:02}", sign, symbol, grouped, cents % 100)
}

/// Split text into lines of at most `width` characters at word boundaries
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Sequential writer: text flows top to bottom, new pages start automatically
pub struct PdfReport {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
    footer: String,
}

impl PdfReport {
    pub fn new(title: &str, footer: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow::anyhow!("Failed to load PDF font: {}", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow::anyhow!("Failed to load PDF font: {}", e))?;

        let report = Self {
            doc,
            layer,
            font,
            bold,
            y: TOP,
            pages: 1,
            footer: footer.to_string(),
        };
        report.draw_footer();
        Ok(report)
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    fn draw_footer(&self) {
        let text = format!("{}  |  página {}", self.footer, self.pages);
        self.layer.use_text(text, 8.0, Mm(MARGIN_LEFT), Mm(FOOTER_Y), &self.font);
    }

    /// Start a new page when fewer than `height` millimetres remain
    fn reserve(&mut self, height: f32) {
        if self.y - height >= BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = TOP;
        self.draw_footer();
    }

    pub fn title(&mut self, text: &str) {
        self.reserve(10.0);
        self.layer.use_text(text, 16.0, Mm(MARGIN_LEFT), Mm(self.y), &self.bold);
        self.y -= 9.0;
    }

    pub fn heading(&mut self, text: &str) {
        self.reserve(16.0);
        self.y -= 4.0;
        self.layer.use_text(text, 12.0, Mm(MARGIN_LEFT), Mm(self.y), &self.bold);
        self.y -= 2.5;
        self.divider();
        self.y -= 5.0;
    }

    /// Body text, wrapped to the page width
    pub fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, WRAP_COLUMNS) {
            self.reserve(5.0);
            self.layer.use_text(line, 10.0, Mm(MARGIN_LEFT), Mm(self.y), &self.font);
            self.y -= 5.0;
        }
    }

    /// `label: value` pair with a bold label
    pub fn field(&mut self, label: &str, value: &str) {
        self.reserve(5.0);
        self.layer.use_text(format!("{}:", label), 10.0, Mm(MARGIN_LEFT), Mm(self.y), &self.bold);
        self.layer.use_text(value, 10.0, Mm(MARGIN_LEFT + 45.0), Mm(self.y), &self.font);
        self.y -= 5.0;
    }

    /// One table row; `columns` are (x offset from the left margin, text)
    pub fn row(&mut self, columns: &[(f32, String)], bold: bool) {
        self.reserve(5.5);
        let font = if bold { &self.bold } else { &self.font };
        for (x, text) in columns {
            self.layer.use_text(text.as_str(), 9.5, Mm(MARGIN_LEFT + x), Mm(self.y), font);
        }
        self.y -= 5.5;
    }

    pub fn divider(&mut self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(self.y)), false),
                (Point::new(Mm(MARGIN_RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| anyhow::anyhow!("Failed to render PDF: {}", e))?;
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to render PDF: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0, "R$"), "R$ 0,00");
        assert_eq!(format_money(1234.5, "R$"), "R$ 1.234,50");
        assert_eq!(format_money(1_000_000.0, "R$"), "R$ 1.000.000,00");
        assert_eq!(format_money(99.999, "R$"), "R$ 100,00");
        assert_eq!(format_money(-12.3, "€"), "-€ 12,30");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("um dois tres", 7), vec!["um dois", "tres"]);
        assert_eq!(wrap_text("linha\n\noutra", 20), vec!["linha", "", "outra"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_long_report_paginates() {
        let mut report = PdfReport::new("Teste", "Rodapé").unwrap();
        report.title("Relatório");
        for n in 0..120 {
            report.row(&[(0.0, format!("Linha {}", n)), (120.0, format_money(n as f64, "R$"))], false);
        }
        assert!(report.page_count() > 1);

        let bytes = report.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
