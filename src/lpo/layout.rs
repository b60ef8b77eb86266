//! Declarative A4 page description of an LPO.
//!
//! Coordinates are millimetres from the top-left corner of the page. Text `y`
//! is the baseline. The renderer flips the y axis for PDF output.

use serde::Serialize;
use tracing::debug;

use super::{format_money, CompanyProfile, CurrencyWords, LpoDraft};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const LEFT_MM: f32 = 14.0;
pub const RIGHT_MM: f32 = 200.0;
pub const CONTENT_WIDTH_MM: f32 = 182.0;

pub const TABLE_START_Y: f32 = 125.0;
pub const TABLE_TOP_MARGIN: f32 = 20.0;
pub const TABLE_BOTTOM_MARGIN: f32 = 60.0;
pub const COLUMN_WIDTHS: [f32; 6] = [12.0, 85.0, 18.0, 18.0, 22.0, 28.0];
pub const COLUMN_HEADERS: [&str; 6] = ["SC NO", "DESCRIPTION", "UNIT", "QTY", "RATE", "TOTAL AMOUNT"];
const COLUMN_ALIGN: [Align; 6] = [
    Align::Center,
    Align::Left,
    Align::Center,
    Align::Center,
    Align::Right,
    Align::Right,
];

/// Space the footer needs before it is pushed onto a fresh page.
pub const FOOTER_MIN_SPACE: f32 = 100.0;
pub const FOOTER_PAGE_START: f32 = 20.0;

pub const WORDS_WRAP_MM: f32 = 130.0;
pub const CONDITIONS_WRAP_MM: f32 = 180.0;

pub const BRAND_BLUE: Rgb = Rgb(41, 84, 115);

const HEADER_FONT_PT: f32 = 9.0;
const BODY_FONT_PT: f32 = 8.0;
const CELL_PADDING_MM: f32 = 1.5;
const PT_TO_MM: f32 = 0.3528;
const LINE_HEIGHT_FACTOR: f32 = 1.15;
/// Average Helvetica glyph advance, in em.
const AVG_GLYPH_EM: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        weight: FontWeight,
        align: Align,
    },
    FilledRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    CellBorder {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Logo {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    fn text(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, weight: FontWeight) {
        self.aligned_text(x, y, text, size, weight, Align::Left);
    }

    fn aligned_text(
        &mut self,
        x: f32,
        y: f32,
        text: impl Into<String>,
        size: f32,
        weight: FontWeight,
        align: Align,
    ) {
        self.elements.push(Element::Text {
            x,
            y,
            text: text.into(),
            size,
            weight,
            align,
        });
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLayout {
    pub title: String,
    pub file_name: String,
    pub pages: Vec<Page>,
    /// Bottom of the item table on its last page.
    pub table_end_y: f32,
    /// Where the totals footer starts, on the last page.
    pub footer_start_y: f32,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.pages
            .iter()
            .any(|page| page.texts().any(|text| text.contains(needle)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    pub currency: CurrencyWords,
    /// Reserve the logo slot in the letterhead.
    pub include_logo: bool,
}

/// Approximate rendered width of `text` in Helvetica at `size_pt`.
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * PT_TO_MM * AVG_GLYPH_EM
}

fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LINE_HEIGHT_FACTOR
}

/// Greedy word wrap to `width_mm`. Explicit newlines are kept, blank lines
/// included, and words longer than the width are split.
pub fn wrap_text(text: &str, width_mm: f32, size_pt: f32) -> Vec<String> {
    let glyph_mm = size_pt * PT_TO_MM * AVG_GLYPH_EM;
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }
    lines
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self, y: f32) {
        self.pages.push(Page::default());
        self.y = y;
    }
}

/// Lays out the whole document.
pub fn build(draft: &LpoDraft, company: &CompanyProfile, options: &LayoutOptions) -> DocumentLayout {
    let mut cursor = Cursor {
        pages: vec![Page::default()],
        y: TABLE_START_Y,
    };

    letterhead(cursor.page(), draft, company, options);
    item_table(&mut cursor, draft);
    let table_end_y = cursor.y;

    let footer = footer_lines(draft, company, options);
    let needed = FOOTER_MIN_SPACE.max(footer.height);
    let footer_start_y = if PAGE_HEIGHT_MM - table_end_y < needed {
        cursor.new_page(FOOTER_PAGE_START);
        FOOTER_PAGE_START
    } else {
        table_end_y
    };
    footer.paint(&mut cursor, footer_start_y);

    DocumentLayout {
        title: format!("LPO {}", draft.lpo_number),
        file_name: draft.file_name(),
        pages: cursor.pages,
        table_end_y,
        footer_start_y,
    }
}

fn letterhead(page: &mut Page, draft: &LpoDraft, company: &CompanyProfile, options: &LayoutOptions) {
    use FontWeight::*;

    page.text(LEFT_MM, 15.0, &company.name, 12.0, Bold);
    page.aligned_text(RIGHT_MM, 15.0, &company.name, 12.0, Regular, Align::Right);

    let contact = [
        company.address.clone(),
        format!("Tel.: {}", company.phone),
        format!("Email : {}", company.email),
    ];
    for (i, line) in contact.iter().enumerate() {
        let y = 20.0 + 5.0 * i as f32;
        page.aligned_text(RIGHT_MM, y, line, 10.0, Regular, Align::Right);
        page.text(LEFT_MM, y, line, 10.0, Regular);
    }

    if options.include_logo {
        page.elements.push(Element::Logo {
            x: 90.0,
            y: 10.0,
            width: 30.0,
            height: 25.0,
        });
    }

    page.elements.push(Element::FilledRect {
        x: LEFT_MM,
        y: 45.0,
        width: CONTENT_WIDTH_MM,
        height: 3.0,
        color: BRAND_BLUE,
    });

    page.text(LEFT_MM, 60.0, &draft.date_label, 11.0, Regular);
    page.text(160.0, 60.0, "LPO", 11.0, Regular);
    page.text(LEFT_MM, 70.0, format!("LPO NO : {}", draft.lpo_number), 11.0, Regular);

    let supplier = &draft.supplier;
    page.text(LEFT_MM, 85.0, &supplier.company_name, 10.0, Bold);
    page.text(LEFT_MM, 90.0, &supplier.city, 10.0, Regular);
    page.text(LEFT_MM, 95.0, &supplier.po_box, 10.0, Regular);
    page.text(
        LEFT_MM,
        100.0,
        format!("Kind Att : {}", supplier.contact_person),
        10.0,
        Regular,
    );
    page.text(
        120.0,
        100.0,
        format!("{} : {}", company.trn_label, supplier.trn),
        10.0,
        Regular,
    );
    page.text(LEFT_MM, 105.0, format!("PROJECT : {}", supplier.project), 10.0, Regular);
    page.text(
        LEFT_MM,
        110.0,
        "Kindly supply the following as per price agreed",
        10.0,
        Regular,
    );

    page.text(LEFT_MM, 120.0, &draft.department, 10.0, Bold);
}

fn column_x(index: usize) -> f32 {
    LEFT_MM + COLUMN_WIDTHS[..index].iter().sum::<f32>()
}

fn cell_text_x(index: usize) -> f32 {
    let x = column_x(index);
    let width = COLUMN_WIDTHS[index];
    match COLUMN_ALIGN[index] {
        Align::Left => x + CELL_PADDING_MM,
        Align::Center => x + width / 2.0,
        Align::Right => x + width - CELL_PADDING_MM,
    }
}

fn row(page: &mut Page, y: f32, cells: &[Vec<String>; 6], size: f32, weight: FontWeight) -> f32 {
    let line_h = line_height_mm(size);
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let height = lines as f32 * line_h + 2.0 * CELL_PADDING_MM;

    for (index, cell) in cells.iter().enumerate() {
        page.elements.push(Element::CellBorder {
            x: column_x(index),
            y,
            width: COLUMN_WIDTHS[index],
            height,
        });
        let align = if weight == FontWeight::Bold {
            Align::Center
        } else {
            COLUMN_ALIGN[index]
        };
        let x = if align == Align::Center {
            column_x(index) + COLUMN_WIDTHS[index] / 2.0
        } else {
            cell_text_x(index)
        };
        for (n, line) in cell.iter().enumerate() {
            let baseline = y + CELL_PADDING_MM + line_h * n as f32 + size * PT_TO_MM;
            page.aligned_text(x, baseline, line, size, weight, align);
        }
    }
    height
}

fn header_cells() -> [Vec<String>; 6] {
    COLUMN_HEADERS.map(|h| vec![h.to_string()])
}

fn row_height(cells: &[Vec<String>; 6], size: f32) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f32 * line_height_mm(size) + 2.0 * CELL_PADDING_MM
}

/// Description lines of one row that fit in `space_mm`.
fn lines_fitting(space_mm: f32, size: f32) -> usize {
    let usable = space_mm - 2.0 * CELL_PADDING_MM;
    if usable <= 0.0 {
        return 0;
    }
    (usable / line_height_mm(size)).floor() as usize
}

fn table_page(cursor: &mut Cursor, header: &[Vec<String>; 6]) {
    cursor.new_page(TABLE_TOP_MARGIN);
    let y = cursor.y;
    cursor.y += row(cursor.page(), y, header, HEADER_FONT_PT, FontWeight::Bold);
}

/// Rows move to a fresh page when they do not fit. A row taller than a whole
/// page is split by description lines; continuation rows carry only the
/// description.
fn item_table(cursor: &mut Cursor, draft: &LpoDraft) {
    let limit = PAGE_HEIGHT_MM - TABLE_BOTTOM_MARGIN;
    let header = header_cells();
    let header_height = row_height(&header, HEADER_FONT_PT);
    let page_capacity = lines_fitting(limit - TABLE_TOP_MARGIN - header_height, BODY_FONT_PT).max(1);

    let y = cursor.y;
    cursor.y += row(cursor.page(), y, &header, HEADER_FONT_PT, FontWeight::Bold);

    let description_width = COLUMN_WIDTHS[1] - 2.0 * CELL_PADDING_MM;
    for (index, item) in draft.items.iter().enumerate() {
        let mut description = wrap_text(&item.description, description_width, BODY_FONT_PT);
        let mut first = true;
        loop {
            let needed = description.len().max(1);
            let fits = lines_fitting(limit - cursor.y, BODY_FONT_PT);
            if needed > fits && (needed <= page_capacity || fits == 0) {
                table_page(cursor, &header);
                continue;
            }

            let rest = if needed > fits {
                description.split_off(fits)
            } else {
                Vec::new()
            };
            let cells = if first {
                [
                    vec![(index + 1).to_string()],
                    std::mem::take(&mut description),
                    vec![item.unit.clone()],
                    vec![format_money(item.quantity)],
                    vec![format_money(item.rate)],
                    vec![format_money(item.line_total())],
                ]
            } else {
                [
                    Vec::new(),
                    std::mem::take(&mut description),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                ]
            };
            let y = cursor.y;
            cursor.y += row(cursor.page(), y, &cells, BODY_FONT_PT, FontWeight::Regular);

            if rest.is_empty() {
                break;
            }
            debug!(row = index + 1, "item row continues on next page");
            description = rest;
            first = false;
            table_page(cursor, &header);
        }
    }
}

/// Totals, conditions and signature, positioned relative to a start line.
struct Footer {
    elements: Vec<Element>,
    height: f32,
}

impl Footer {
    /// Paints from `start_y` on the current page. Elements reaching past the
    /// page edge continue from [`FOOTER_PAGE_START`] on following pages.
    fn paint(self, cursor: &mut Cursor, start_y: f32) {
        let first = cursor.pages.len().saturating_sub(1);
        let usable = PAGE_HEIGHT_MM - FOOTER_PAGE_START;
        let mut spilled = 0;
        for element in self.elements {
            let element = shift(element, start_y);
            let overflow = bottom(&element) - PAGE_HEIGHT_MM;
            let pages_on = if overflow > 0.0 {
                (overflow / usable).ceil() as usize
            } else {
                0
            };
            let element = shift(element, -(pages_on as f32) * usable);
            while cursor.pages.len() <= first + pages_on {
                cursor.pages.push(Page::default());
            }
            cursor.pages[first + pages_on].elements.push(element);
            spilled = spilled.max(pages_on);
        }
        if spilled > 0 {
            debug!(pages = spilled, "footer continued on following pages");
        }
    }
}

fn bottom(element: &Element) -> f32 {
    match element {
        Element::Text { y, .. } => *y,
        Element::Rule { y1, y2, .. } => y1.max(*y2),
        Element::FilledRect { y, height, .. }
        | Element::CellBorder { y, height, .. }
        | Element::Logo { y, height, .. } => y + height,
    }
}

fn shift(element: Element, dy: f32) -> Element {
    match element {
        Element::Text {
            x,
            y,
            text,
            size,
            weight,
            align,
        } => Element::Text {
            x,
            y: y + dy,
            text,
            size,
            weight,
            align,
        },
        Element::FilledRect {
            x,
            y,
            width,
            height,
            color,
        } => Element::FilledRect {
            x,
            y: y + dy,
            width,
            height,
            color,
        },
        Element::Rule { x1, y1, x2, y2 } => Element::Rule {
            x1,
            y1: y1 + dy,
            x2,
            y2: y2 + dy,
        },
        Element::CellBorder {
            x,
            y,
            width,
            height,
        } => Element::CellBorder {
            x,
            y: y + dy,
            width,
            height,
        },
        Element::Logo {
            x,
            y,
            width,
            height,
        } => Element::Logo {
            x,
            y: y + dy,
            width,
            height,
        },
    }
}

fn footer_lines(draft: &LpoDraft, company: &CompanyProfile, options: &LayoutOptions) -> Footer {
    use FontWeight::*;
    let mut page = Page::default();

    page.text(120.0, 8.0, "SUB TOTAL", 9.0, Bold);
    page.aligned_text(170.0, 8.0, format_money(draft.subtotal()), 9.0, Bold, Align::Right);
    page.text(120.0, 15.0, "VAT - 5%", 9.0, Bold);
    page.aligned_text(170.0, 15.0, format_money(draft.vat()), 9.0, Bold, Align::Right);

    let words = format!(
        "TOTAL AMOUNT INCLUDING VAT - {}",
        draft.total_in_words(&options.currency)
    );
    let word_lines = wrap_text(&words, WORDS_WRAP_MM, 9.0);
    for (i, line) in word_lines.iter().enumerate() {
        page.text(LEFT_MM, 25.0 + 6.0 * i as f32, line, 9.0, Bold);
    }
    page.aligned_text(185.0, 25.0, format_money(draft.total()), 9.0, Bold, Align::Right);

    // Long totals in words push everything below them down.
    let words_overflow = 6.0 * word_lines.len().saturating_sub(2) as f32;

    let supplier = &draft.supplier;
    let base = words_overflow;
    page.text(LEFT_MM, base + 45.0, "CONDITIONS", 9.0, Bold);
    page.text(LEFT_MM, base + 52.0, format!("PROJECT : {}", supplier.project), 9.0, Regular);
    page.text(
        LEFT_MM,
        base + 57.0,
        format!("2. for delivery contact {}", supplier.delivery_contact),
        9.0,
        Regular,
    );
    page.text(
        LEFT_MM,
        base + 62.0,
        format!("3. Payment terms : {}", supplier.delivery_terms),
        9.0,
        Regular,
    );

    let condition_lines = if draft.conditions.trim().is_empty() {
        Vec::new()
    } else {
        wrap_text(&draft.conditions, CONDITIONS_WRAP_MM, 9.0)
    };
    for (i, line) in condition_lines.iter().enumerate() {
        page.text(LEFT_MM, base + 67.0 + 5.0 * i as f32, line, 9.0, Regular);
    }
    let signature = base + 5.0 * condition_lines.len().saturating_sub(2) as f32;

    page.text(LEFT_MM, signature + 80.0, "Approved by", 9.0, Bold);
    page.elements.push(Element::Rule {
        x1: 20.0,
        y1: signature + 105.0,
        x2: 80.0,
        y2: signature + 105.0,
    });
    page.text(LEFT_MM, signature + 120.0, &company.signatory_name, 9.0, Bold);
    page.text(LEFT_MM, signature + 125.0, &company.signatory_title, 9.0, Regular);
    page.elements.push(Element::FilledRect {
        x: LEFT_MM,
        y: signature + 140.0,
        width: CONTENT_WIDTH_MM,
        height: 8.0,
        color: BRAND_BLUE,
    });

    Footer {
        elements: page.elements,
        height: signature + 148.0,
    }
}
