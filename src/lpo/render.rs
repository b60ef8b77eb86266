//! PDF painter for [`DocumentLayout`].

use std::io::Cursor;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Rgb as PdfRgb,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::layout::{
    text_width_mm, Align, DocumentLayout, Element, FontWeight, Rgb, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};
use crate::errors::ServiceError;

const LAYER_NAME: &str = "Layer 1";
const LOGO_DPI: f32 = 300.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("layout has no pages")]
    EmptyLayout,
}

impl From<printpdf::Error> for RenderError {
    fn from(err: printpdf::Error) -> Self {
        RenderError::Pdf(err.to_string())
    }
}

impl From<RenderError> for ServiceError {
    fn from(err: RenderError) -> Self {
        ServiceError::RenderError(err.to_string())
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, RenderError> {
        Ok(Self {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        })
    }

    fn for_weight(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

/// Paints every page of `layout`. An unreadable logo is skipped with a warning.
pub fn render_pdf(layout: &DocumentLayout, logo: Option<&[u8]>) -> Result<Vec<u8>, RenderError> {
    if layout.pages.is_empty() {
        return Err(RenderError::EmptyLayout);
    }

    let (doc, first_page, first_layer) = PdfDocument::new(
        layout.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );
    let fonts = Fonts::load(&doc)?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            doc.get_page(page_index).get_layer(layer_index)
        };

        for element in &page.elements {
            paint(&layer, &fonts, element, logo);
        }
    }

    let bytes = doc.save_to_bytes()?;
    debug!(pages = layout.pages.len(), bytes = bytes.len(), "rendered LPO document");
    Ok(bytes)
}

fn flip(y: f32) -> f32 {
    PAGE_HEIGHT_MM - y
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(flip(y))), false)
}

fn rect_ring(x: f32, y: f32, width: f32, height: f32) -> Vec<(Point, bool)> {
    vec![
        point(x, y),
        point(x + width, y),
        point(x + width, y + height),
        point(x, y + height),
    ]
}

fn pdf_color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(PdfRgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn black() -> Color {
    pdf_color(Rgb(0, 0, 0))
}

fn paint(layer: &PdfLayerReference, fonts: &Fonts, element: &Element, logo: Option<&[u8]>) {
    match element {
        Element::Text {
            x,
            y,
            text,
            size,
            weight,
            align,
        } => {
            if text.is_empty() {
                return;
            }
            let width = text_width_mm(text, *size);
            let left = match align {
                Align::Left => *x,
                Align::Center => x - width / 2.0,
                Align::Right => x - width,
            };
            layer.use_text(
                text.as_str(),
                *size,
                Mm(left),
                Mm(flip(*y)),
                fonts.for_weight(*weight),
            );
        }
        Element::FilledRect {
            x,
            y,
            width,
            height,
            color,
        } => {
            layer.set_fill_color(pdf_color(*color));
            layer.add_polygon(Polygon {
                rings: vec![rect_ring(*x, *y, *width, *height)],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
            layer.set_fill_color(black());
        }
        Element::Rule { x1, y1, x2, y2 } => {
            layer.set_outline_color(black());
            layer.set_outline_thickness(0.5);
            layer.add_line(Line {
                points: vec![point(*x1, *y1), point(*x2, *y2)],
                is_closed: false,
            });
        }
        Element::CellBorder {
            x,
            y,
            width,
            height,
        } => {
            layer.set_outline_color(pdf_color(Rgb(200, 200, 200)));
            layer.set_outline_thickness(0.3);
            layer.add_line(Line {
                points: rect_ring(*x, *y, *width, *height),
                is_closed: true,
            });
        }
        Element::Logo {
            x,
            y,
            width,
            height,
        } => match logo {
            Some(bytes) => {
                if let Err(err) = place_logo(layer, bytes, *x, *y, *width, *height) {
                    warn!(error = %err, "company logo could not be embedded; continuing without it");
                }
            }
            None => debug!("no logo configured"),
        },
    }
}

fn place_logo(
    layer: &PdfLayerReference,
    bytes: &[u8],
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Result<(), String> {
    let decoder = printpdf::image_crate::codecs::png::PngDecoder::new(Cursor::new(bytes))
        .map_err(|e| e.to_string())?;
    let image = Image::try_from(decoder).map_err(|e| e.to_string())?;

    let px_w = image.image.width.0 as f32;
    let px_h = image.image.height.0 as f32;
    if px_w <= 0.0 || px_h <= 0.0 {
        return Err("logo has no pixels".to_string());
    }
    let natural_w = px_w / LOGO_DPI * 25.4;
    let natural_h = px_h / LOGO_DPI * 25.4;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(flip(y + height))),
            scale_x: Some(width / natural_w),
            scale_y: Some(height / natural_h),
            dpi: Some(LOGO_DPI),
            ..Default::default()
        },
    );
    Ok(())
}
