use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
};

use stocklink_transfers::OrderView;

use crate::error::ReportError;
use crate::filter::LocalTime;
use crate::layout::{
    Element, OperatorField, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Page, TABLE_COLUMNS_MM, paginate,
};

const LAYER: &str = "Layer 1";

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render orders into an A4 PDF document.
///
/// Pure function of its input; the bytes are ready to be served.
pub fn render_pdf(
    orders: &[OrderView],
    title: &str,
    operator: OperatorField,
    local: &LocalTime,
) -> Result<Vec<u8>, ReportError> {
    let pages = paginate(orders, title, operator, local);

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    for (n, page) in pages.iter().enumerate() {
        let layer = if n == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
            doc.get_page(p).get_layer(l)
        };
        draw_page(&layer, page, &fonts);
    }

    tracing::debug!(orders = orders.len(), pages = pages.len(), "rendered report");
    Ok(doc.save_to_bytes()?)
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) {
    let [left, requested, sent, right] = TABLE_COLUMNS_MM;

    for placed in &page.elements {
        let y = placed.y_mm;
        match &placed.element {
            Element::Title(text) => {
                layer.use_text(text.as_str(), 16.0, Mm(left), Mm(y), &fonts.bold);
            }
            Element::Heading(text) => {
                layer.use_text(text.as_str(), 13.0, Mm(left), Mm(y), &fonts.bold);
            }
            Element::Text(text) => {
                layer.use_text(text.as_str(), 10.0, Mm(left), Mm(y), &fonts.regular);
            }
            Element::TableHeader(cells) | Element::TableRow(cells) => {
                let font = match placed.element {
                    Element::TableHeader(_) => &fonts.bold,
                    _ => &fonts.regular,
                };
                layer.use_text(cells[0].as_str(), 10.0, Mm(left + 2.0), Mm(y + 2.0), font);
                layer.use_text(cells[1].as_str(), 10.0, Mm(requested + 2.0), Mm(y + 2.0), font);
                layer.use_text(cells[2].as_str(), 10.0, Mm(sent + 2.0), Mm(y + 2.0), font);

                // Row box: bottom rule plus column separators.
                hline(layer, left, right, y);
                hline(layer, left, right, y + 7.0);
                for x in TABLE_COLUMNS_MM {
                    vline(layer, x, y, y + 7.0);
                }
            }
        }
    }
}

fn hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn vline(layer: &PdfLayerReference, x: f32, y1: f32, y2: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x), Mm(y1)), false),
            (Point::new(Mm(x), Mm(y2)), false),
        ],
        is_closed: false,
    });
}
