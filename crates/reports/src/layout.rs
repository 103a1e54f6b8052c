//! Report layout and pagination.
//!
//! Positions are in millimetres from the bottom-left corner of an A4 page, as
//! the PDF writer expects them.

use stocklink_transfers::{OrderView, TransferOrderId};

use crate::filter::LocalTime;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;

/// Left edge of each table column (product, requested, sent) and the right
/// edge of the table.
pub const TABLE_COLUMNS_MM: [f32; 4] = [MARGIN_MM, 108.0, 136.0, 164.0];

const TITLE_HEIGHT: f32 = 14.0;
const HEADING_HEIGHT: f32 = 9.0;
const TEXT_HEIGHT: f32 = 6.0;
const ROW_HEIGHT: f32 = 7.0;
const SECTION_GAP: f32 = 10.0;
const MAX_PRODUCT_CHARS: usize = 48;

/// Which user a report shows as the operator of each order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperatorField {
    CreatedBy,
    PickingBy,
}

impl OperatorField {
    pub fn operator_name(self, order: &OrderView) -> String {
        let actor = match self {
            OperatorField::CreatedBy => Some(&order.created_by),
            OperatorField::PickingBy => order.picking_by.as_ref(),
        };
        actor.map_or_else(|| "-".to_string(), |a| a.username.clone())
    }
}

/// The two branch reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReportKind {
    Supplier,
    Requester,
}

impl ReportKind {
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Supplier => "AUSTIN REPORT",
            ReportKind::Requester => "QUEIMADOS REPORT",
        }
    }

    /// Supplier reports credit the picker; requester reports the creator.
    pub fn operator_field(self) -> OperatorField {
        match self {
            ReportKind::Supplier => OperatorField::PickingBy,
            ReportKind::Requester => OperatorField::CreatedBy,
        }
    }

    pub fn filename(self) -> String {
        match self {
            ReportKind::Supplier => "report_austin.pdf".to_string(),
            ReportKind::Requester => "report_queimados.pdf".to_string(),
        }
    }

    pub fn order_filename(self, order_id: TransferOrderId) -> String {
        match self {
            ReportKind::Supplier => format!("order_{order_id}.pdf"),
            ReportKind::Requester => format!("order_queimados_{order_id}.pdf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Title(String),
    Heading(String),
    Text(String),
    TableHeader([String; 3]),
    TableRow([String; 3]),
}

/// An element and the baseline it is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub y_mm: f32,
    pub element: Element,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Placed>,
}

struct Cursor {
    pages: Vec<Page>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN_MM
    }

    fn break_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn at_top(&self) -> bool {
        self.y >= PAGE_HEIGHT_MM - MARGIN_MM
    }

    fn place(&mut self, element: Element, height: f32) {
        self.y -= height;
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(Placed {
                y_mm: self.y,
                element,
            });
        }
    }

    fn skip(&mut self, height: f32) {
        self.y -= height;
    }
}

fn table_header() -> Element {
    Element::TableHeader([
        "Product".to_string(),
        "Requested".to_string(),
        "Sent".to_string(),
    ])
}

fn truncate(name: &str) -> String {
    if name.chars().count() <= MAX_PRODUCT_CHARS {
        return name.to_string();
    }
    let mut s: String = name.chars().take(MAX_PRODUCT_CHARS - 3).collect();
    s.push_str("...");
    s
}

/// Lay out a report over as many pages as needed.
///
/// An order's heading block is never split from its table header, and the
/// table header is repeated when rows continue on a new page.
pub fn paginate(
    orders: &[OrderView],
    title: &str,
    operator: OperatorField,
    local: &LocalTime,
) -> Vec<Page> {
    let mut cursor = Cursor::new();
    cursor.place(Element::Title(title.to_string()), TITLE_HEIGHT);

    for order in orders {
        let head = [
            Element::Text(format!("Operator: {}", operator.operator_name(order))),
            Element::Text(format!("Order date: {}", local.format(Some(order.created_at)))),
            Element::Text(format!("Picking started: {}", local.format(order.picking_at))),
            Element::Text(format!("Dispatched: {}", local.format(order.dispatched_at))),
        ];
        let head_height = HEADING_HEIGHT + TEXT_HEIGHT * head.len() as f32 + ROW_HEIGHT;
        if !cursor.fits(head_height) && !cursor.at_top() {
            cursor.break_page();
        }

        cursor.place(Element::Heading(format!("Order #{}", order.order_id)), HEADING_HEIGHT);
        for line in head {
            cursor.place(line, TEXT_HEIGHT);
        }
        cursor.place(table_header(), ROW_HEIGHT);

        for item in &order.items {
            if !cursor.fits(ROW_HEIGHT) {
                cursor.break_page();
                cursor.place(table_header(), ROW_HEIGHT);
            }
            cursor.place(
                Element::TableRow([
                    truncate(&item.product_name),
                    item.qty_requested.to_string(),
                    item.qty_sent.to_string(),
                ]),
                ROW_HEIGHT,
            );
        }

        cursor.skip(SECTION_GAP);
    }

    cursor.pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stocklink_catalog::ProductId;
    use stocklink_core::{Actor, AggregateId, UserId};
    use stocklink_transfers::{Branch, ItemId, OrderLineView, OrderStatus};

    fn order(id: u64, items: u32) -> OrderView {
        OrderView {
            order_id: TransferOrderId(id),
            from_branch: Branch::Queimados,
            to_branch: Branch::Austin,
            status: OrderStatus::Dispatched,
            status_display: OrderStatus::Dispatched.label().to_string(),
            created_by: Actor::new(UserId::new(), "ana"),
            created_at: Utc::now(),
            submitted_at: None,
            picking_at: None,
            picking_by: None,
            dispatched_at: None,
            received_at: None,
            notes_from_austin: String::new(),
            items: (1..=items)
                .map(|n| OrderLineView {
                    item_id: ItemId(n),
                    product_id: ProductId::new(AggregateId::new()),
                    product_name: format!("Product {n}"),
                    qty_requested: n,
                    qty_sent: 0,
                    missing_qty: n,
                    is_fulfilled: false,
                    note: String::new(),
                })
                .collect(),
        }
    }

    fn texts(pages: &[Page]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter_map(|e| match &e.element {
                Element::Text(t) | Element::Heading(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn missing_operator_and_timestamps_render_as_dash() {
        let pages = paginate(
            &[order(4, 1)],
            ReportKind::Supplier.title(),
            ReportKind::Supplier.operator_field(),
            &LocalTime::default(),
        );
        let texts = texts(&pages);
        assert!(texts.contains(&"Order #4".to_string()));
        assert!(texts.contains(&"Operator: -".to_string()));
        assert!(texts.contains(&"Dispatched: -".to_string()));
    }

    #[test]
    fn requester_report_names_the_creator() {
        let pages = paginate(
            &[order(1, 1)],
            "T",
            OperatorField::CreatedBy,
            &LocalTime::default(),
        );
        assert!(texts(&pages).contains(&"Operator: ana".to_string()));
    }

    #[test]
    fn long_tables_continue_on_new_pages_with_header() {
        let pages = paginate(&[order(1, 80)], "T", OperatorField::CreatedBy, &LocalTime::default());
        assert!(pages.len() >= 3);

        for page in &pages[1..] {
            assert!(matches!(page.elements[0].element, Element::TableHeader(_)));
        }
        let rows = pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter(|e| matches!(e.element, Element::TableRow(_)))
            .count();
        assert_eq!(rows, 80);
    }

    #[test]
    fn every_element_stays_inside_the_margins() {
        let orders: Vec<_> = (1..=12).map(|n| order(n, 5)).collect();
        let pages = paginate(&orders, "T", OperatorField::PickingBy, &LocalTime::default());
        for placed in pages.iter().flat_map(|p| p.elements.iter()) {
            assert!(placed.y_mm >= MARGIN_MM);
            assert!(placed.y_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
        }
    }

    #[test]
    fn filenames_follow_branch_patterns() {
        assert_eq!(ReportKind::Supplier.filename(), "report_austin.pdf");
        assert_eq!(ReportKind::Requester.filename(), "report_queimados.pdf");
        assert_eq!(ReportKind::Supplier.order_filename(TransferOrderId(7)), "order_7.pdf");
        assert_eq!(
            ReportKind::Requester.order_filename(TransferOrderId(7)),
            "order_queimados_7.pdf"
        );
    }

    #[test]
    fn long_product_names_are_truncated() {
        let name = "x".repeat(100);
        assert_eq!(truncate(&name).chars().count(), MAX_PRODUCT_CHARS);
    }
}
