// Receipt layout: turns a request into printer directives, no I/O.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::receipt::{LineItem, ReceiptRequest};

/// Printable columns on 58mm paper at the normal character size.
pub const LINE_WIDTH: usize = 32;

/// Item names longer than this are cut before the quantity is appended.
pub const ITEM_NAME_WIDTH: usize = 20;

const SEPARATOR_GLYPH: char = '-';

/// Western Indonesia Time has no daylight saving.
const WIB_OFFSET_HOURS: i64 = 7;

const THANK_YOU_LINES: [&str; 2] = ["Terima Kasih", "Silahkan Datang Kembali"];
const TRAILING_FEED_LINES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Normal,
    Bold,
    Underline,
    BoldUnderline,
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        matches!(self, TextStyle::Bold | TextStyle::BoldUnderline)
    }

    pub fn is_underline(&self) -> bool {
        matches!(self, TextStyle::Underline | TextStyle::BoldUnderline)
    }
}

/// One unit of receipt output. A sequence of these describes a whole
/// receipt; replaying it against any device yields the same paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    SetAlign { align: Align },
    SetStyle { style: TextStyle },
    SetSize { width: u8, height: u8 },
    Text { text: String },
    Feed { lines: u8 },
    Cut,
}

impl RenderCommand {
    pub fn text(s: impl Into<String>) -> Self {
        RenderCommand::Text { text: s.into() }
    }

    pub fn align(align: Align) -> Self {
        RenderCommand::SetAlign { align }
    }

    pub fn style(style: TextStyle) -> Self {
        RenderCommand::SetStyle { style }
    }

    pub fn size(width: u8, height: u8) -> Self {
        RenderCommand::SetSize { width, height }
    }

    pub fn feed(lines: u8) -> Self {
        RenderCommand::Feed { lines }
    }

    /// The literal text carried by this command, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderCommand::Text { text } => Some(text),
            _ => None,
        }
    }
}

pub fn separator() -> String {
    std::iter::repeat(SEPARATOR_GLYPH).take(LINE_WIDTH).collect()
}

/// Render a receipt stamped with the current time.
pub fn render(request: &ReceiptRequest) -> Vec<RenderCommand> {
    render_at(request, Utc::now())
}

/// Render a receipt stamped with `printed_at`.
///
/// Never fails: rows that lack a name, quantity or price are logged and
/// left out, and over-long lines keep a single space before the price.
pub fn render_at(request: &ReceiptRequest, printed_at: DateTime<Utc>) -> Vec<RenderCommand> {
    let mut commands = Vec::with_capacity(24 + request.items.len());

    // Header
    commands.extend([
        RenderCommand::align(Align::Center),
        RenderCommand::style(TextStyle::BoldUnderline),
        RenderCommand::size(2, 2),
        RenderCommand::text(request.store_name.as_str()),
        RenderCommand::size(1, 1),
        RenderCommand::style(TextStyle::Normal),
        RenderCommand::text(separator()),
    ]);

    // Transaction metadata
    commands.push(RenderCommand::align(Align::Left));
    if let Some(transaction_id) = &request.transaction_id {
        commands.push(RenderCommand::text(format!("Transaksi: {}", transaction_id)));
    }
    if let Some(cashier) = &request.cashier {
        commands.push(RenderCommand::text(format!("Kasir: {}", cashier)));
    }
    commands.push(RenderCommand::text(format!(
        "Tanggal: {}",
        format_timestamp(printed_at)
    )));
    commands.push(RenderCommand::text(separator()));

    // Items
    commands.push(RenderCommand::align(Align::Left));
    let mut printed = 0usize;
    for (index, entry) in request.items.iter().enumerate() {
        match entry.line_item() {
            Ok(item) => {
                commands.push(RenderCommand::text(item_line(&item)));
                printed += 1;
            }
            Err(reason) => {
                warn!(index, %reason, item = %entry.raw(), "Skipping invalid item");
            }
        }
    }

    // Footer
    commands.extend([
        RenderCommand::text(separator()),
        RenderCommand::style(TextStyle::BoldUnderline),
        RenderCommand::size(1, 2),
        RenderCommand::text(format!("TOTAL: Rp {}", request.total)),
        RenderCommand::size(1, 1),
        RenderCommand::style(TextStyle::Normal),
        RenderCommand::text(separator()),
        RenderCommand::align(Align::Center),
    ]);
    commands.extend(THANK_YOU_LINES.iter().map(|line| RenderCommand::text(*line)));
    commands.push(RenderCommand::feed(TRAILING_FEED_LINES));
    commands.push(RenderCommand::Cut);

    debug!(
        items = request.items.len(),
        printed,
        commands = commands.len(),
        "Receipt rendered"
    );
    commands
}

/// `"<name> x<qty>"` padded so the price ends on the last column, with at
/// least one space before the price when the line is too long to fit.
pub fn item_line(item: &LineItem) -> String {
    let name: String = item.name.chars().take(ITEM_NAME_WIDTH).collect();
    let prefix = format!("{} x{}", name, item.quantity);
    let price = item.unit_price.to_string();

    let used = prefix.chars().count() + price.chars().count();
    let padding = LINE_WIDTH.saturating_sub(used).max(1);

    format!("{}{}{}", prefix, " ".repeat(padding), price)
}

/// Printing time in Western Indonesia Time, shaped like the id-ID locale.
pub fn format_timestamp(printed_at: DateTime<Utc>) -> String {
    let local = printed_at.naive_utc() + Duration::hours(WIB_OFFSET_HOURS);
    local.format("%d/%m/%Y, %H.%M.%S").to_string()
}

/// Fixed receipt used by the test-print route: no items, zero total.
pub fn test_page() -> ReceiptRequest {
    ReceiptRequest::new(Vec::new(), "0").with_store_name("TEST PRINT")
}
