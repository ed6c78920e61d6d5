//! Plain-text rendering of the pending-jobs view and of send results.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    api::SendResult,
    columns::{ColumnName, ColumnRole},
    data::{CellValue, Row, RowId},
    dates,
    session::Session,
};

/// Job and client names longer than this are cut with an ellipsis.
pub const NAME_COLUMN_WIDTH: usize = 32;

const SELECTED_MARK: &str = "[x]";
const UNSELECTED_MARK: &str = "[ ]";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }
    let widths = widths.into_iter().map(|w| w.max(1)).collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let rule = rule_widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &rule_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

/// Renders the session's filtered view with a selection column and the row
/// identifier used by `select`, `edit` and `date`.
pub fn render_view(session: &Session) -> String {
    let names = session
        .columns()
        .iter()
        .map(|key| ColumnName::new(key))
        .collect::<Vec<_>>();
    let truncated = [ColumnRole::JobName, ColumnRole::ClientName]
        .into_iter()
        .filter_map(|role| session.roles().get(role))
        .collect::<Vec<_>>();

    let mut headers = vec!["Select".to_string(), "Row".to_string()];
    headers.extend(names.iter().map(|name| name.display.clone()));

    let rows = session
        .visible()
        .map(|(id, row)| {
            let mark = if session.selection().has(&id) {
                SELECTED_MARK
            } else {
                UNSELECTED_MARK
            };
            let mut cells = vec![mark.to_string(), id.to_string()];
            cells.extend(names.iter().enumerate().map(|(idx, name)| {
                let text = view_cell(row, name);
                if truncated.contains(&idx) {
                    truncate(&text, NAME_COLUMN_WIDTH)
                } else {
                    text
                }
            }));
            cells
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

fn view_cell(row: &Row, name: &ColumnName) -> String {
    let value = row.get(&name.key).unwrap_or(&CellValue::Null);
    if !name.is_internal_id() && name.is_date_like() {
        dates::to_display(value)
    } else {
        value.as_text().unwrap_or_default()
    }
}

pub const RESULT_HEADERS: [&str; 8] = [
    "Job Card No",
    "Order Qty",
    "Client Name",
    "Job Name",
    "Final Delivery Date",
    "Contact Person",
    "Mail Sent",
    "WhatsApp Sent",
];

/// Per-job outcome table shown after a first-intimation send.
pub fn render_results(results: &[SendResult]) -> String {
    let headers = RESULT_HEADERS.map(str::to_string);
    let rows = results
        .iter()
        .map(|result| {
            vec![
                text_or(&result.job_card_no, ""),
                text_or(&result.order_qty, ""),
                text_or(&result.client_name, ""),
                text_or(&result.job_name, ""),
                dates::to_display(&result.final_delivery_date),
                text_or(&result.contact_person, ""),
                text_or(&result.mail_sent, "No"),
                text_or(&result.whatsapp_sent, "No"),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

fn text_or(value: &CellValue, fallback: &str) -> String {
    value
        .as_text()
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Short label for a row in prompts and messages.
pub fn row_label(session: &Session, id: &RowId) -> String {
    let job = session
        .role_column(ColumnRole::JobName)
        .zip(session.store().find_visible(id))
        .and_then(|(column, row)| row.get(column))
        .and_then(CellValue::as_text);
    match job {
        Some(job) => format!("{id} ({})", truncate(&job, NAME_COLUMN_WIDTH)),
        None => id.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut = text.chars().take(max.saturating_sub(1)).collect::<String>();
    cut.push('…');
    cut
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = flatten_whitespace(value);
            let pad = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

// ANSI colour sequences take no room on screen.
fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            chars.by_ref().find(|next| *next == 'm');
        } else {
            width += 1;
        }
    }
    width
}

fn flatten_whitespace(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("Acme", 8), "Acme");
        assert_eq!(truncate("Cartons for Acme Ltd", 8), "Cartons…");
    }

    #[test]
    fn display_width_skips_escape_sequences() {
        assert_eq!(display_width("\u{1b}[31mERR\u{1b}[0m"), 3);
    }
}
