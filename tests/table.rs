mod common;

use common::{first_intimation_row, first_intimation_rows};
use intimation_desk::api::{PendingBatch, SendResult};
use intimation_desk::data::{CellValue, RowId};
use intimation_desk::session::{IntimationKind, Session, SessionOptions};
use intimation_desk::table::{RESULT_HEADERS, render_results, render_table, render_view, row_label};

fn session_with(rows: Vec<intimation_desk::data::Row>) -> Session {
    let mut session = Session::new("ops", IntimationKind::First, SessionOptions::default());
    session.load(PendingBatch {
        rows,
        date_range: None,
    });
    session
}

#[test]
fn render_table_aligns_columns() {
    let headers = vec!["id".to_string(), "client".to_string()];
    let rows = vec![
        vec!["101".to_string(), "Acme".to_string()],
        vec!["7".to_string(), "Globex".to_string()],
    ];
    let rendered = render_table(&headers, &rows);
    let lines = rendered.lines().collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec!["id   client", "---  ------", "101  Acme", "7    Globex"]
    );
}

#[test]
fn render_table_flattens_control_characters() {
    let headers = vec!["remarks".to_string()];
    let rows = vec![vec!["handle\nwith\tcare".to_string()]];
    let rendered = render_table(&headers, &rows);
    assert_eq!(rendered.lines().nth(2), Some("handle with care"));
}

#[test]
fn view_marks_selection_and_formats_dates() {
    let mut session = session_with(first_intimation_rows());
    session.select(RowId::Order("102".into()));
    let rendered = render_view(&session);
    let lines = rendered.lines().collect::<Vec<_>>();

    assert!(lines[0].starts_with("Select  Row  Order Booking Details I D"));
    assert!(lines[0].contains("Final Delivery Date"));
    assert!(!lines[0].contains("Dispatch Schedule"));
    assert_eq!(lines.len(), 5);
    assert!(lines[2].starts_with("[ ]"));
    assert!(lines[3].starts_with("[x]     102"));
    assert!(lines[3].contains("25-12-2024"));
    assert!(lines[3].contains("30-11-2024"));
    assert!(!lines[3].contains("T00:00"));
}

#[test]
fn view_truncates_long_job_names() {
    let long_job = "Printed folding cartons with window patching and foil";
    let session = session_with(vec![first_intimation_row(7, "Acme", long_job)]);
    let rendered = render_view(&session);
    assert!(!rendered.contains(long_job));
    assert!(rendered.contains("Printed folding cartons with wi…"));
    assert_eq!(
        row_label(&session, &RowId::Order("7".into())),
        "7 (Printed folding cartons with wi…)"
    );
}

#[test]
fn positional_rows_are_labelled_by_view_index() {
    let mut row = first_intimation_row(1, "Acme", "Labels");
    row.set("OrderBookingDetailsID", CellValue::Null);
    let session = session_with(vec![row]);
    let rendered = render_view(&session);
    assert!(rendered.lines().nth(2).unwrap().starts_with("[ ]     row-0"));
}

#[test]
fn results_default_delivery_flags_to_no() {
    let results = vec![SendResult {
        job_card_no: CellValue::from("JC-1"),
        order_qty: CellValue::from(500i64),
        client_name: CellValue::from("Acme"),
        job_name: CellValue::from("Labels"),
        final_delivery_date: CellValue::from("2024-12-25T00:00:00.000Z"),
        contact_person: CellValue::from("R. Shah"),
        mail_sent: CellValue::from("Yes"),
        whatsapp_sent: CellValue::Null,
    }];
    let rendered = render_results(&results);
    let lines = rendered.lines().collect::<Vec<_>>();
    assert!(lines[0].starts_with(RESULT_HEADERS[0]));
    assert!(lines[0].ends_with("WhatsApp Sent"));
    assert!(lines[2].contains("25-12-2024"));
    assert!(lines[2].contains("Yes"));
    assert!(lines[2].ends_with("No"));
}
