mod common;

use common::{BASE, RecordingTransport, first_intimation_rows, pending_body};
use intimation_desk::api::{ApiClient, ApiError, ReadinessItem, failure_message};
use serde_json::{Value, json};

#[test]
fn error_field_wins_over_message() {
    let transport = RecordingTransport::new()
        .respond(401, json!({ "error": "Unknown user", "message": "ignored" }));
    let api = ApiClient::new(&transport, BASE);
    let err = api.login("nobody").unwrap_err();
    assert_eq!(err.to_string(), "Unknown user");
    assert!(matches!(err, ApiError::Rejected { status: 401, .. }));
}

#[test]
fn message_field_is_used_when_error_is_absent() {
    let transport =
        RecordingTransport::new().respond(500, json!({ "message": "Database offline" }));
    let api = ApiClient::new(&transport, BASE);
    let err = api.fetch_first_intimation("ops").unwrap_err();
    assert_eq!(err.to_string(), "Database offline");
}

#[test]
fn each_call_has_its_own_default_message() {
    let transport = RecordingTransport::new()
        .respond(500, Value::Null)
        .respond(502, Value::String("<html>Bad gateway</html>".into()))
        .respond(500, json!({}))
        .respond(500, json!({ "error": "" }))
        .respond(500, json!([]));
    let api = ApiClient::new(&transport, BASE);
    assert_eq!(api.login("ops").unwrap_err().to_string(), "Login failed");
    assert_eq!(
        api.fetch_first_intimation("ops").unwrap_err().to_string(),
        "Failed to fetch data"
    );
    assert_eq!(
        api.send_first_intimation("ops", &[1]).unwrap_err().to_string(),
        "Failed to send messages"
    );
    assert_eq!(
        api.send_material_readiness("ops", &[]).unwrap_err().to_string(),
        "Failed to send material readiness data"
    );
    assert_eq!(
        api.update_delivery_date("ops", 1, "2024-12-25")
            .unwrap_err()
            .to_string(),
        "Failed to update delivery date"
    );
}

#[test]
fn failure_message_ignores_non_string_fields() {
    assert_eq!(failure_message(&json!({ "error": 42 }), "d"), "d");
    assert_eq!(
        failure_message(&json!({ "error": 42, "message": "m" }), "d"),
        "m"
    );
}

#[test]
fn login_returns_rows_in_feed_order() {
    let rows = first_intimation_rows();
    let transport = RecordingTransport::new().respond(200, pending_body(&rows));
    let api = ApiClient::new(&transport, BASE);
    let batch = api.login("ops").unwrap();
    assert_eq!(batch.rows, rows);
    assert_eq!(
        batch.rows[0].keys().next(),
        Some("OrderBookingDetailsID")
    );
    assert_eq!(transport.calls()[0].0, format!("{BASE}whatsapp/login"));
}

#[test]
fn missing_pending_data_is_an_empty_batch() {
    let transport = RecordingTransport::new().respond(200, json!({ "username": "ops" }));
    let api = ApiClient::new(&transport, BASE);
    assert!(api.login("ops").unwrap().rows.is_empty());
}

#[test]
fn nested_cells_are_rejected_at_decode_time() {
    let transport = RecordingTransport::new()
        .respond(200, json!({ "pendingData": [{ "A": { "nested": true } }] }));
    let api = ApiClient::new(&transport, BASE);
    assert!(matches!(
        api.login("ops").unwrap_err(),
        ApiError::Decode { .. }
    ));
}

#[test]
fn material_readiness_body_wraps_items() {
    let transport = RecordingTransport::new().respond(200, json!({ "success": true }));
    let api = ApiClient::new(&transport, BASE);
    let items = vec![ReadinessItem {
        order_booking_details_id: vec![9],
        ready_for_dispatch_date: Some("2024-12-25".into()),
        no_of_carton: None,
        qty_per_carton: Some(10),
    }];
    api.send_material_readiness("ops", &items).unwrap();
    assert_eq!(
        transport.last_body(),
        json!({
            "username": "ops",
            "items": [{
                "orderBookingDetailsId": [9],
                "readyForDispatchDate": "2024-12-25",
                "qtyPerCarton": 10
            }]
        })
    );
}

#[test]
fn send_without_results_is_not_an_error() {
    let transport = RecordingTransport::new().respond(200, Value::Null);
    let api = ApiClient::new(&transport, BASE);
    assert_eq!(api.send_first_intimation("ops", &[5, 6]).unwrap(), None);
}
