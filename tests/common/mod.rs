#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use intimation_desk::api::{ApiError, Transport, TransportResponse};
use intimation_desk::data::{CellValue, Row};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

pub const BASE: &str = "http://api.test/api/";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Transport that replays queued responses and records every request.
#[derive(Default)]
pub struct RecordingTransport {
    responses: RefCell<VecDeque<TransportResponse>>,
    calls: RefCell<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.responses
            .borrow_mut()
            .push_back(TransportResponse { status, body });
        self
    }

    pub fn push(&self, status: u16, body: Value) {
        self.responses
            .borrow_mut()
            .push_back(TransportResponse { status, body });
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.borrow().clone()
    }

    /// Request paths relative to [`BASE`].
    pub fn paths(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(url, _)| url.trim_start_matches(BASE).to_string())
            .collect()
    }

    pub fn last_body(&self) -> Value {
        self.calls
            .borrow()
            .last()
            .map(|(_, body)| body.clone())
            .expect("at least one request")
    }
}

impl Transport for RecordingTransport {
    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, ApiError> {
        self.calls
            .borrow_mut()
            .push((url.to_string(), body.clone()));
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(TransportResponse {
                status: 500,
                body: json!({ "error": "no response queued" }),
            }))
    }
}

pub const FIRST_INTIMATION_KEYS: [&str; 21] = [
    "OrderBookingDetailsID",
    "JobCardNo",
    "JobName",
    "ClientName",
    "ConcernPerson",
    "ConcernMobileNo",
    "OrderQty",
    "OrderDate",
    "FinalDeliveryDate",
    "ProductCode",
    "Remarks",
    "Salesman",
    "Plant",
    "Status",
    "NoOfCarton",
    "QtyPerCarton",
    "LedgerID",
    "CompanyID",
    "UserID",
    "BranchID",
    "DispatchScheduleID",
];

pub const SECOND_INTIMATION_KEYS: [&str; 15] = [
    "OrderBookingDetailsID",
    "JobCardNo",
    "JobName",
    "ClientName",
    "ConcernMobileNo",
    "OrderDate",
    "ReadyForDispatchDate",
    "NoOfCarton",
    "QtyPerCarton",
    "FinalDeliveryDate",
    "LedgerID",
    "CompanyID",
    "UserID",
    "BranchID",
    "DispatchScheduleID",
];

pub fn first_intimation_row(id: i64, client: &str, job: &str) -> Row {
    Row::from_pairs(FIRST_INTIMATION_KEYS.iter().map(|key| {
        let value = match *key {
            "OrderBookingDetailsID" => CellValue::from(id),
            "JobCardNo" => CellValue::from(format!("JC-{id}")),
            "JobName" => CellValue::from(job),
            "ClientName" => CellValue::from(client),
            "ConcernMobileNo" => CellValue::from("9800000000"),
            "OrderDate" => CellValue::from("2024-11-30T00:00:00.000Z"),
            "FinalDeliveryDate" => CellValue::from("2024-12-25T00:00:00.000Z"),
            "NoOfCarton" | "QtyPerCarton" => CellValue::Null,
            "DispatchScheduleID" => CellValue::from(id * 10),
            _ => CellValue::from("x"),
        };
        (*key, value)
    }))
}

pub fn second_intimation_row(id: i64, client: &str, job: &str) -> Row {
    Row::from_pairs(SECOND_INTIMATION_KEYS.iter().map(|key| {
        let value = match *key {
            "OrderBookingDetailsID" => CellValue::from(id),
            "JobCardNo" => CellValue::from(format!("JC-{id}")),
            "JobName" => CellValue::from(job),
            "ClientName" => CellValue::from(client),
            "ConcernMobileNo" => CellValue::from("9800000000"),
            "OrderDate" => CellValue::from("2024-11-30"),
            "FinalDeliveryDate" => CellValue::from("2024-12-25"),
            "ReadyForDispatchDate" | "NoOfCarton" | "QtyPerCarton" => CellValue::Null,
            _ => CellValue::from(1i64),
        };
        (*key, value)
    }))
}

pub fn first_intimation_rows() -> Vec<Row> {
    vec![
        first_intimation_row(101, "Acme Corp", "Folding cartons"),
        first_intimation_row(102, "Globex", "Labels"),
        first_intimation_row(103, "acme traders", "Sleeves"),
    ]
}

pub fn second_intimation_rows() -> Vec<Row> {
    vec![
        second_intimation_row(201, "Acme Corp", "Folding cartons"),
        second_intimation_row(202, "Globex", "Labels"),
        second_intimation_row(203, "Initech", "Sleeves"),
    ]
}

pub fn pending_body(rows: &[Row]) -> Value {
    json!({ "username": "ops", "pendingData": rows })
}
