//! Client for the upstream intimation API.
//!
//! Every endpoint is a JSON `POST` under the configured base URL. A non-2xx
//! reply is a failure whose message comes from the body's `error` or
//! `message` field. Requests are not retried.
//!
//! The HTTP layer sits behind [`Transport`] so the session logic can be
//! driven without a live server.

use chrono::{Days, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    data::{CellValue, Row},
    dates,
};

pub const LOGIN_PATH: &str = "whatsapp/login";
pub const SECOND_INTIMATION_PATH: &str = "whatsapp/second-intimation";
pub const FIRST_INTIMATION_SEND_PATH: &str = "comm/first-intimation/send";
pub const MATERIAL_READINESS_SEND_PATH: &str = "comm/material-readiness/send";
pub const UPDATE_DELIVERY_DATE_PATH: &str = "whatsapp/update-delivery-date";

/// Days covered by the second-intimation window, ending today.
pub const SECOND_INTIMATION_WINDOW_DAYS: u64 = 14;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Status and parsed body of one HTTP exchange. Bodies that are not JSON
/// arrive as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, ApiError> {
        (**self).post_json(url, body)
    }
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, ApiError> {
        let transport_error = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(transport_error)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    /// `DD-MM-YYYY to DD-MM-YYYY` for headers.
    pub fn describe(&self) -> String {
        format!(
            "{} to {}",
            dates::text_to_display(&self.start_date),
            dates::text_to_display(&self.end_date)
        )
    }
}

/// The second-intimation query window: the last fourteen days up to `today`.
pub fn second_intimation_window(today: NaiveDate) -> DateRange {
    let start = today - Days::new(SECOND_INTIMATION_WINDOW_DAYS);
    DateRange {
        start_date: dates::format_canonical(start),
        end_date: dates::format_canonical(today),
    }
}

/// Rows returned by a pending-data fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBatch {
    pub rows: Vec<Row>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingResponse {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    pending_data: Option<Vec<Row>>,
    #[serde(default)]
    date_range: Option<DateRange>,
}

/// One entry of a material-readiness send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessItem {
    pub order_booking_details_id: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_for_dispatch_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_carton: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty_per_carton: Option<u32>,
}

/// Per-job outcome reported by a first-intimation send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendResult {
    pub job_card_no: CellValue,
    pub order_qty: CellValue,
    pub client_name: CellValue,
    pub job_name: CellValue,
    pub final_delivery_date: CellValue,
    pub contact_person: CellValue,
    pub mail_sent: CellValue,
    pub whatsapp_sent: CellValue,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    results: Option<Vec<SendResult>>,
}

/// Message for a failed call: the body's `error`, then `message`, then the
/// caller's default.
pub fn failure_message(body: &Value, default: &str) -> String {
    ["error", "message"]
        .iter()
        .filter_map(|field| body.get(field))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub struct ApiClient<T = HttpTransport> {
    transport: T,
    base: String,
}

impl ApiClient<HttpTransport> {
    pub fn connect(base: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::new(HttpTransport::new()?, base))
    }
}

impl<T: Transport> ApiClient<T> {
    /// `base` is used as a prefix; it should end with a slash.
    pub fn new(transport: T, base: impl Into<String>) -> Self {
        Self {
            transport,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Signs in and returns the first-intimation pending rows.
    pub fn login(&self, username: &str) -> Result<PendingBatch, ApiError> {
        self.fetch(LOGIN_PATH, json!({ "username": username }), "Login failed")
    }

    pub fn fetch_first_intimation(&self, username: &str) -> Result<PendingBatch, ApiError> {
        self.fetch(
            LOGIN_PATH,
            json!({ "username": username }),
            "Failed to fetch data",
        )
    }

    /// Fetches second-intimation rows for `window`. The batch reports the
    /// requested window as its date range.
    pub fn fetch_second_intimation(
        &self,
        username: &str,
        window: &DateRange,
    ) -> Result<PendingBatch, ApiError> {
        let mut batch = self.fetch(
            SECOND_INTIMATION_PATH,
            json!({
                "username": username,
                "startDate": window.start_date,
                "endDate": window.end_date,
            }),
            "Failed to fetch 2nd intimation data",
        )?;
        batch.date_range = Some(window.clone());
        Ok(batch)
    }

    pub fn send_first_intimation(
        &self,
        username: &str,
        order_ids: &[i64],
    ) -> Result<Option<Vec<SendResult>>, ApiError> {
        let response: SendResponse = self.call(
            FIRST_INTIMATION_SEND_PATH,
            json!({ "username": username, "orderBookingDetailsIds": order_ids }),
            "Failed to send messages",
        )?;
        info!(
            "First intimation sent for {} order(s); {} result row(s)",
            order_ids.len(),
            response.results.as_ref().map_or(0, Vec::len)
        );
        Ok(response.results)
    }

    pub fn send_material_readiness(
        &self,
        username: &str,
        items: &[ReadinessItem],
    ) -> Result<(), ApiError> {
        let _: Value = self.call(
            MATERIAL_READINESS_SEND_PATH,
            json!({ "username": username, "items": items }),
            "Failed to send material readiness data",
        )?;
        info!("Material readiness sent for {} item(s)", items.len());
        Ok(())
    }

    /// Persists a new expected delivery date (`YYYY-MM-DD`) for one order.
    pub fn update_delivery_date(
        &self,
        username: &str,
        order_id: i64,
        date: &str,
    ) -> Result<(), ApiError> {
        let _: Value = self.call(
            UPDATE_DELIVERY_DATE_PATH,
            json!({
                "username": username,
                "orderBookingDetailsID": order_id,
                "newExpectedDeliveryDate": date,
            }),
            "Failed to update delivery date",
        )?;
        info!("Expected delivery date of order {order_id} set to {date}");
        Ok(())
    }

    fn fetch(&self, path: &str, body: Value, default: &str) -> Result<PendingBatch, ApiError> {
        let response: PendingResponse = self.call(path, body, default)?;
        let rows = response.pending_data.unwrap_or_default();
        info!(
            "Fetched {} pending row(s) from {path} for {}",
            rows.len(),
            response.username.as_deref().unwrap_or("current user")
        );
        Ok(PendingBatch {
            rows,
            date_range: response.date_range,
        })
    }

    fn call<R: DeserializeOwned>(&self, path: &str, body: Value, default: &str) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base, path);
        debug!("POST {url} {body}");
        let response = self.transport.post_json(&url, &body)?;
        debug!("{url} answered {}", response.status);
        if !response.is_success() {
            return Err(ApiError::Rejected {
                status: response.status,
                message: failure_message(&response.body, default),
            });
        }
        let payload = match response.body {
            Value::Null => json!({}),
            other => other,
        };
        serde_json::from_value(payload).map_err(|source| ApiError::Decode { url, source })
    }
}
