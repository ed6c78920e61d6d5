//! The pending-jobs session: one owner for the dataset, its filtered view,
//! column roles, selection and edits.
//!
//! ## Lifecycle
//!
//! Every successful fetch replaces the dataset wholesale and clears filters,
//! selection and edits. Fetches are sequenced with [`FetchTicket`]s so a
//! response that arrives after a newer request was issued is dropped rather
//! than overwriting fresher state.
//!
//! ## Edits
//!
//! For second intimations the readiness date, carton count and quantity per
//! carton are tracked per row and sent as a sparse payload. For first
//! intimations the carton columns sit at fixed positions and edits only
//! change the local copy.

use chrono::NaiveDate;
use clap::ValueEnum;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    api::{self, ApiClient, ApiError, DateRange, PendingBatch, ReadinessItem, SendResult, Transport},
    columns::{self, ColumnRole, ColumnRoles, EditableColumns},
    data::{CellValue, Row, RowId},
    dates,
    edits::{EditField, EditTracker, FieldEdit, RowEdits},
    rows::RowStore,
    selection::SelectionTracker,
};

pub const DEFAULT_HIDDEN_TRAILING: usize = 5;

/// Zero-based positions of the editable count columns in first-intimation feeds.
pub const FIRST_INTIMATION_CARTON_COLUMN: usize = 14;
pub const FIRST_INTIMATION_QTY_COLUMN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IntimationKind {
    /// Initial delivery notice
    #[default]
    First,
    /// Material readiness notice
    Second,
}

impl IntimationKind {
    pub fn editable_columns(self) -> EditableColumns {
        match self {
            IntimationKind::First => EditableColumns::Positional {
                carton_count: FIRST_INTIMATION_CARTON_COLUMN,
                qty_per_carton: FIRST_INTIMATION_QTY_COLUMN,
            },
            IntimationKind::Second => EditableColumns::Heuristic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntimationKind::First => "1st intimation",
            IntimationKind::Second => "2nd intimation",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Messages were sent but refreshing pending jobs failed: {0}")]
    Refresh(#[source] ApiError),
    #[error("Invalid date format. Please use DD-MM-YYYY format (e.g., 25-12-2024)")]
    InvalidDate(String),
    #[error("Please enter a valid whole number (0 or positive integer)")]
    InvalidCount(String),
    #[error("OrderBookingDetailsID not found")]
    MissingOrderId,
    #[error("Row {0} is not in the current view")]
    UnknownRow(RowId),
    #[error("This dataset has no {0} column")]
    ColumnUnavailable(ColumnRole),
    #[error("Please select at least one row to send messages.")]
    EmptySelection,
    #[error(
        "No rows with edited values selected. Please edit at least one field (Readiness Date, Number of Cartons, or Qty Per Carton) before sending."
    )]
    EmptyPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Trailing feed columns that are never displayed.
    pub hidden_trailing: usize,
    /// Column count the feed is expected to have; a mismatch is reported as drift.
    pub expected_columns: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            hidden_trailing: DEFAULT_HIDDEN_TRAILING,
            expected_columns: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDrift {
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub visible_columns: usize,
    /// Rows whose column count differs from the first row's.
    pub ragged_rows: usize,
    pub drift: Option<SchemaDrift>,
}

/// Marks a fetch request; only the most recent ticket may load its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    kind: IntimationKind,
}

impl FetchTicket {
    pub fn kind(&self) -> IntimationKind {
        self.kind
    }
}

/// What a local edit changed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// A value was accepted; `tracked` is false for local-only edits.
    Set { value: CellValue, tracked: bool },
    /// Empty input reverted the field to "not edited".
    Cleared,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    FirstIntimation {
        sent: usize,
        results: Option<Vec<SendResult>>,
        refreshed: LoadReport,
    },
    MaterialReadiness {
        items: usize,
        refreshed: LoadReport,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    kind: IntimationKind,
    options: SessionOptions,
    store: RowStore,
    columns: Vec<String>,
    roles: ColumnRoles,
    selection: SelectionTracker,
    edits: EditTracker,
    date_range: Option<DateRange>,
    generation: u64,
}

impl Session {
    pub fn new(username: impl Into<String>, kind: IntimationKind, options: SessionOptions) -> Self {
        Self {
            username: username.into(),
            kind,
            options,
            store: RowStore::new(),
            columns: Vec::new(),
            roles: ColumnRoles::default(),
            selection: SelectionTracker::new(),
            edits: EditTracker::new(),
            date_range: None,
            generation: 0,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn kind(&self) -> IntimationKind {
        self.kind
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    /// Visible column keys, trailing technical columns removed.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub fn role_column(&self, role: ColumnRole) -> Option<&str> {
        self.roles
            .get(role)
            .and_then(|idx| self.columns.get(idx))
            .map(String::as_str)
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn edits(&self) -> &EditTracker {
        &self.edits
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    /// Switches the intimation kind. The caller refreshes afterwards; the
    /// current rows were fetched for the previous kind.
    pub fn set_kind(&mut self, kind: IntimationKind) -> bool {
        if self.kind == kind {
            return false;
        }
        self.kind = kind;
        true
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            kind: self.kind,
        }
    }

    /// Loads a fetched batch unless a newer fetch has been issued since the
    /// ticket was taken.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, batch: PendingBatch) -> Option<LoadReport> {
        if ticket.generation != self.generation || ticket.kind != self.kind {
            debug!(
                "Dropping stale fetch #{} ({}); latest is #{} ({})",
                ticket.generation,
                ticket.kind.label(),
                self.generation,
                self.kind.label()
            );
            return None;
        }
        Some(self.load(batch))
    }

    /// Replaces the dataset and recomputes column roles. Filters, selection
    /// and edits are cleared.
    pub fn load(&mut self, batch: PendingBatch) -> LoadReport {
        let PendingBatch { rows, date_range } = batch;
        let all_keys = rows
            .first()
            .map(|row| row.keys().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        let ragged_rows = rows
            .iter()
            .skip(1)
            .filter(|row| row.len() != all_keys.len())
            .count();
        if ragged_rows > 0 {
            warn!(
                "{ragged_rows} row(s) do not share the first row's {} column(s)",
                all_keys.len()
            );
        }

        let drift = self
            .options
            .expected_columns
            .filter(|expected| !rows.is_empty() && *expected != all_keys.len())
            .map(|expected| SchemaDrift {
                expected,
                found: all_keys.len(),
            });
        if let Some(drift) = drift {
            warn!(
                "Feed has {} column(s) but {} were expected; the last {} are still hidden",
                drift.found, drift.expected, self.options.hidden_trailing
            );
        }

        // An empty batch keeps the previous headers, as the table stays on screen.
        if !rows.is_empty() {
            self.columns = columns::visible_columns(&all_keys, self.options.hidden_trailing);
            self.roles = columns::classify(&self.columns, self.kind.editable_columns());
        }
        self.store.load(rows);
        self.selection.clear();
        self.edits.clear();
        self.date_range = date_range;

        info!(
            "Loaded {} pending row(s) for {} ({} visible column(s))",
            self.store.len(),
            self.kind.label(),
            self.columns.len()
        );
        LoadReport {
            rows: self.store.len(),
            visible_columns: self.columns.len(),
            ragged_rows,
            drift,
        }
    }

    pub fn set_filter(&mut self, column: &str, text: &str) {
        self.store.set_filter(column, text);
    }

    pub fn apply_filters(&mut self) {
        self.store.apply_filters();
    }

    /// Sets several filters and recomputes the view once.
    pub fn filter_by<'a, I>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (column, text) in filters {
            self.store.set_filter(column, text);
        }
        self.store.apply_filters();
    }

    pub fn clear_filters(&mut self) {
        self.store.clear_filters();
        self.store.apply_filters();
    }

    pub fn view_ids(&self) -> Vec<RowId> {
        self.store.view_ids()
    }

    pub fn visible(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.store.visible()
    }

    pub fn select(&mut self, id: RowId) -> bool {
        self.selection.add(id)
    }

    pub fn deselect(&mut self, id: &RowId) -> bool {
        self.selection.remove(id)
    }

    pub fn toggle(&mut self, id: RowId) -> bool {
        self.selection.toggle(id)
    }

    /// Selects every visible row and returns the selection size.
    pub fn select_all_visible(&mut self) -> usize {
        self.selection.select_all(self.store.view_ids());
        self.selection.size()
    }

    pub fn deselect_all(&mut self) {
        self.selection.deselect_all();
    }

    /// Label of the combined select/deselect control: it deselects once more
    /// than one row is selected.
    pub fn select_all_label(&self) -> &'static str {
        if self.selection.size() > 1 {
            "Deselect All"
        } else {
            "Select All"
        }
    }

    /// Applies the combined control; returns the selection size afterwards.
    pub fn press_select_all(&mut self) -> usize {
        if self.selection.size() > 1 {
            self.deselect_all();
            0
        } else {
            self.select_all_visible()
        }
    }

    /// Numeric order identifiers of selected rows, in view order.
    pub fn selected_order_ids(&self) -> Vec<i64> {
        self.store
            .visible()
            .filter(|(id, _)| self.selection.has(id))
            .filter_map(|(_, row)| row.order_booking_id().and_then(CellValue::as_i64))
            .collect()
    }

    /// Selected visible identifiers in view order.
    fn selected_view_ids(&self) -> Vec<RowId> {
        self.store
            .view_ids()
            .into_iter()
            .filter(|id| self.selection.has(id))
            .collect()
    }

    pub fn confirmation_prompt(&self) -> Result<String, SessionError> {
        let count = self.selected_order_ids().len();
        if count == 0 {
            return Err(SessionError::EmptySelection);
        }
        Ok(format!(
            "Are you sure you want to send WhatsApp messages to {count} selected item{}?",
            if count > 1 { "s" } else { "" }
        ))
    }

    pub fn row_edits(&self, id: &RowId) -> Option<&RowEdits> {
        self.edits.get(id)
    }

    /// Applies user input to an editable column of a visible row.
    ///
    /// Empty input reverts the field: it is marked "not edited" and the local
    /// cell becomes null. Invalid input is rejected and nothing changes.
    pub fn edit(
        &mut self,
        id: &RowId,
        field: EditField,
        input: &str,
    ) -> Result<EditOutcome, SessionError> {
        let role = match field {
            EditField::ReadyForDispatchDate => ColumnRole::ReadinessDate,
            EditField::NoOfCarton => ColumnRole::CartonCount,
            EditField::QtyPerCarton => ColumnRole::QtyPerCarton,
        };
        let column = self
            .role_column(role)
            .map(str::to_string)
            .ok_or(SessionError::ColumnUnavailable(role))?;
        let row = self
            .store
            .find_visible(id)
            .ok_or_else(|| SessionError::UnknownRow(id.clone()))?;
        let order_id = row
            .order_booking_id()
            .and_then(CellValue::as_text)
            .map(|text| RowId::Order(text.trim().to_string()))
            .ok_or(SessionError::MissingOrderId)?;
        let tracked = self.kind == IntimationKind::Second;

        let trimmed = input.trim();
        if trimmed.is_empty() {
            if tracked {
                self.edits.clear_field(&order_id, field);
            }
            self.store.update_cell(&order_id, &column, CellValue::Null);
            return Ok(EditOutcome::Cleared);
        }

        let edit = match field {
            EditField::ReadyForDispatchDate => {
                let date = dates::to_canonical(trimmed)
                    .ok_or_else(|| SessionError::InvalidDate(trimmed.to_string()))?;
                FieldEdit::ReadyForDispatchDate(date)
            }
            EditField::NoOfCarton => FieldEdit::NoOfCarton(parse_count(trimmed)?),
            EditField::QtyPerCarton => FieldEdit::QtyPerCarton(parse_count(trimmed)?),
        };
        let value = match &edit {
            FieldEdit::ReadyForDispatchDate(date) => CellValue::from(date.as_str()),
            FieldEdit::NoOfCarton(count) | FieldEdit::QtyPerCarton(count) => {
                CellValue::from(*count)
            }
        };
        if tracked {
            self.edits.set_field(order_id.clone(), edit);
        }
        self.store.update_cell(&order_id, &column, value.clone());
        debug!("Row {order_id}: {field} set to {value} (tracked: {tracked})");
        Ok(EditOutcome::Set { value, tracked })
    }

    /// Sparse material-readiness payload for the selected visible rows.
    pub fn readiness_payload(&self) -> Result<Vec<ReadinessItem>, SessionError> {
        if self.selected_order_ids().is_empty() {
            return Err(SessionError::EmptySelection);
        }
        let selected = self.selected_view_ids();
        let items = self.edits.build_payload(selected.iter());
        if items.is_empty() {
            return Err(SessionError::EmptyPayload);
        }
        Ok(items)
    }

    /// Fetches pending rows for the current kind and loads them.
    pub fn refresh<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        today: NaiveDate,
    ) -> Result<LoadReport, ApiError> {
        let ticket = self.begin_fetch();
        let batch = match ticket.kind() {
            IntimationKind::First => api.fetch_first_intimation(&self.username)?,
            IntimationKind::Second => {
                let window = api::second_intimation_window(today);
                api.fetch_second_intimation(&self.username, &window)?
            }
        };
        // Sequential callers always hold the latest ticket.
        Ok(self
            .apply_fetch(ticket, batch)
            .unwrap_or_else(|| self.current_report()))
    }

    fn current_report(&self) -> LoadReport {
        LoadReport {
            rows: self.store.len(),
            visible_columns: self.columns.len(),
            ragged_rows: 0,
            drift: None,
        }
    }

    /// Sends the current selection for the session's kind, then reloads.
    pub fn send<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        today: NaiveDate,
    ) -> Result<SendOutcome, SessionError> {
        match self.kind {
            IntimationKind::First => {
                let ids = self.selected_order_ids();
                if ids.is_empty() {
                    return Err(SessionError::EmptySelection);
                }
                let results = api.send_first_intimation(&self.username, &ids)?;
                let refreshed = self.refresh(api, today).map_err(SessionError::Refresh)?;
                Ok(SendOutcome::FirstIntimation {
                    sent: ids.len(),
                    results,
                    refreshed,
                })
            }
            IntimationKind::Second => {
                let items = self.readiness_payload()?;
                api.send_material_readiness(&self.username, &items)?;
                let refreshed = self.refresh(api, today).map_err(SessionError::Refresh)?;
                Ok(SendOutcome::MaterialReadiness {
                    items: items.len(),
                    refreshed,
                })
            }
        }
    }

    /// Validates a `DD-MM-YYYY` date, stores it upstream as the row's
    /// expected delivery date, and mirrors it into the local dataset.
    /// Returns the canonical date that was sent.
    pub fn update_delivery_date<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        id: &RowId,
        input: &str,
    ) -> Result<String, SessionError> {
        let column = self
            .role_column(ColumnRole::FinalDeliveryDate)
            .map(str::to_string)
            .ok_or(SessionError::ColumnUnavailable(ColumnRole::FinalDeliveryDate))?;
        let row = self
            .store
            .find_visible(id)
            .ok_or_else(|| SessionError::UnknownRow(id.clone()))?;
        let order_id = row
            .order_booking_id()
            .and_then(CellValue::as_i64)
            .ok_or(SessionError::MissingOrderId)?;
        let canonical = dates::to_canonical(input)
            .ok_or_else(|| SessionError::InvalidDate(input.trim().to_string()))?;

        api.update_delivery_date(&self.username, order_id, &canonical)?;

        self.store.update_cell(
            &RowId::Order(order_id.to_string()),
            &column,
            CellValue::from(canonical.as_str()),
        );
        Ok(canonical)
    }
}

/// Whole, non-negative count written with ASCII digits only.
fn parse_count(input: &str) -> Result<u32, SessionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(SessionError::InvalidCount(trimmed.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| SessionError::InvalidCount(trimmed.to_string()))
}
