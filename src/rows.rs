//! The loaded dataset and its filtered view.
//!
//! [`RowStore`] owns every fetched row once; the filtered view is a list of
//! positions into the dataset, so an in-place cell update is visible through
//! both without copying rows around.

use log::debug;

use crate::{
    data::{CellValue, Row, RowId},
    filter::ColumnFilters,
};

#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Row>,
    view: Vec<usize>,
    filters: ColumnFilters,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the dataset, drops every filter and shows all rows.
    pub fn load(&mut self, rows: Vec<Row>) {
        self.view = (0..rows.len()).collect();
        self.rows = rows;
        self.filters.clear();
    }

    pub fn set_filter(&mut self, column: &str, text: &str) {
        self.filters.set(column, text);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn filters(&self) -> &ColumnFilters {
        &self.filters
    }

    /// Recomputes the view from scratch against the current filters.
    pub fn apply_filters(&mut self) {
        self.view = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.filters.matches(row))
            .map(|(idx, _)| idx)
            .collect();
        debug!(
            "Filters {:?} keep {} of {} row(s)",
            self.filters.active().collect::<Vec<_>>(),
            self.view.len(),
            self.rows.len()
        );
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn view_len(&self) -> usize {
        self.view.len()
    }

    pub fn view(&self) -> impl Iterator<Item = &Row> {
        self.view.iter().map(|idx| &self.rows[*idx])
    }

    /// Visible rows paired with their identifiers.
    pub fn visible(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.view()
            .enumerate()
            .map(|(position, row)| (RowId::for_row(row, position), row))
    }

    pub fn view_ids(&self) -> Vec<RowId> {
        self.visible().map(|(id, _)| id).collect()
    }

    /// Row named by `id`, provided the current filters keep it.
    pub fn find_visible(&self, id: &RowId) -> Option<&Row> {
        self.position_of(id)
            .filter(|idx| self.view.contains(idx))
            .map(|idx| &self.rows[idx])
    }

    /// Sets `column` on the row named by `id`. Returns false when no row
    /// carries that identifier.
    pub fn update_cell(&mut self, id: &RowId, column: &str, value: CellValue) -> bool {
        match self.position_of(id) {
            Some(idx) => {
                self.rows[idx].set(column, value);
                true
            }
            None => false,
        }
    }

    fn position_of(&self, id: &RowId) -> Option<usize> {
        match id {
            RowId::Order(order) => self.rows.iter().position(|row| row.has_order_id(order)),
            RowId::Position(position) => self.view.get(*position).copied(),
        }
    }
}
