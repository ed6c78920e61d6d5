//! Manual overrides made to the material-readiness columns before a send.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::{Error, anyhow};

use crate::{api::ReadinessItem, data::RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditField {
    ReadyForDispatchDate,
    NoOfCarton,
    QtyPerCarton,
}

impl EditField {
    pub fn label(self) -> &'static str {
        match self {
            EditField::ReadyForDispatchDate => "readiness date",
            EditField::NoOfCarton => "number of cartons",
            EditField::QtyPerCarton => "qty per carton",
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EditField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "readiness-date" | "ready-for-dispatch-date" | "readiness" | "ready" | "date" => {
                Ok(EditField::ReadyForDispatchDate)
            }
            "no-of-carton" | "no-of-cartons" | "cartons" | "carton-count" => {
                Ok(EditField::NoOfCarton)
            }
            "qty-per-carton" | "qty" | "quantity-per-carton" => Ok(EditField::QtyPerCarton),
            other => Err(anyhow!(
                "Unknown edit field '{other}' (expected readiness-date, cartons or qty-per-carton)"
            )),
        }
    }
}

/// A validated value for one edit field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    ReadyForDispatchDate(String),
    NoOfCarton(u32),
    QtyPerCarton(u32),
}

impl FieldEdit {
    pub fn field(&self) -> EditField {
        match self {
            FieldEdit::ReadyForDispatchDate(_) => EditField::ReadyForDispatchDate,
            FieldEdit::NoOfCarton(_) => EditField::NoOfCarton,
            FieldEdit::QtyPerCarton(_) => EditField::QtyPerCarton,
        }
    }
}

/// Edited fields of one row. `None` means "not edited", which is distinct
/// from an edited zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEdits {
    pub ready_for_dispatch_date: Option<String>,
    pub no_of_carton: Option<u32>,
    pub qty_per_carton: Option<u32>,
}

impl RowEdits {
    pub fn is_empty(&self) -> bool {
        self.ready_for_dispatch_date.is_none()
            && self.no_of_carton.is_none()
            && self.qty_per_carton.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTracker {
    entries: BTreeMap<RowId, RowEdits>,
}

impl EditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, id: RowId, edit: FieldEdit) {
        let entry = self.entries.entry(id).or_default();
        match edit {
            FieldEdit::ReadyForDispatchDate(date) => entry.ready_for_dispatch_date = Some(date),
            FieldEdit::NoOfCarton(count) => entry.no_of_carton = Some(count),
            FieldEdit::QtyPerCarton(count) => entry.qty_per_carton = Some(count),
        }
    }

    /// Marks a field as not edited. The row's entry is kept.
    pub fn clear_field(&mut self, id: &RowId, field: EditField) {
        if let Some(entry) = self.entries.get_mut(id) {
            match field {
                EditField::ReadyForDispatchDate => entry.ready_for_dispatch_date = None,
                EditField::NoOfCarton => entry.no_of_carton = None,
                EditField::QtyPerCarton => entry.qty_per_carton = None,
            }
        }
    }

    pub fn get(&self, id: &RowId) -> Option<&RowEdits> {
        self.entries.get(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of rows with at least one edited field.
    pub fn edited_rows(&self) -> usize {
        self.entries.values().filter(|edits| !edits.is_empty()).count()
    }

    /// Sparse send payload for the selected rows, in the order given. Rows
    /// without edits or without a numeric order identifier are left out.
    pub fn build_payload<'a, I>(&self, selected: I) -> Vec<ReadinessItem>
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        selected
            .into_iter()
            .filter_map(|id| {
                let edits = self.entries.get(id).filter(|edits| !edits.is_empty())?;
                let order_id = id.order_number()?;
                Some(ReadinessItem {
                    order_booking_details_id: vec![order_id],
                    ready_for_dispatch_date: edits.ready_for_dispatch_date.clone(),
                    no_of_carton: edits.no_of_carton,
                    qty_per_carton: edits.qty_per_carton,
                })
            })
            .collect()
    }
}
