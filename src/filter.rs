use std::collections::BTreeMap;

use anyhow::{Result, anyhow};

use crate::data::Row;

/// Per-column free-text filters, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters {
    terms: BTreeMap<String, String>,
}

impl ColumnFilters {
    /// Stores the trimmed, lowercased text for `column`; empty text clears
    /// that column's filter.
    pub fn set(&mut self, column: &str, text: &str) {
        let term = text.trim().to_lowercase();
        if term.is_empty() {
            self.terms.remove(column);
        } else {
            self.terms.insert(column.to_string(), term);
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Case-insensitive substring test against every active filter. Null or
    /// missing cells never satisfy a filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.terms.iter().all(|(column, term)| {
            row.get(column)
                .and_then(|value| value.as_text())
                .is_some_and(|text| text.to_lowercase().contains(term.as_str()))
        })
    }
}

/// Parses a `COLUMN=TEXT` filter argument. The text may be empty, which
/// clears the column's filter.
pub fn parse_filter_arg(arg: &str) -> Result<(String, String)> {
    let (column, text) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Filter '{arg}' must look like COLUMN=TEXT"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(anyhow!("Filter '{arg}' is missing a column name"));
    }
    Ok((column.to_string(), unquote(text.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
