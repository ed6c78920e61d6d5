//! Cell values, rows, and row identity for pending-job feeds.
//!
//! The upstream feed returns loosely shaped JSON objects whose keys are only
//! known at runtime. [`Row`] keeps those keys in feed order (the classifier
//! depends on column position) and stores each cell as a tagged
//! [`CellValue`]. [`RowId`] names a row for selection and edit tracking.

use std::{fmt, str::FromStr};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

/// Canonical spelling of the identifier column; lookups ignore ASCII case.
pub const ORDER_ID_KEY: &str = "OrderBookingDetailsID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Boolean(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text form used for filtering and display; `None` for null cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Boolean(b) => Some(b.to_string()),
            CellValue::Number(n) => Some(number_text(n)),
            CellValue::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric reading of the cell, accepting numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            CellValue::Text(s) => parse_whole(s),
            _ => None,
        }
    }
}

fn number_text(number: &serde_json::Number) -> String {
    if number.is_i64() || number.is_u64() {
        return number.to_string();
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => number.to_string(),
    }
}

fn parse_whole(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text().unwrap_or_default())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value.into())
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(value.into())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// One pending-job record with its columns in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut row = Row::new();
        for (key, value) in pairs {
            row.set(key, value);
        }
        row
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Replaces the cell under `key`, appending a new column when absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(candidate, _)| *candidate == key) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((key, value)),
        }
    }

    /// The order-booking identifier cell, if present and non-empty.
    pub fn order_booking_id(&self) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ORDER_ID_KEY))
            .map(|(_, value)| value)
            .filter(|value| match value {
                CellValue::Null => false,
                CellValue::Text(s) => !s.trim().is_empty(),
                _ => true,
            })
    }

    /// Loose comparison against an identifier string, the way the feed's
    /// numeric and textual IDs are matched interchangeably.
    pub fn has_order_id(&self, id: &str) -> bool {
        let Some(value) = self.order_booking_id() else {
            return false;
        };
        match (value.as_i64(), parse_whole(id)) {
            (Some(left), Some(right)) => left == right,
            _ => value.as_text().is_some_and(|text| text.trim() == id.trim()),
        }
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of scalar cells")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, CellValue>()? {
                    cells.push((key, value));
                }
                Ok(Row { cells })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Identity of a row for selection and edit tracking.
///
/// Rows carrying an order-booking identifier are keyed by it. Rows without
/// one fall back to their position in the filtered view, which shifts
/// whenever the filters change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowId {
    Order(String),
    Position(usize),
}

impl RowId {
    pub fn for_row(row: &Row, position: usize) -> Self {
        match row.order_booking_id().and_then(CellValue::as_text) {
            Some(id) => RowId::Order(id.trim().to_string()),
            None => RowId::Position(position),
        }
    }

    /// Numeric order-booking identifier sent to the API.
    pub fn order_number(&self) -> Option<i64> {
        match self {
            RowId::Order(id) => parse_whole(id),
            RowId::Position(_) => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Order(id) => write!(f, "{id}"),
            RowId::Position(index) => write!(f, "row-{index}"),
        }
    }
}

impl FromStr for RowId {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Ok(match trimmed
            .strip_prefix("row-")
            .and_then(|index| index.parse::<usize>().ok())
        {
            Some(index) => RowId::Position(index),
            None => RowId::Order(trimmed.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_deserialization_keeps_feed_order() {
        let row: Row =
            serde_json::from_str(r#"{"Zeta":1,"Alpha":"a","Mid":null,"Flag":true}"#).unwrap();
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid", "Flag"]);
        assert_eq!(row.get("Mid"), Some(&CellValue::Null));
        assert_eq!(row.get("Flag").and_then(CellValue::as_text).as_deref(), Some("true"));
    }

    #[test]
    fn nested_values_are_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"a":[1,2]}"#).is_err());
    }

    #[test]
    fn order_id_lookup_ignores_key_case() {
        let row = Row::from_pairs([("orderBookingDetailsID", CellValue::from(42i64))]);
        assert_eq!(RowId::for_row(&row, 3), RowId::Order("42".into()));
        assert!(row.has_order_id("42"));
        assert!(row.has_order_id("42.0"));
    }

    #[test]
    fn missing_order_id_falls_back_to_position() {
        let row = Row::from_pairs([("OrderBookingDetailsID", ""), ("JobName", "Box")]);
        let id = RowId::for_row(&row, 7);
        assert_eq!(id, RowId::Position(7));
        assert_eq!(id.to_string(), "row-7");
        assert_eq!("row-7".parse::<RowId>().unwrap(), id);
        assert_eq!(id.order_number(), None);
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        let value: CellValue = serde_json::from_str("5.0").unwrap();
        assert_eq!(value.as_text().as_deref(), Some("5"));
        assert_eq!(value.as_i64(), Some(5));
    }
}
