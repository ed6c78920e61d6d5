//! Reading saved pending-job feeds for offline commands.
//!
//! A feed file is either the JSON an upstream fetch returns (a bare row array
//! or an object with `pendingData`) or a CSV export with a header row. `-`
//! reads standard input.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::data::{CellValue, Row};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
    Csv,
}

impl FeedFormat {
    /// `.csv` files are CSV; everything else, stdin included, is JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => FeedFormat::Csv,
            _ => FeedFormat::Json,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Rows(Vec<Row>),
    Response {
        #[serde(rename = "pendingData", default)]
        pending_data: Vec<Row>,
    },
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening feed file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let reader = open_input(path)?;
    let rows = match FeedFormat::for_path(path) {
        FeedFormat::Json => parse_json_rows(reader),
        FeedFormat::Csv => parse_csv_rows(reader),
    };
    rows.with_context(|| format!("Reading rows from {path:?}"))
}

pub fn parse_json_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let document: FeedDocument =
        serde_json::from_reader(reader).context("Expected a row array or an object with pendingData")?;
    Ok(match document {
        FeedDocument::Rows(rows) => rows,
        FeedDocument::Response { pending_data } => pending_data,
    })
}

/// CSV cells are kept as text; empty cells become null.
pub fn parse_csv_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("Reading CSV header row")?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.is_empty() {
        bail!("CSV feed has no header row");
    }
    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV record {}", line + 2))?;
        let row = Row::from_pairs(headers.iter().zip(record.iter()).map(|(key, value)| {
            let cell = if value.is_empty() {
                CellValue::Null
            } else {
                CellValue::from(value)
            };
            (key.as_str(), cell)
        }));
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_accepts_array_or_fetch_response() {
        let rows = parse_json_rows(r#"[{"A":1,"B":"x"}]"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let rows = parse_json_rows(r#"{"pendingData":[{"A":1},{"A":2}]}"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(parse_json_rows(r#""nope""#.as_bytes()).is_err());
    }

    #[test]
    fn csv_empty_cells_are_null() {
        let rows = parse_csv_rows("A,B\n1,\n".as_bytes()).unwrap();
        assert_eq!(rows[0].get("A"), Some(&CellValue::from("1")));
        assert_eq!(rows[0].get("B"), Some(&CellValue::Null));
    }
}
