//! Row source boundary.
//!
//! A [`RowSource`] hands out each sheet's rows with blank and comment rows
//! already filtered. `check_settings` runs the validator over all three
//! sheets and must pass before the pipeline touches the remote platform.
//!
//! Two sources live here:
//! - [`CsvRowSource`]: one exported CSV per sheet in a directory
//!   (`order.csv`, `lineitem.csv`, `creative.csv`).
//! - [`MemoryRowSource`]: rows held in memory (tests, embedding).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::validate::{check_settings, ValidatedKeys, ValidationError};
use crate::{Row, SheetType};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RowSourceError {
    /// Sheet could not be read.
    Io { sheet: SheetType, message: String },
    /// Sheet content is not well-formed CSV.
    Csv { sheet: SheetType, message: String },
    /// Rows are well-formed but break the row contract.
    Validation(ValidationError),
}

impl fmt::Display for RowSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSourceError::Io { sheet, message } => {
                write!(f, "cannot read {sheet} rows: {message}")
            }
            RowSourceError::Csv { sheet, message } => {
                write!(f, "malformed {sheet} csv: {message}")
            }
            RowSourceError::Validation(e) => write!(f, "validation failed: {e}"),
        }
    }
}

impl std::error::Error for RowSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RowSourceError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for RowSourceError {
    fn from(e: ValidationError) -> Self {
        RowSourceError::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Declarative row provider.
pub trait RowSource {
    /// Rows of `sheet`, in sheet order, blank/comment rows removed.
    fn fetch_rows(&self, sheet: SheetType) -> Result<Vec<Row>, RowSourceError>;

    /// Run the Row Validator over every sheet.
    fn check_settings(&self) -> Result<ValidatedKeys, RowSourceError> {
        let orders = self.fetch_rows(SheetType::Order)?;
        let lineitems = self.fetch_rows(SheetType::LineItem)?;
        let creatives = self.fetch_rows(SheetType::Creative)?;
        Ok(check_settings(&orders, &lineitems, &creatives)?)
    }
}

fn is_comment(row: &Row) -> bool {
    row.columns()
        .next()
        .and_then(|first| row.get(first))
        .map(|v| v.trim_start().starts_with('#'))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// CSV directory source
// ---------------------------------------------------------------------------

/// Reads `<dir>/<sheet>.csv` with a header row naming the columns.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    dir: PathBuf,
}

impl CsvRowSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sheet_path(&self, sheet: SheetType) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet.as_str()))
    }
}

impl RowSource for CsvRowSource {
    fn fetch_rows(&self, sheet: SheetType) -> Result<Vec<Row>, RowSourceError> {
        let path = self.sheet_path(sheet);
        let file = std::fs::File::open(&path).map_err(|e| RowSourceError::Io {
            sheet,
            message: format!("open '{}': {e}", path.display()),
        })?;
        let rows = parse_csv_rows(sheet, file)?;
        tracing::debug!(sheet = sheet.as_str(), rows = rows.len(), path = %path.display(), "rows fetched");
        Ok(rows)
    }
}

/// Parse one sheet from any reader.
///
/// Header cells are trimmed; short records are padded with empty cells so
/// every row carries every header column. Rows that are entirely blank or
/// whose first cell starts with `#` are dropped.
pub fn parse_csv_rows<R: std::io::Read>(
    sheet: SheetType,
    reader: R,
) -> Result<Vec<Row>, RowSourceError> {
    let csv_err = |e: csv::Error| RowSourceError::Csv {
        sheet,
        message: e.to_string(),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(csv_err)?;
        let line = rec.position().map(|p| p.line() as usize).unwrap_or(0);
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), rec.get(i).unwrap_or("").to_string()));
        let row = Row::new(line, cells);
        if row.is_blank() || is_comment(&row) {
            continue;
        }
        out.push(row);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    sheets: BTreeMap<SheetType, Vec<Row>>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, sheet: SheetType, rows: Vec<Row>) -> Self {
        self.sheets.insert(sheet, rows);
        self
    }
}

impl RowSource for MemoryRowSource {
    fn fetch_rows(&self, sheet: SheetType) -> Result<Vec<Row>, RowSourceError> {
        Ok(self
            .sheets
            .get(&sheet)
            .map(|rows| {
                rows.iter()
                    .filter(|r| !r.is_blank() && !is_comment(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_filters_blank_and_comment_rows() {
        let src = "name,advertiser_name,trafficker_name\n\
                   O1,Acme,Jo\n\
                   ,,\n\
                   # disabled,Acme,Jo\n\
                   O2, Acme , Jo\n";
        let rows = parse_csv_rows(SheetType::Order, src.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some("O1"));
        assert_eq!(rows[1].get("advertiser_name"), Some("Acme"));
        assert_eq!(rows[1].line(), 5);
    }

    #[test]
    fn short_records_are_padded() {
        let src = "order_name,name,sizes,costPerUnit,targetingUnit,targetingKeyValue1\n\
                   O1,L1,300x250,1.5,123\n";
        let rows = parse_csv_rows(SheetType::LineItem, src.as_bytes()).unwrap();
        assert_eq!(rows[0].get("targetingKeyValue1"), Some(""));
        assert!(rows[0].targeting_key_values().is_empty());
    }

    #[test]
    fn memory_source_returns_empty_for_unset_sheet() {
        let src = MemoryRowSource::new();
        assert!(src.fetch_rows(SheetType::Creative).unwrap().is_empty());
    }
}
