//! gasp-rows
//!
//! Declarative rows (one per order / line item / creative) and the pre-flight
//! contract they must satisfy before any remote call is made.
//!
//! - [`Row`]: ordered column → string mapping, immutable once fetched.
//! - [`fields`]: typed parsers for the structured columns (`sizes`,
//!   `costPerUnit`, `targetingUnit`, `targetingKeyValueN`).
//! - [`validate`]: the Row Validator (schema, references, uniqueness).
//! - [`source`]: the [`RowSource`] boundary plus CSV and in-memory sources.

pub mod fields;
pub mod source;
pub mod validate;

use serde::Serialize;
use std::fmt;

pub use fields::{
    amount_to_micros, parse_ad_unit_ids, parse_sizes, FieldError, KeyValueToken, Size,
    TargetingOperator,
};
pub use source::{parse_csv_rows, CsvRowSource, MemoryRowSource, RowSource, RowSourceError};
pub use validate::{
    check_creatives, check_lineitems, check_orders, check_settings, ValidatedKeys, ValidationError,
};

/// Highest `targetingKeyValueN` column index read from a line-item row.
pub const MAX_TARGETING_KEY_VALUES: usize = 12;

/// Column names per sheet.
pub mod columns {
    pub const NAME: &str = "name";
    pub const ORDER_NAME: &str = "order_name";

    pub const ADVERTISER_NAME: &str = "advertiser_name";
    pub const TRAFFICKER_NAME: &str = "trafficker_name";

    pub const SIZES: &str = "sizes";
    pub const COST_PER_UNIT: &str = "costPerUnit";
    pub const TARGETING_UNIT: &str = "targetingUnit";
    pub const TARGETING_KEY_VALUE_PREFIX: &str = "targetingKeyValue";

    pub const LINEITEM_NAME: &str = "lineitem_name";
    pub const SNIPPET: &str = "snippet";

    /// `targetingKeyValue1` .. `targetingKeyValue12`.
    pub fn targeting_key_value(n: usize) -> String {
        format!("{TARGETING_KEY_VALUE_PREFIX}{n}")
    }
}

/// The three declarative row sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SheetType {
    Order,
    LineItem,
    Creative,
}

impl SheetType {
    pub const ALL: [SheetType; 3] = [SheetType::Order, SheetType::LineItem, SheetType::Creative];

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetType::Order => "order",
            SheetType::LineItem => "lineitem",
            SheetType::Creative => "creative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "order" => Some(SheetType::Order),
            "lineitem" => Some(SheetType::LineItem),
            "creative" => Some(SheetType::Creative),
            _ => None,
        }
    }
}

impl fmt::Display for SheetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative unit: column → value, in sheet column order.
///
/// `line` is the 1-based position in the source (the CSV record line for
/// file sources) and is only used for error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    line: usize,
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new<K, V>(line: usize, cells: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line,
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Raw value of `column`, or `None` when the column is absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed value of `column`; absent and blank both read as `None`.
    pub fn get_nonempty(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Value of a column the validator guarantees to be present.
    /// Reads as `""` when the row was never validated.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).map(str::trim).unwrap_or("")
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    /// Non-blank `targetingKeyValue1..=12` cells as `(column, value)`, in
    /// column order.
    pub fn targeting_key_values(&self) -> Vec<(String, &str)> {
        (1..=MAX_TARGETING_KEY_VALUES)
            .map(columns::targeting_key_value)
            .filter_map(|column| {
                let value = self.get_nonempty(&column)?;
                Some((column, value))
            })
            .collect()
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_trims_and_treats_blank_as_missing() {
        let row = Row::new(2, [("name", "  A  "), ("snippet", "   ")]);
        assert_eq!(row.get("name"), Some("  A  "));
        assert_eq!(row.get_nonempty("name"), Some("A"));
        assert_eq!(row.get_nonempty("snippet"), None);
        assert_eq!(row.get_nonempty("missing"), None);
        assert_eq!(row.value("name"), "A");
    }

    #[test]
    fn targeting_key_values_skip_blanks_and_keep_order() {
        let row = Row::new(
            1,
            [
                ("targetingKeyValue1", "a=1"),
                ("targetingKeyValue2", ""),
                ("targetingKeyValue3", "b!=2"),
                ("targetingKeyValue13", "ignored=1"),
            ],
        );
        assert_eq!(
            row.targeting_key_values(),
            vec![
                ("targetingKeyValue1".to_string(), "a=1"),
                ("targetingKeyValue3".to_string(), "b!=2"),
            ]
        );
    }

    #[test]
    fn sheet_type_round_trips_names() {
        for sheet in SheetType::ALL {
            assert_eq!(SheetType::parse(sheet.as_str()), Some(sheet));
        }
        assert_eq!(SheetType::parse("LineItem"), Some(SheetType::LineItem));
        assert_eq!(SheetType::parse("advertiser"), None);
    }
}
