//! Row Validator: the pre-flight gate in front of the sync pipeline.
//!
//! Runs in dependency order. Orders first, then line items against the
//! order names just collected, then creatives against both. A row set that
//! passes returns the keys later sets may reference.
//!
//! Pure: no IO, no remote calls.

use std::collections::BTreeSet;
use std::fmt;

use crate::columns;
use crate::fields::{amount_to_micros, parse_ad_unit_ids, parse_sizes, FieldError, KeyValueToken};
use crate::{Row, SheetType};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required column absent or blank.
    MissingField {
        sheet: SheetType,
        line: usize,
        column: &'static str,
    },
    /// Column present but its value does not parse.
    InvalidField {
        sheet: SheetType,
        line: usize,
        column: String,
        source: FieldError,
    },
    /// Value must name an entity from an earlier sheet but does not.
    UnknownReference {
        sheet: SheetType,
        line: usize,
        column: &'static str,
        value: String,
    },
    /// Uniqueness constraint violated.
    Duplicate {
        sheet: SheetType,
        line: usize,
        key: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField {
                sheet,
                line,
                column,
            } => write!(f, "{sheet} row {line}: required column '{column}' is missing or empty"),
            ValidationError::InvalidField {
                sheet,
                line,
                column,
                source,
            } => write!(f, "{sheet} row {line}: column '{column}': {source}"),
            ValidationError::UnknownReference {
                sheet,
                line,
                column,
                value,
            } => write!(
                f,
                "{sheet} row {line}: column '{column}' references unknown '{value}'"
            ),
            ValidationError::Duplicate { sheet, line, key } => {
                write!(f, "{sheet} row {line}: duplicate {key}")
            }
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::InvalidField { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Keys collected by a successful [`check_settings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedKeys {
    pub order_names: BTreeSet<String>,
    /// (order_name, lineitem_name)
    pub lineitem_keys: BTreeSet<(String, String)>,
    pub creative_names: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required<'a>(
    sheet: SheetType,
    row: &'a Row,
    column: &'static str,
) -> Result<&'a str, ValidationError> {
    row.get_nonempty(column)
        .ok_or(ValidationError::MissingField {
            sheet,
            line: row.line(),
            column,
        })
}

fn invalid(sheet: SheetType, row: &Row, column: &str, source: FieldError) -> ValidationError {
    ValidationError::InvalidField {
        sheet,
        line: row.line(),
        column: column.to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Per-sheet rules
// ---------------------------------------------------------------------------

/// Orders: `name`, `advertiser_name`, `trafficker_name` required; `name`
/// globally unique. Returns the order names.
pub fn check_orders(rows: &[Row]) -> Result<BTreeSet<String>, ValidationError> {
    let sheet = SheetType::Order;
    let mut names = BTreeSet::new();

    for row in rows {
        let name = required(sheet, row, columns::NAME)?;
        required(sheet, row, columns::ADVERTISER_NAME)?;
        required(sheet, row, columns::TRAFFICKER_NAME)?;

        if !names.insert(name.to_string()) {
            return Err(ValidationError::Duplicate {
                sheet,
                line: row.line(),
                key: format!("order name '{name}'"),
            });
        }
    }

    Ok(names)
}

/// Line items: `order_name` must be a known order; `name` unique within its
/// order; `sizes`, `costPerUnit`, `targetingUnit` must parse; optional
/// `targetingKeyValueN` tokens must be `key=value` / `key!=value`.
///
/// Returns the `(order_name, name)` keys.
pub fn check_lineitems(
    rows: &[Row],
    order_names: &BTreeSet<String>,
) -> Result<BTreeSet<(String, String)>, ValidationError> {
    let sheet = SheetType::LineItem;
    let mut keys = BTreeSet::new();

    for row in rows {
        let order_name = required(sheet, row, columns::ORDER_NAME)?;
        if !order_names.contains(order_name) {
            return Err(ValidationError::UnknownReference {
                sheet,
                line: row.line(),
                column: columns::ORDER_NAME,
                value: order_name.to_string(),
            });
        }

        let name = required(sheet, row, columns::NAME)?;

        let sizes = required(sheet, row, columns::SIZES)?;
        parse_sizes(sizes).map_err(|e| invalid(sheet, row, columns::SIZES, e))?;

        let cost = required(sheet, row, columns::COST_PER_UNIT)?;
        amount_to_micros(cost).map_err(|e| invalid(sheet, row, columns::COST_PER_UNIT, e))?;

        let units = required(sheet, row, columns::TARGETING_UNIT)?;
        parse_ad_unit_ids(units).map_err(|e| invalid(sheet, row, columns::TARGETING_UNIT, e))?;

        for (column, token) in row.targeting_key_values() {
            KeyValueToken::parse(token).map_err(|e| invalid(sheet, row, &column, e))?;
        }

        if !keys.insert((order_name.to_string(), name.to_string())) {
            return Err(ValidationError::Duplicate {
                sheet,
                line: row.line(),
                key: format!("line item name '{name}' in order '{order_name}'"),
            });
        }
    }

    Ok(keys)
}

/// Creatives: `order_name` must be a known order, `lineitem_name` a line
/// item of that order; `name` globally unique; `snippet` required.
///
/// Returns the creative names.
pub fn check_creatives(
    rows: &[Row],
    order_names: &BTreeSet<String>,
    lineitem_keys: &BTreeSet<(String, String)>,
) -> Result<BTreeSet<String>, ValidationError> {
    let sheet = SheetType::Creative;
    let mut names = BTreeSet::new();

    for row in rows {
        let order_name = required(sheet, row, columns::ORDER_NAME)?;
        if !order_names.contains(order_name) {
            return Err(ValidationError::UnknownReference {
                sheet,
                line: row.line(),
                column: columns::ORDER_NAME,
                value: order_name.to_string(),
            });
        }

        let lineitem_name = required(sheet, row, columns::LINEITEM_NAME)?;
        if !lineitem_keys.contains(&(order_name.to_string(), lineitem_name.to_string())) {
            return Err(ValidationError::UnknownReference {
                sheet,
                line: row.line(),
                column: columns::LINEITEM_NAME,
                value: format!("{order_name}/{lineitem_name}"),
            });
        }

        let name = required(sheet, row, columns::NAME)?;
        required(sheet, row, columns::SNIPPET)?;

        if !names.insert(name.to_string()) {
            return Err(ValidationError::Duplicate {
                sheet,
                line: row.line(),
                key: format!("creative name '{name}'"),
            });
        }
    }

    Ok(names)
}

/// Validate all three row sets in dependency order.
pub fn check_settings(
    order_rows: &[Row],
    lineitem_rows: &[Row],
    creative_rows: &[Row],
) -> Result<ValidatedKeys, ValidationError> {
    let order_names = check_orders(order_rows)?;
    let lineitem_keys = check_lineitems(lineitem_rows, &order_names)?;
    let creative_names = check_creatives(creative_rows, &order_names, &lineitem_keys)?;

    tracing::debug!(
        orders = order_names.len(),
        lineitems = lineitem_keys.len(),
        creatives = creative_names.len(),
        "row sets validated"
    );

    Ok(ValidatedKeys {
        order_names,
        lineitem_keys,
        creative_names,
    })
}
