//! Line-item targeting clause.
//!
//! Inventory targeting comes from `targetingUnit`; custom targeting from the
//! `targetingKeyValueN` columns, OR-ed together into one criteria set. Each
//! criterion resolves its key and value ids through the lookup cache.

use gasp_rows::{columns, parse_ad_unit_ids, KeyValueToken, Row, TargetingOperator};
use serde_json::{json, Value};

use crate::cache::{entity_id, AdManager};
use crate::error::{ConfigurationError, SyncError};
use crate::service::{endpoints, AdManagerService};

pub const CRITERIA_SET_TYPE: &str = "CustomCriteriaSet";
pub const CRITERIA_TYPE: &str = "CustomCriteria";

pub fn inventory_targeting(ad_unit_ids: &[String]) -> Value {
    let units: Vec<Value> = ad_unit_ids
        .iter()
        .map(|id| json!({"adUnitId": id, "includeDescendants": true}))
        .collect();
    json!({ "targetedAdUnits": units })
}

pub fn criterion(key_id: Value, value_id: Value, operator: TargetingOperator) -> Value {
    json!({
        "xsi_type": CRITERIA_TYPE,
        "keyId": key_id,
        "valueIds": [value_id],
        "operator": operator.as_str(),
    })
}

pub fn criteria_set(children: Vec<Value>) -> Value {
    json!({
        "xsi_type": CRITERIA_SET_TYPE,
        "logicalOperator": "OR",
        "children": children,
    })
}

/// Key/value tokens of a row, in column order.
pub fn key_value_tokens(row: &Row) -> Result<Vec<KeyValueToken>, ConfigurationError> {
    row.targeting_key_values()
        .into_iter()
        .map(|(column, raw)| {
            KeyValueToken::parse(raw).map_err(|e| ConfigurationError::field(row, &column, e))
        })
        .collect()
}

pub async fn resolve_criterion<S: AdManagerService>(
    am: &mut AdManager<S>,
    token: &KeyValueToken,
) -> Result<Value, SyncError> {
    let key = am.find_targeting_key(&token.key).await?;
    let key_id = entity_id(endpoints::TARGETING_KEYS, &key)?;
    let value = am.find_targeting_value(&key_id, &token.value).await?;
    let value_id = entity_id(endpoints::TARGETING_VALUES, &value)?;
    Ok(criterion(key_id, value_id, token.operator))
}

/// Full `targeting` field for a line-item row. `customTargeting` is only
/// present when the row carries at least one key/value token.
pub async fn build_targeting<S: AdManagerService>(
    am: &mut AdManager<S>,
    row: &Row,
) -> Result<Value, SyncError> {
    let ad_units = parse_ad_unit_ids(row.value(columns::TARGETING_UNIT))
        .map_err(|e| ConfigurationError::field(row, columns::TARGETING_UNIT, e))?;

    let mut targeting = json!({ "inventoryTargeting": inventory_targeting(&ad_units) });

    let tokens = key_value_tokens(row)?;
    if !tokens.is_empty() {
        let mut children = Vec::with_capacity(tokens.len());
        for token in &tokens {
            children.push(resolve_criterion(am, token).await?);
        }
        targeting["customTargeting"] = criteria_set(children);
    }
    Ok(targeting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_includes_descendants() {
        let v = inventory_targeting(&["111".to_string(), "222".to_string()]);
        assert_eq!(
            v,
            json!({"targetedAdUnits": [
                {"adUnitId": "111", "includeDescendants": true},
                {"adUnitId": "222", "includeDescendants": true},
            ]})
        );
    }

    #[test]
    fn negated_token_becomes_is_not_criterion() {
        let c = criterion(json!(7), json!(70), TargetingOperator::IsNot);
        assert_eq!(c["operator"], json!("IS_NOT"));
        assert_eq!(c["valueIds"], json!([70]));
        assert_eq!(c["xsi_type"], json!("CustomCriteria"));
    }

    #[test]
    fn tokens_read_in_column_order() {
        let row = Row::new(
            3,
            [
                ("targetingKeyValue2", "b!=2"),
                ("targetingKeyValue1", "a=1"),
            ],
        );
        let tokens = key_value_tokens(&row).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].key, "a");
        assert_eq!(tokens[1].operator, TargetingOperator::IsNot);
    }

    #[test]
    fn malformed_token_reports_column() {
        let row = Row::new(3, [("targetingKeyValue4", "region")]);
        let err = key_value_tokens(&row).unwrap_err();
        assert_eq!(err.column, "targetingKeyValue4");
        assert_eq!(err.line, 3);
    }
}
