//! Line-item ↔ creative associations.
//!
//! Associations have no name, so they are reconciled by pair membership
//! rather than through the diff engine: a `(lineItemId, creativeId)` pair is
//! created only when the remote set for the order's line items lacks it.

use std::collections::{BTreeMap, BTreeSet};

use gasp_rows::{columns, Row};
use serde_json::{json, Value};
use tracing::info;

use super::{Pacer, StageReport, SyncSettings};
use crate::cache::{entity_id, AdManager};
use crate::error::{ObjectNotFound, SyncError};
use crate::service::{endpoints, AdManagerService, Endpoint};

/// Map `name -> id` over remote entities; entities without a name are skipped.
fn ids_by_name(endpoint: Endpoint, entities: &[Value]) -> Result<BTreeMap<String, Value>, SyncError> {
    let mut out = BTreeMap::new();
    for e in entities {
        let Some(name) = e.get("name").and_then(Value::as_str) else {
            continue;
        };
        out.insert(name.to_string(), entity_id(endpoint, e)?);
    }
    Ok(out)
}

fn pair_key(line_item_id: &Value, creative_id: &Value) -> (String, String) {
    (line_item_id.to_string(), creative_id.to_string())
}

pub fn association(line_item_id: &Value, creative_id: &Value) -> Value {
    json!({"lineItemId": line_item_id, "creativeId": creative_id})
}

/// Creative rows grouped under their order, in order-sheet order. Orders
/// without creative rows are omitted.
fn creatives_per_order<'a>(order_rows: &'a [Row], creative_rows: &'a [Row]) -> Vec<(&'a str, Vec<&'a Row>)> {
    order_rows
        .iter()
        .map(|o| o.value(columns::NAME))
        .map(|order| {
            let rows: Vec<&Row> = creative_rows
                .iter()
                .filter(|c| c.value(columns::ORDER_NAME) == order)
                .collect();
            (order, rows)
        })
        .filter(|(_, rows)| !rows.is_empty())
        .collect()
}

pub async fn sync_associations<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    order_rows: &[Row],
    creative_rows: &[Row],
) -> Result<StageReport, SyncError> {
    let mut report = StageReport::new("associations");
    let mut pacer = Pacer::new(settings.pause());

    for (order_name, rows) in creatives_per_order(order_rows, creative_rows) {
        let order = am.find_order(order_name).await?;
        let order_id = entity_id(endpoints::ORDERS, &order)?;

        let lineitems = am
            .find_all_scoped(endpoints::LINE_ITEMS, &[("orderId", order_id.clone())])
            .await?;
        let lineitem_ids = ids_by_name(endpoints::LINE_ITEMS, &lineitems)?;

        let mut creative_ids = BTreeMap::new();
        let creative_names: Vec<Value> = rows
            .iter()
            .map(|r| Value::from(r.value(columns::NAME)))
            .collect();
        for names in creative_names.chunks(settings.chunk_size()) {
            let found = am
                .find_multi(endpoints::CREATIVES, "name", names.to_vec())
                .await?;
            creative_ids.extend(ids_by_name(endpoints::CREATIVES, &found)?);
        }

        // desired pairs, row order, deduplicated
        let mut seen = BTreeSet::new();
        let mut desired: Vec<(Value, Value)> = Vec::new();
        for row in &rows {
            let li_name = row.value(columns::LINEITEM_NAME);
            let li_id = lineitem_ids.get(li_name).ok_or_else(|| ObjectNotFound {
                endpoint: endpoints::LINE_ITEMS,
                criteria: format!("orderId == {order_id} AND name == {}", Value::from(li_name)),
                matches: 0,
            })?;
            let cr_name = row.value(columns::NAME);
            let cr_id = creative_ids.get(cr_name).ok_or_else(|| ObjectNotFound {
                endpoint: endpoints::CREATIVES,
                criteria: format!("name == {}", Value::from(cr_name)),
                matches: 0,
            })?;
            if seen.insert(pair_key(li_id, cr_id)) {
                desired.push((li_id.clone(), cr_id.clone()));
            }
        }

        let all_lineitem_ids: Vec<Value> = lineitem_ids.values().cloned().collect();
        let mut existing = BTreeSet::new();
        for ids in all_lineitem_ids.chunks(settings.chunk_size()) {
            let found = am
                .find_multi(endpoints::ASSOCIATIONS, "lineItemId", ids.to_vec())
                .await?;
            for lica in &found {
                if let (Some(li), Some(cr)) = (lica.get("lineItemId"), lica.get("creativeId")) {
                    existing.insert(pair_key(li, cr));
                }
            }
        }

        let missing: Vec<Value> = desired
            .iter()
            .filter(|(li, cr)| !existing.contains(&pair_key(li, cr)))
            .map(|(li, cr)| association(li, cr))
            .collect();

        report.desired += desired.len();
        report.existing += desired.len() - missing.len();
        if missing.len() < desired.len() {
            info!(
                "associations: existing {}/{} objects",
                desired.len() - missing.len(),
                desired.len()
            );
        }

        for chunk in missing.chunks(settings.chunk_size()) {
            pacer.next_chunk(&mut report).await;
            am.create(endpoints::CREATE_ASSOCIATIONS, chunk.to_vec())
                .await?;
            report.created += chunk.len();
            info!(order = order_name, created = chunk.len(), "created associations");
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creative_rows_group_under_orders_in_sheet_order() {
        let orders = vec![
            Row::new(2, [("name", "O1")]),
            Row::new(3, [("name", "O2")]),
            Row::new(4, [("name", "O3")]),
        ];
        let creatives = vec![
            Row::new(2, [("order_name", "O2"), ("name", "C1")]),
            Row::new(3, [("order_name", "O1"), ("name", "C2")]),
            Row::new(4, [("order_name", "O2"), ("name", "C3")]),
        ];
        let groups = creatives_per_order(&orders, &creatives);
        let names: Vec<&str> = groups.iter().map(|(o, _)| *o).collect();
        assert_eq!(names, vec!["O1", "O2"]);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn ids_by_name_skips_unnamed() {
        let entities = vec![json!({"id": 1, "name": "A"}), json!({"id": 2})];
        let ids = ids_by_name(endpoints::LINE_ITEMS, &entities).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids["A"], json!(1));
    }

    #[test]
    fn pair_keys_keep_id_types_apart() {
        assert_ne!(pair_key(&json!(1), &json!(2)), pair_key(&json!("1"), &json!(2)));
    }
}
