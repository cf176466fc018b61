use gasp_reconcile::Setting;
use gasp_rows::{amount_to_micros, columns, parse_sizes, Row, Size};
use serde_json::{json, Value};
use tracing::info;

use super::targeting::build_targeting;
use super::{key_values, reconcile_chunk, Pacer, StageReport, SyncSettings};
use crate::cache::{entity_id, AdManager};
use crate::error::{ConfigurationError, SyncError};
use crate::service::{endpoints, AdManagerService};

pub fn size_value(size: Size) -> Value {
    json!({"width": size.width, "height": size.height, "isAspectRatio": false})
}

/// Rows grouped by `order_name`, groups in first-appearance order.
pub fn group_by_order(rows: &[Row]) -> Vec<(&str, Vec<&Row>)> {
    let mut groups: Vec<(&str, Vec<&Row>)> = Vec::new();
    for row in rows {
        let order = row.value(columns::ORDER_NAME);
        match groups.iter_mut().find(|(name, _)| *name == order) {
            Some((_, members)) => members.push(row),
            None => groups.push((order, vec![row])),
        }
    }
    groups
}

/// Desired line item for `row` under the order with id `order_id`.
///
/// Fixed shape: starts immediately, never ends, CPM pricing, no goal,
/// one creative placeholder per size.
pub async fn lineitem_setting<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    order_id: &Value,
    row: &Row,
) -> Result<Setting, SyncError> {
    let sizes = parse_sizes(row.value(columns::SIZES))
        .map_err(|e| ConfigurationError::field(row, columns::SIZES, e))?;
    let micros = amount_to_micros(row.value(columns::COST_PER_UNIT))
        .map_err(|e| ConfigurationError::field(row, columns::COST_PER_UNIT, e))?;
    let targeting = build_targeting(am, row).await?;

    let placeholders: Vec<Value> = sizes
        .into_iter()
        .map(|s| json!({ "size": size_value(s) }))
        .collect();

    let mut s = Setting::new();
    s.insert("orderId".into(), order_id.clone());
    s.insert("name".into(), Value::from(row.value(columns::NAME)));
    s.insert("startDateTimeType".into(), json!("IMMEDIATELY"));
    s.insert("unlimitedEndDateTime".into(), json!(true));
    s.insert("lineItemType".into(), json!(settings.lineitem_type()));
    s.insert("costType".into(), json!("CPM"));
    s.insert(
        "costPerUnit".into(),
        json!({"currencyCode": settings.currency_code(), "microAmount": micros}),
    );
    s.insert("primaryGoal".into(), json!({"goalType": "NONE"}));
    s.insert("creativePlaceholders".into(), Value::Array(placeholders));
    s.insert("targeting".into(), targeting);
    Ok(s)
}

/// Line items are scoped by order and matched by name only: once a line item
/// exists its fields are never compared.
pub async fn sync_lineitems<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    rows: &[Row],
) -> Result<StageReport, SyncError> {
    let mut report = StageReport::new("lineitems");
    let mut pacer = Pacer::new(settings.pause());

    for (order_name, members) in group_by_order(rows) {
        let order = am.find_order(order_name).await?;
        let order_id = entity_id(endpoints::ORDERS, &order)?;

        for chunk in members.chunks(settings.chunk_size()) {
            pacer.next_chunk(&mut report).await;
            info!(
                stage = report.stage,
                order = order_name,
                chunk = report.chunks,
                rows = chunk.len(),
                "checking chunk"
            );

            let mut desired = Vec::with_capacity(chunk.len());
            for row in chunk {
                desired.push(lineitem_setting(am, settings, &order_id, row).await?);
            }
            let existing = am
                .find_multi_scoped(
                    endpoints::LINE_ITEMS,
                    &[("orderId", order_id.clone())],
                    "name",
                    key_values(&desired, "name"),
                )
                .await?;
            reconcile_chunk(
                am,
                &mut report,
                "name",
                desired,
                &existing,
                true,
                endpoints::CREATE_LINE_ITEMS,
            )
            .await?;
        }
    }
    Ok(report)
}
