use gasp_reconcile::Setting;
use gasp_rows::{columns, Row};
use serde_json::Value;
use tracing::info;

use super::{key_values, reconcile_chunk, Pacer, StageReport, SyncSettings};
use crate::cache::{entity_id, AdManager};
use crate::error::SyncError;
use crate::service::{endpoints, AdManagerService};

/// Desired order: `name` plus resolved advertiser and trafficker ids.
pub async fn order_setting<S: AdManagerService>(
    am: &mut AdManager<S>,
    row: &Row,
) -> Result<Setting, SyncError> {
    let advertiser = am.find_advertiser(row.value(columns::ADVERTISER_NAME)).await?;
    let trafficker = am.find_trafficker(row.value(columns::TRAFFICKER_NAME)).await?;

    let mut s = Setting::new();
    s.insert("name".into(), Value::from(row.value(columns::NAME)));
    s.insert(
        "advertiserId".into(),
        entity_id(endpoints::COMPANIES, &advertiser)?,
    );
    s.insert(
        "traffickerId".into(),
        entity_id(endpoints::USERS, &trafficker)?,
    );
    Ok(s)
}

/// Orders are matched by name and compared field by field.
pub async fn sync_orders<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    rows: &[Row],
) -> Result<StageReport, SyncError> {
    let mut report = StageReport::new("orders");
    let mut pacer = Pacer::new(settings.pause());

    for chunk in rows.chunks(settings.chunk_size()) {
        pacer.next_chunk(&mut report).await;
        info!(stage = report.stage, chunk = report.chunks, rows = chunk.len(), "checking chunk");

        let mut desired = Vec::with_capacity(chunk.len());
        for row in chunk {
            desired.push(order_setting(am, row).await?);
        }
        let existing = am
            .find_multi(endpoints::ORDERS, "name", key_values(&desired, "name"))
            .await?;
        reconcile_chunk(
            am,
            &mut report,
            "name",
            desired,
            &existing,
            false,
            endpoints::CREATE_ORDERS,
        )
        .await?;
    }
    Ok(report)
}
