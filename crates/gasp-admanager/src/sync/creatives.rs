use std::collections::BTreeMap;

use gasp_reconcile::Setting;
use gasp_rows::{columns, parse_sizes, Row};
use serde_json::{json, Value};
use tracing::info;

use super::lineitems::size_value;
use super::{key_values, reconcile_chunk, Pacer, StageReport, SyncSettings};
use crate::cache::{entity_id, AdManager};
use crate::error::{ConfigurationError, SyncError};
use crate::service::{endpoints, AdManagerService};

pub const CREATIVE_TYPE: &str = "ThirdPartyCreative";

/// Cross-sheet lookups a creative row needs: its order's advertiser and its
/// line item's sizes.
pub struct CreativeRefs<'a> {
    order_to_advertiser: BTreeMap<&'a str, &'a str>,
    lineitem_to_sizes: BTreeMap<(&'a str, &'a str), &'a str>,
}

impl<'a> CreativeRefs<'a> {
    pub fn new(order_rows: &'a [Row], lineitem_rows: &'a [Row]) -> Self {
        let order_to_advertiser = order_rows
            .iter()
            .map(|o| (o.value(columns::NAME), o.value(columns::ADVERTISER_NAME)))
            .collect();
        let lineitem_to_sizes = lineitem_rows
            .iter()
            .map(|l| {
                (
                    (l.value(columns::ORDER_NAME), l.value(columns::NAME)),
                    l.value(columns::SIZES),
                )
            })
            .collect();
        Self {
            order_to_advertiser,
            lineitem_to_sizes,
        }
    }

    fn advertiser_of(&self, row: &Row) -> Result<&'a str, ConfigurationError> {
        let order = row.value(columns::ORDER_NAME);
        self.order_to_advertiser
            .get(order)
            .copied()
            .ok_or_else(|| ConfigurationError::reference(row, columns::ORDER_NAME, order))
    }

    fn sizes_of(&self, row: &Row) -> Result<&'a str, ConfigurationError> {
        let order = row.value(columns::ORDER_NAME);
        let lineitem = row.value(columns::LINEITEM_NAME);
        self.lineitem_to_sizes
            .get(&(order, lineitem))
            .copied()
            .ok_or_else(|| ConfigurationError::reference(row, columns::LINEITEM_NAME, lineitem))
    }
}

/// Desired third-party creative. Its size is the first size of the line
/// item it is attached to.
pub async fn creative_setting<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    refs: &CreativeRefs<'_>,
    row: &Row,
) -> Result<Setting, SyncError> {
    let advertiser = am.find_advertiser(refs.advertiser_of(row)?).await?;

    let sizes = parse_sizes(refs.sizes_of(row)?)
        .map_err(|e| ConfigurationError::field(row, columns::SIZES, e))?;
    let size = sizes
        .first()
        .copied()
        .ok_or_else(|| ConfigurationError::reference(row, columns::SIZES, ""))?;

    let mut s = Setting::new();
    s.insert("xsi_type".into(), json!(CREATIVE_TYPE));
    s.insert("name".into(), Value::from(row.value(columns::NAME)));
    s.insert(
        "advertiserId".into(),
        entity_id(endpoints::COMPANIES, &advertiser)?,
    );
    s.insert("size".into(), size_value(size));
    s.insert("snippet".into(), Value::from(row.value(columns::SNIPPET)));
    s.insert(
        "isSafeFrameCompatible".into(),
        json!(settings.safe_frame_compatible()),
    );
    Ok(s)
}

/// Creatives are matched by name and compared field by field.
pub async fn sync_creatives<S: AdManagerService>(
    am: &mut AdManager<S>,
    settings: &SyncSettings,
    creative_rows: &[Row],
    order_rows: &[Row],
    lineitem_rows: &[Row],
) -> Result<StageReport, SyncError> {
    let refs = CreativeRefs::new(order_rows, lineitem_rows);
    let mut report = StageReport::new("creatives");
    let mut pacer = Pacer::new(settings.pause());
    let total = creative_rows.len().div_ceil(settings.chunk_size());

    for chunk in creative_rows.chunks(settings.chunk_size()) {
        pacer.next_chunk(&mut report).await;
        info!("creatives: checking ({}/{})", report.chunks, total);

        let mut desired = Vec::with_capacity(chunk.len());
        for row in chunk {
            desired.push(creative_setting(am, settings, &refs, row).await?);
        }
        let existing = am
            .find_multi(endpoints::CREATIVES, "name", key_values(&desired, "name"))
            .await?;
        reconcile_chunk(
            am,
            &mut report,
            "name",
            desired,
            &existing,
            false,
            endpoints::CREATE_CREATIVES,
        )
        .await?;
    }
    Ok(report)
}
