//! Pipeline orchestrator.
//!
//! One run: validate all rows, then orders → line items → creatives →
//! associations, strictly in sequence. The first error aborts the run;
//! objects created by earlier chunks stay created, and a rerun converges
//! because every stage only creates what is missing.

use chrono::{DateTime, Utc};
use gasp_rows::{RowSource, SheetType};
use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::cache::{AdManager, RemoteCallStats};
use crate::error::SyncError;
use crate::service::AdManagerService;
use crate::sync::{
    sync_associations, sync_creatives, sync_lineitems, sync_orders, StageReport, SyncSettings,
};

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    pub remote: RemoteCallStats,
}

impl SyncReport {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn total_created(&self) -> usize {
        self.stages.iter().map(|s| s.created).sum()
    }
}

pub struct Pipeline<S> {
    admanager: AdManager<S>,
    settings: SyncSettings,
}

impl<S: AdManagerService> Pipeline<S> {
    pub fn new(service: S, settings: SyncSettings) -> Self {
        Self {
            admanager: AdManager::new(service),
            settings,
        }
    }

    pub fn admanager(&self) -> &AdManager<S> {
        &self.admanager
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Every run starts with an empty lookup cache and zeroed call stats,
    /// so a report only counts that run's traffic.
    pub async fn run<R: RowSource + ?Sized>(&mut self, source: &R) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync", %run_id);
        self.run_inner(run_id, source).instrument(span).await
    }

    async fn run_inner<R: RowSource + ?Sized>(
        &mut self,
        run_id: Uuid,
        source: &R,
    ) -> Result<SyncReport, SyncError> {
        let started_at_utc = Utc::now();
        self.admanager.reset();

        let keys = source.check_settings()?;
        info!(
            orders = keys.order_names.len(),
            lineitems = keys.lineitem_keys.len(),
            creatives = keys.creative_names.len(),
            "rows validated"
        );

        let orders = source.fetch_rows(SheetType::Order)?;
        let lineitems = source.fetch_rows(SheetType::LineItem)?;
        let creatives = source.fetch_rows(SheetType::Creative)?;

        let am = &mut self.admanager;
        let settings = &self.settings;

        let mut stages = Vec::with_capacity(4);
        stages.push(sync_orders(am, settings, &orders).await?);
        stages.push(sync_lineitems(am, settings, &lineitems).await?);
        stages.push(sync_creatives(am, settings, &creatives, &orders, &lineitems).await?);
        stages.push(sync_associations(am, settings, &orders, &creatives).await?);

        for s in &stages {
            info!(
                stage = s.stage,
                desired = s.desired,
                existing = s.existing,
                created = s.created,
                "stage done"
            );
        }

        Ok(SyncReport {
            run_id,
            started_at_utc,
            finished_at_utc: Utc::now(),
            stages,
            remote: self.admanager.stats(),
        })
    }
}
