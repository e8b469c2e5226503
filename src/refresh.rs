//! The refresh pipeline: fetch countries, resolve exchange rates, merge them,
//! persist each country, stamp the status row, invalidate listings and
//! render the summary.
//!
//! Stages run in order `Idle → FetchingCountries → FetchingRates → Merging →
//! Persisting → Invalidating → Rendering → Done`, ending in `Failed` instead
//! when a stage errors. A failed fetch aborts before anything is written.
//! While persisting, a record that fails to save is skipped and the rest of
//! the batch continues. A render failure is returned to the caller but does
//! not undo the committed batch.
//!
//! Refreshes are not mutually exclusive. Two concurrent refreshes interleave
//! at record granularity and the last write of each record wins; only the
//! exchange-rate fetch is shared through the rate cache.

use crate::core::aggregate::{GdpMultiplier, Merged, WriteIntent, merge, should_skip};
use crate::core::country::{StatusRecord, name_key, serialize_timestamp};
use crate::core::error::{AppError, AppResult};
use crate::core::source::CountrySource;
use crate::core::store::CountryStore;
use crate::providers::RateCache;
use crate::service::CountryService;
use crate::summary::{SummaryArtifact, SummaryData, SummaryRenderer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Idle,
    FetchingCountries,
    FetchingRates,
    Merging,
    Persisting,
    Invalidating,
    Rendering,
    Done,
    Failed,
}

impl Display for RefreshStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RefreshStage::Idle => "idle",
            RefreshStage::FetchingCountries => "fetching countries",
            RefreshStage::FetchingRates => "fetching rates",
            RefreshStage::Merging => "merging",
            RefreshStage::Persisting => "persisting",
            RefreshStage::Invalidating => "invalidating",
            RefreshStage::Rendering => "rendering",
            RefreshStage::Done => "done",
            RefreshStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Outcome of a committed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    #[serde(serialize_with = "serialize_timestamp")]
    pub refreshed_at: DateTime<Utc>,
    pub created: usize,
    pub updated: usize,
    /// Dropped by the skip rule (no name or no population).
    pub skipped: usize,
    /// Could not be loaded or saved.
    pub failed: usize,
}

impl RefreshReport {
    fn new(refreshed_at: DateTime<Utc>) -> Self {
        RefreshReport {
            refreshed_at,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Error from a refresh together with the batch it may have committed.
#[derive(Debug)]
pub struct RefreshError {
    /// The stage that failed.
    pub stage: RefreshStage,
    pub error: AppError,
    /// Present when the failure came after the batch was written.
    pub report: Option<RefreshReport>,
}

impl Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "refresh failed while {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct RefreshPipeline {
    countries: Arc<dyn CountrySource>,
    rates: Arc<RateCache>,
    store: Arc<dyn CountryStore>,
    service: CountryService,
    renderer: Arc<dyn SummaryRenderer>,
    artifact: SummaryArtifact,
    multiplier: Arc<dyn GdpMultiplier>,
    stage: watch::Sender<RefreshStage>,
}

impl RefreshPipeline {
    pub fn new(
        countries: Arc<dyn CountrySource>,
        rates: Arc<RateCache>,
        store: Arc<dyn CountryStore>,
        service: CountryService,
        renderer: Arc<dyn SummaryRenderer>,
        artifact: SummaryArtifact,
        multiplier: Arc<dyn GdpMultiplier>,
    ) -> Self {
        let (stage, _) = watch::channel(RefreshStage::Idle);
        Self {
            countries,
            rates,
            store,
            service,
            renderer,
            artifact,
            multiplier,
            stage,
        }
    }

    /// Stage of the most recent refresh, `Idle` before the first one.
    pub fn stage(&self) -> RefreshStage {
        *self.stage.borrow()
    }

    pub fn watch_stage(&self) -> watch::Receiver<RefreshStage> {
        self.stage.subscribe()
    }

    fn enter(&self, stage: RefreshStage) -> RefreshStage {
        debug!(%stage, "Refresh stage");
        self.stage.send_replace(stage);
        stage
    }

    pub async fn run(&self) -> Result<RefreshReport, RefreshError> {
        let result = self.run_stages().await;
        match &result {
            Ok(report) => {
                self.enter(RefreshStage::Done);
                info!(
                    created = report.created,
                    updated = report.updated,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Refresh completed"
                );
            }
            Err(e) => {
                self.enter(RefreshStage::Failed);
                warn!(stage = %e.stage, error = %e.error, "Refresh failed");
            }
        }
        result
    }

    async fn run_stages(&self) -> Result<RefreshReport, RefreshError> {
        let fail = |stage, error, report| RefreshError {
            stage,
            error,
            report,
        };
        let refreshed_at = Utc::now();
        info!(%refreshed_at, "Starting refresh");

        let stage = self.enter(RefreshStage::FetchingCountries);
        let raw_countries = self
            .countries
            .fetch_countries()
            .await
            .map_err(|e| fail(stage, e, None))?;

        let stage = self.enter(RefreshStage::FetchingRates);
        let snapshot = self
            .rates
            .snapshot()
            .await
            .map_err(|e| fail(stage, e, None))?;

        self.enter(RefreshStage::Merging);
        debug!(countries = raw_countries.len(), rates = snapshot.rates.len());
        let mut report = RefreshReport::new(refreshed_at);
        let mut pending: Vec<Merged> = Vec::with_capacity(raw_countries.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for raw in &raw_countries {
            if should_skip(raw) {
                report.skipped += 1;
                continue;
            }

            let key = name_key(&raw.name);
            if let Some(&i) = positions.get(&key) {
                // Same name twice in one listing: the later entry wins
                let intent = pending[i].intent;
                let previous = Some(pending[i].record.clone());
                pending[i] = Merged {
                    intent,
                    ..merge(
                        raw,
                        &snapshot.rates,
                        previous,
                        refreshed_at,
                        self.multiplier.as_ref(),
                    )
                };
                continue;
            }

            let existing = match self.store.find_by_name(&raw.name).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(country = %raw.name, error = %e, "Skipping country, lookup failed");
                    report.failed += 1;
                    continue;
                }
            };
            positions.insert(key, pending.len());
            pending.push(merge(
                raw,
                &snapshot.rates,
                existing,
                refreshed_at,
                self.multiplier.as_ref(),
            ));
        }

        let stage = self.enter(RefreshStage::Persisting);
        for merged in &pending {
            if let Err(e) = self.store.save(&merged.record).await {
                warn!(country = %merged.record.name, error = %e, "Skipping country, save failed");
                report.failed += 1;
                continue;
            }
            match merged.intent {
                WriteIntent::Create => report.created += 1,
                WriteIntent::Update => report.updated += 1,
            }
        }
        if let Err(e) = self
            .store
            .save_status(&StatusRecord {
                last_refreshed_at: refreshed_at,
            })
            .await
        {
            // The batch is committed; listings must still see it.
            self.service.invalidate_listings().await;
            return Err(fail(stage, e, Some(report)));
        }

        self.enter(RefreshStage::Invalidating);
        self.service.invalidate_listings().await;

        let stage = self.enter(RefreshStage::Rendering);
        self.render()
            .await
            .map_err(|e| fail(stage, e, Some(report.clone())))?;

        Ok(report)
    }

    /// Media type of the artifact this pipeline writes.
    pub fn summary_content_type(&self) -> &'static str {
        self.renderer.content_type()
    }

    async fn render(&self) -> AppResult<()> {
        let data = SummaryData::load(self.store.as_ref()).await?;
        let bytes = self.renderer.render(&data)?;
        self.artifact.write(&bytes).await
    }
}
