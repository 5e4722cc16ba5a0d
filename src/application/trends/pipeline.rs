use crate::application::trends::group_resolver::{GroupResolver, ResolutionStrategy};
use crate::application::trends::sale_aggregator::{AggregateResult, SaleAggregator};
use crate::application::trends::trend_reconciler::{
    ReconciliationPolicy, ReconciliationReport, TrendReconciler,
};
use crate::domain::catalog::{AffixPolicy, FilterMatcher, Group, SaleRecord};
use crate::domain::errors::PipelineError;
use crate::domain::repositories::{MarketDataRepository, TrendRepository};
use crate::domain::trends::{DEFAULT_ROLLING_MONTHS, TrendGranularity, TrendRow, WindowAnchor};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Per-run choices. Every policy is explicit, nothing is inferred mid-run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub anchor: WindowAnchor,
    pub rolling_months: u32,
    pub granularity: TrendGranularity,
    pub resolution: ResolutionStrategy,
    pub affix_policy: AffixPolicy,
    pub policy: ReconciliationPolicy,
    pub allow_partial_snapshot: bool,
    /// Compute and plan, but never write
    pub dry_run: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            anchor: WindowAnchor::default(),
            rolling_months: DEFAULT_ROLLING_MONTHS,
            granularity: TrendGranularity::default(),
            resolution: ResolutionStrategy::default(),
            affix_policy: AffixPolicy::default(),
            policy: ReconciliationPolicy::default(),
            allow_partial_snapshot: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MalformedCriteria,
    NoMatchingDomains,
    NoSales,
    /// Another group already produced rows under the same label
    DuplicateLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedGroup {
    pub group_id: String,
    pub group_name: String,
    pub reason: SkipReason,
    pub detail: Option<String>,
}

/// Summary of one run. Every recoverable condition shows up here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    pub resolution: ResolutionStrategy,
    pub groups_total: usize,
    pub groups_processed: usize,
    pub skipped: Vec<SkippedGroup>,
    pub rows_produced: usize,
    pub reconciliation: ReconciliationReport,
}

impl RunReport {
    pub fn groups_skipped(&self) -> usize {
        self.skipped.len()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// Orchestrates load, resolve, aggregate and reconcile for every group
pub struct TrendPipeline {
    market_data: Arc<dyn MarketDataRepository>,
    trend_store: Arc<dyn TrendRepository>,
    settings: PipelineSettings,
}

impl TrendPipeline {
    pub fn new(
        market_data: Arc<dyn MarketDataRepository>,
        trend_store: Arc<dyn TrendRepository>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            market_data,
            trend_store,
            settings,
        }
    }

    /// Run once. `run_date` anchors the window when the anchor is `RunDate`.
    ///
    /// Load failures and empty inputs abort before anything is written.
    /// Per-group problems are skipped and reported.
    pub async fn run(&self, run_date: NaiveDate) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id, run_date)
            .instrument(info_span!("trend_run", %run_id))
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        run_date: NaiveDate,
    ) -> Result<RunReport, PipelineError> {
        let settings = &self.settings;
        info!(
            "Pipeline: starting run (anchor={}, granularity={}, policy={}, dry_run={})",
            settings.anchor, settings.granularity, settings.policy, settings.dry_run
        );

        let (domains, sales, groups) = tokio::try_join!(
            load_snapshot("domains", self.market_data.load_domains()),
            load_snapshot("sales", self.market_data.load_sales()),
            load_snapshot("groups", self.market_data.load_groups()),
        )?;

        let mut sales_by_domain: HashMap<&str, Vec<&SaleRecord>> = HashMap::new();
        for sale in &sales {
            sales_by_domain
                .entry(sale.domain_id.as_str())
                .or_default()
                .push(sale);
        }

        let as_of = settings.anchor.resolve(sales.iter().map(|s| s.date), run_date);
        let resolver = GroupResolver::for_universe(
            settings.resolution,
            FilterMatcher::new(settings.affix_policy),
            &domains,
        );
        let aggregator = SaleAggregator::new(settings.rolling_months);
        info!(
            "Pipeline: as_of={}, resolution={}, {} groups to process",
            as_of,
            resolver.strategy(),
            groups.len()
        );

        let mut rows: Vec<TrendRow> = Vec::new();
        let mut skipped: Vec<SkippedGroup> = Vec::new();
        let mut groups_processed = 0;
        // label -> id of the group whose rows own it
        let mut claimed_labels: HashMap<&str, &str> = HashMap::new();

        for group in &groups {
            if let Some(owner) = claimed_labels.get(group.label()) {
                let detail = format!(
                    "label '{}' already produced by group {}",
                    group.label(),
                    owner
                );
                skipped.push(skip(group, SkipReason::DuplicateLabel, Some(detail)));
                continue;
            }
            let domain_ids = match resolver.resolve(group, &domains) {
                Ok(ids) => ids,
                Err(e) => {
                    skipped.push(skip(group, SkipReason::MalformedCriteria, Some(e.to_string())));
                    continue;
                }
            };
            if domain_ids.is_empty() {
                skipped.push(skip(group, SkipReason::NoMatchingDomains, None));
                continue;
            }

            let group_sales = domain_ids
                .iter()
                .filter_map(|id| sales_by_domain.get(id.as_str()))
                .flatten()
                .copied();

            match aggregator.aggregate(group_sales, as_of) {
                AggregateResult::NoData => {
                    skipped.push(skip(group, SkipReason::NoSales, None));
                }
                AggregateResult::Computed(snapshot) => {
                    let group_rows = snapshot.to_rows(group.label(), settings.granularity);
                    debug!(
                        "Pipeline: group '{}' matched {} domains, {} sales, {} rows",
                        group.name,
                        domain_ids.len(),
                        snapshot.full.volume,
                        group_rows.len()
                    );
                    rows.extend(group_rows);
                    claimed_labels.insert(group.label(), group.id.as_str());
                    groups_processed += 1;
                }
            }
        }

        let rows_produced = rows.len();
        let reconciler = TrendReconciler::new(settings.policy, settings.allow_partial_snapshot);
        let reconciliation = if settings.dry_run {
            reconciler.preview(rows, self.trend_store.as_ref()).await?
        } else {
            reconciler.reconcile(rows, self.trend_store.as_ref()).await?
        };

        let report = RunReport {
            run_id,
            as_of,
            resolution: resolver.strategy(),
            groups_total: groups.len(),
            groups_processed,
            skipped,
            rows_produced,
            reconciliation,
        };

        info!(
            "Pipeline: run complete. groups={} processed={} skipped={} (malformed={}, no_match={}, no_sales={}, duplicate_label={}) rows={}",
            report.groups_total,
            report.groups_processed,
            report.groups_skipped(),
            report.skipped_for(SkipReason::MalformedCriteria),
            report.skipped_for(SkipReason::NoMatchingDomains),
            report.skipped_for(SkipReason::NoSales),
            report.skipped_for(SkipReason::DuplicateLabel),
            report.rows_produced
        );
        Ok(report)
    }
}

async fn load_snapshot<T>(
    collection: &'static str,
    load: impl Future<Output = anyhow::Result<Vec<T>>>,
) -> Result<Vec<T>, PipelineError> {
    let items = load.await.map_err(|e| PipelineError::LoadFailed {
        collection,
        reason: format!("{:#}", e),
    })?;
    if items.is_empty() {
        return Err(PipelineError::EmptyInput { collection });
    }
    info!("Pipeline: loaded {} {}", items.len(), collection);
    Ok(items)
}

fn skip(group: &Group, reason: SkipReason, detail: Option<String>) -> SkippedGroup {
    match &detail {
        Some(detail) => warn!(
            "Pipeline: skipping group '{}' ({:?}): {}",
            group.name, reason, detail
        ),
        None => warn!("Pipeline: skipping group '{}' ({:?})", group.name, reason),
    }
    SkippedGroup {
        group_id: group.id.clone(),
        group_name: group.name.clone(),
        reason,
        detail,
    }
}
