use crate::domain::errors::ReconcileError;
use crate::domain::repositories::TrendRepository;
use crate::domain::trends::{TrendKey, TrendRow};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How freshly computed rows are merged into the stored trend set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReconciliationPolicy {
    /// Insert or update by key; rows absent from the batch are left untouched
    #[default]
    Upsert,
    /// Delete every stored row, then insert the batch
    FullReplace,
}

impl FromStr for ReconciliationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upsert" => Ok(ReconciliationPolicy::Upsert),
            "full-replace" | "full_replace" | "replace" => Ok(ReconciliationPolicy::FullReplace),
            _ => Err(anyhow!(
                "Invalid reconciliation policy: {}. Must be 'upsert' or 'full-replace'",
                s
            )),
        }
    }
}

impl fmt::Display for ReconciliationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationPolicy::Upsert => write!(f, "upsert"),
            ReconciliationPolicy::FullReplace => write!(f, "full-replace"),
        }
    }
}

/// What a reconciliation would do, computed without touching the store
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan {
    pub policy: ReconciliationPolicy,
    /// Deduplicated batch, ordered by key
    pub rows: Vec<TrendRow>,
    pub inserts: usize,
    pub updates: usize,
    pub unchanged: usize,
    /// Stored rows that disappear (full replace only)
    pub deletes: usize,
    pub duplicates_dropped: usize,
}

impl ReconciliationPlan {
    pub fn is_noop(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub policy: ReconciliationPolicy,
    /// False when nothing was written (empty batch or dry run)
    pub applied: bool,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub duplicates_dropped: usize,
}

impl ReconciliationReport {
    fn from_plan(plan: &ReconciliationPlan, applied: bool) -> Self {
        Self {
            policy: plan.policy,
            applied,
            inserted: plan.inserts,
            updated: plan.updates,
            unchanged: plan.unchanged,
            deleted: plan.deletes,
            duplicates_dropped: plan.duplicates_dropped,
        }
    }
}

/// Makes the stored trend set reflect a freshly computed batch
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendReconciler {
    policy: ReconciliationPolicy,
    allow_partial_snapshot: bool,
}

impl TrendReconciler {
    /// `allow_partial_snapshot` lets a full replace drop groups that are
    /// missing from the batch. Without it such a batch is refused.
    pub fn new(policy: ReconciliationPolicy, allow_partial_snapshot: bool) -> Self {
        Self {
            policy,
            allow_partial_snapshot,
        }
    }

    pub fn plan(
        &self,
        rows: Vec<TrendRow>,
        existing: &[TrendRow],
    ) -> Result<ReconciliationPlan, ReconcileError> {
        let batch_len = rows.len();
        let mut batch: BTreeMap<TrendKey, TrendRow> = BTreeMap::new();
        for row in rows {
            if let Some(previous) = batch.insert(row.key(), row) {
                warn!(
                    "Reconciler: duplicate trend key {} in batch, keeping the last row",
                    previous.key()
                );
            }
        }
        let duplicates_dropped = batch_len - batch.len();

        let mut plan = ReconciliationPlan {
            policy: self.policy,
            rows: Vec::with_capacity(batch.len()),
            inserts: 0,
            updates: 0,
            unchanged: 0,
            deletes: 0,
            duplicates_dropped,
        };
        if batch.is_empty() {
            return Ok(plan);
        }

        let stored: HashMap<TrendKey, &TrendRow> = existing.iter().map(|r| (r.key(), r)).collect();

        if self.policy == ReconciliationPolicy::FullReplace {
            let batch_groups: BTreeSet<&str> =
                batch.keys().map(|k| k.group_label.as_str()).collect();
            let missing_groups: BTreeSet<&str> = existing
                .iter()
                .map(|r| r.group_label.as_str())
                .filter(|label| !batch_groups.contains(label))
                .collect();

            if !missing_groups.is_empty() && !self.allow_partial_snapshot {
                return Err(ReconcileError::PartialBatch {
                    missing_groups: missing_groups.into_iter().map(str::to_string).collect(),
                });
            }
            plan.deletes = stored.keys().filter(|k| !batch.contains_key(*k)).count();
        }

        for (key, row) in batch {
            match stored.get(&key) {
                None => plan.inserts += 1,
                Some(old) if **old == row => plan.unchanged += 1,
                Some(_) => plan.updates += 1,
            }
            plan.rows.push(row);
        }

        Ok(plan)
    }

    /// Apply a plan atomically. An empty plan writes nothing.
    pub async fn execute(
        &self,
        plan: ReconciliationPlan,
        store: &dyn TrendRepository,
    ) -> Result<ReconciliationReport, ReconcileError> {
        if plan.is_noop() {
            info!("Reconciler: empty batch, trend store left untouched");
            return Ok(ReconciliationReport::from_plan(&plan, false));
        }

        match plan.policy {
            ReconciliationPolicy::Upsert => {
                store.upsert_batch(&plan.rows).await.map_err(store_error)?;
            }
            ReconciliationPolicy::FullReplace => {
                let cleared = store.replace_all(&plan.rows).await.map_err(store_error)?;
                debug!("Reconciler: full replace cleared {} stored rows", cleared);
            }
        }

        let report = ReconciliationReport::from_plan(&plan, true);
        info!(
            "Reconciler: {} applied ({} inserted, {} updated, {} unchanged, {} deleted)",
            report.policy, report.inserted, report.updated, report.unchanged, report.deleted
        );
        Ok(report)
    }

    /// Plan against the stored set without writing anything
    pub async fn preview(
        &self,
        rows: Vec<TrendRow>,
        store: &dyn TrendRepository,
    ) -> Result<ReconciliationReport, ReconcileError> {
        let existing = store.load_all().await.map_err(store_error)?;
        let plan = self.plan(rows, &existing)?;
        Ok(ReconciliationReport::from_plan(&plan, false))
    }

    /// Load the stored set, plan against it and apply the plan
    pub async fn reconcile(
        &self,
        rows: Vec<TrendRow>,
        store: &dyn TrendRepository,
    ) -> Result<ReconciliationReport, ReconcileError> {
        let existing = store.load_all().await.map_err(store_error)?;
        let plan = self.plan(rows, &existing)?;
        self.execute(plan, store).await
    }
}

fn store_error(e: anyhow::Error) -> ReconcileError {
    ReconcileError::Store {
        reason: format!("{:#}", e),
    }
}
