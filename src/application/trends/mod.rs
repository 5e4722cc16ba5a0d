//! The trend engine: resolve groups, aggregate their sales, reconcile the
//! resulting rows with the trend store.

pub mod group_resolver;
pub mod pipeline;
pub mod sale_aggregator;
pub mod trend_reconciler;

pub use group_resolver::{GroupResolver, ResolutionStrategy};
pub use pipeline::{PipelineSettings, RunReport, SkipReason, SkippedGroup, TrendPipeline};
pub use sale_aggregator::{AggregateResult, MonthlyTrend, SaleAggregator, TrendSnapshot};
pub use trend_reconciler::{
    ReconciliationPlan, ReconciliationPolicy, ReconciliationReport, TrendReconciler,
};
