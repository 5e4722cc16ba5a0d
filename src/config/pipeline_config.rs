//! Trend pipeline policy settings from environment variables.
//!
//! Every policy the engine supports is chosen here explicitly. Invalid values
//! are startup errors rather than silent fallbacks.

use crate::application::trends::{PipelineSettings, ReconciliationPolicy, ResolutionStrategy};
use crate::domain::catalog::AffixPolicy;
use crate::domain::trends::{DEFAULT_ROLLING_MONTHS, TrendGranularity, WindowAnchor};
use anyhow::{Context, Result, bail};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEnvConfig {
    pub policy: ReconciliationPolicy,
    pub allow_partial_snapshot: bool,
    pub anchor: WindowAnchor,
    pub rolling_months: u32,
    pub granularity: TrendGranularity,
    pub resolution: ResolutionStrategy,
    pub affix_policy: AffixPolicy,
}

impl Default for PipelineEnvConfig {
    fn default() -> Self {
        Self {
            policy: ReconciliationPolicy::Upsert,
            allow_partial_snapshot: false,
            anchor: WindowAnchor::LatestSale,
            rolling_months: DEFAULT_ROLLING_MONTHS,
            granularity: TrendGranularity::Snapshot,
            resolution: ResolutionStrategy::Auto,
            affix_policy: AffixPolicy::All,
        }
    }
}

impl PipelineEnvConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let rolling_months = parse_or("TRENDS_ROLLING_MONTHS", &lookup, defaults.rolling_months)?;
        if rolling_months == 0 {
            bail!("TRENDS_ROLLING_MONTHS must be at least 1");
        }

        Ok(Self {
            policy: parse_or("TRENDS_RECONCILE_POLICY", &lookup, defaults.policy)?,
            allow_partial_snapshot: parse_or(
                "TRENDS_ALLOW_PARTIAL_SNAPSHOT",
                &lookup,
                defaults.allow_partial_snapshot,
            )?,
            anchor: parse_or("TRENDS_WINDOW_ANCHOR", &lookup, defaults.anchor)?,
            rolling_months,
            granularity: parse_or("TRENDS_GRANULARITY", &lookup, defaults.granularity)?,
            resolution: parse_or("TRENDS_GROUP_RESOLUTION", &lookup, defaults.resolution)?,
            affix_policy: parse_or("TRENDS_AFFIX_MATCH", &lookup, defaults.affix_policy)?,
        })
    }

    pub fn to_settings(&self, dry_run: bool) -> PipelineSettings {
        PipelineSettings {
            anchor: self.anchor,
            rolling_months: self.rolling_months,
            granularity: self.granularity,
            resolution: self.resolution,
            affix_policy: self.affix_policy,
            policy: self.policy,
            allow_partial_snapshot: self.allow_partial_snapshot,
            dry_run,
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to parse {}", key)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineEnvConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineEnvConfig::default());
        assert_eq!(config.rolling_months, 6);
    }

    #[test]
    fn test_pipeline_config_overrides() {
        let config = PipelineEnvConfig::from_lookup(lookup(&[
            ("TRENDS_RECONCILE_POLICY", "full-replace"),
            ("TRENDS_ALLOW_PARTIAL_SNAPSHOT", "true"),
            ("TRENDS_WINDOW_ANCHOR", "2024-06-30"),
            ("TRENDS_ROLLING_MONTHS", "3"),
            ("TRENDS_GRANULARITY", "monthly"),
            ("TRENDS_GROUP_RESOLUTION", "criteria"),
            ("TRENDS_AFFIX_MATCH", "first"),
        ]))
        .unwrap();

        assert_eq!(config.policy, ReconciliationPolicy::FullReplace);
        assert!(config.allow_partial_snapshot);
        assert_eq!(
            config.anchor,
            WindowAnchor::Fixed(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
        );
        assert_eq!(config.rolling_months, 3);
        assert_eq!(config.granularity, TrendGranularity::Monthly);
        assert_eq!(config.resolution, ResolutionStrategy::Criteria);
        assert_eq!(config.affix_policy, AffixPolicy::FirstSpecified);

        let settings = config.to_settings(true);
        assert!(settings.dry_run);
        assert_eq!(settings.rolling_months, 3);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = PipelineEnvConfig::from_lookup(lookup(&[("TRENDS_RECONCILE_POLICY", "merge")]))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("TRENDS_RECONCILE_POLICY"));

        assert!(
            PipelineEnvConfig::from_lookup(lookup(&[("TRENDS_ROLLING_MONTHS", "0")])).is_err()
        );
        assert!(
            PipelineEnvConfig::from_lookup(lookup(&[("TRENDS_ALLOW_PARTIAL_SNAPSHOT", "maybe")]))
                .is_err()
        );
    }
}
