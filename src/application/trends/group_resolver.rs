use crate::domain::catalog::{DomainId, DomainRecord, FilterMatcher, Group};
use crate::domain::errors::FilterError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How a group is expanded into domain identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// Membership when any domain carries a group id, criteria otherwise
    #[default]
    Auto,
    /// `domain.group_id == group.id`
    Membership,
    /// Evaluate the group's filter criteria against every domain
    Criteria,
}

impl ResolutionStrategy {
    /// Settle `Auto` against the data actually loaded
    pub fn effective(self, universe: &[DomainRecord]) -> Self {
        match self {
            ResolutionStrategy::Auto => {
                if universe.iter().any(|d| d.group_id.is_some()) {
                    ResolutionStrategy::Membership
                } else {
                    ResolutionStrategy::Criteria
                }
            }
            other => other,
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ResolutionStrategy::Auto),
            "membership" => Ok(ResolutionStrategy::Membership),
            "criteria" => Ok(ResolutionStrategy::Criteria),
            _ => Err(anyhow!(
                "Invalid group resolution: {}. Must be 'auto', 'membership' or 'criteria'",
                s
            )),
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Auto => write!(f, "auto"),
            ResolutionStrategy::Membership => write!(f, "membership"),
            ResolutionStrategy::Criteria => write!(f, "criteria"),
        }
    }
}

/// Expands a group into the set of matching domain identifiers
#[derive(Debug, Clone, Copy)]
pub struct GroupResolver {
    strategy: ResolutionStrategy,
    matcher: FilterMatcher,
}

impl GroupResolver {
    pub fn new(strategy: ResolutionStrategy, matcher: FilterMatcher) -> Self {
        Self { strategy, matcher }
    }

    /// Build a resolver with `Auto` already settled for this universe, so the
    /// choice is made once per run rather than once per group.
    pub fn for_universe(
        strategy: ResolutionStrategy,
        matcher: FilterMatcher,
        universe: &[DomainRecord],
    ) -> Self {
        Self::new(strategy.effective(universe), matcher)
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// An empty set is a valid outcome. Invalid criteria only fail under the
    /// criteria strategy; membership never looks at them.
    pub fn resolve(
        &self,
        group: &Group,
        universe: &[DomainRecord],
    ) -> Result<BTreeSet<DomainId>, FilterError> {
        match self.strategy.effective(universe) {
            ResolutionStrategy::Membership => Ok(universe
                .iter()
                .filter(|d| d.group_id.as_deref() == Some(group.id.as_str()))
                .map(|d| d.id.clone())
                .collect()),
            _ => {
                let criteria = group.criteria.as_ref().map_err(|e| e.clone())?;
                Ok(universe
                    .iter()
                    .filter(|d| self.matcher.matches(d, criteria))
                    .map(|d| d.id.clone())
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::FilterCriteria;
    use serde_json::json;

    fn domain(id: &str, name: &str, group_id: Option<&str>) -> DomainRecord {
        DomainRecord {
            id: id.to_string(),
            name: name.to_string(),
            tld: name.rsplit('.').next().unwrap_or_default().to_string(),
            word_count: 2,
            keywords: Vec::new(),
            group_id: group_id.map(str::to_string),
        }
    }

    fn universe() -> Vec<DomainRecord> {
        vec![
            domain("1", "aiworld.com", None),
            domain("2", "fairtrade.com", None),
            domain("3", "aibot.io", None),
        ]
    }

    fn ids(values: &[&str]) -> BTreeSet<DomainId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_criteria_resolution() {
        let group = Group::from_raw("g1", "ai", Some(&json!({"starts_with": "ai"})));
        let resolver = GroupResolver::new(ResolutionStrategy::Criteria, FilterMatcher::default());

        assert_eq!(resolver.resolve(&group, &universe()).unwrap(), ids(&["1", "3"]));
    }

    #[test]
    fn test_empty_match_is_not_an_error() {
        let group = Group::from_raw("g1", "zz", Some(&json!({"starts_with": "zz"})));
        let resolver = GroupResolver::new(ResolutionStrategy::Criteria, FilterMatcher::default());

        assert!(resolver.resolve(&group, &universe()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_criteria_surface_as_error() {
        let group = Group::from_raw("g1", "broken", Some(&json!("{not json")));
        let resolver = GroupResolver::new(ResolutionStrategy::Criteria, FilterMatcher::default());

        assert!(matches!(
            resolver.resolve(&group, &universe()),
            Err(FilterError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_membership_resolution_ignores_criteria() {
        let universe = vec![
            domain("1", "aiworld.com", Some("g1")),
            domain("2", "fairtrade.com", Some("g2")),
            domain("3", "aibot.io", Some("g1")),
            domain("4", "untagged.net", None),
        ];
        let group = Group::from_raw("g1", "tagged", Some(&json!("{not json")));
        let resolver = GroupResolver::for_universe(
            ResolutionStrategy::Auto,
            FilterMatcher::default(),
            &universe,
        );

        assert_eq!(resolver.strategy(), ResolutionStrategy::Membership);
        assert_eq!(resolver.resolve(&group, &universe).unwrap(), ids(&["1", "3"]));
    }

    #[test]
    fn test_auto_without_tags_uses_criteria() {
        assert_eq!(
            ResolutionStrategy::Auto.effective(&universe()),
            ResolutionStrategy::Criteria
        );

        let group = Group::new("g1", "io", FilterCriteria {
            tld: Some("io".to_string()),
            ..Default::default()
        });
        let resolver = GroupResolver::for_universe(
            ResolutionStrategy::Auto,
            FilterMatcher::default(),
            &universe(),
        );
        assert_eq!(resolver.resolve(&group, &universe()).unwrap(), ids(&["3"]));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            ResolutionStrategy::from_str("Membership").unwrap(),
            ResolutionStrategy::Membership
        );
        assert!(ResolutionStrategy::from_str("tags").is_err());
    }
}
