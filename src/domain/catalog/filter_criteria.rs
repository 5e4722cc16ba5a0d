use crate::domain::catalog::types::DomainRecord;
use crate::domain::errors::FilterError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Declarative filter for one group.
///
/// Text fields are stored case-folded. Absent fields impose no constraint, so
/// `FilterCriteria::default()` matches every domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub tld: Option<String>,
    pub word_count: Option<u32>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
}

impl FilterCriteria {
    /// Validate loosely-typed stored filters.
    ///
    /// Accepts `null` (no constraint), a JSON object, or JSON text encoding an
    /// object. Empty strings count as absent fields. Unknown keys are ignored.
    pub fn from_value(raw: Option<&Value>) -> Result<Self, FilterError> {
        match raw {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Self::from_object(map),
            Some(Value::String(text)) => {
                let parsed: Value =
                    serde_json::from_str(text).map_err(|e| FilterError::InvalidJson {
                        reason: e.to_string(),
                    })?;
                match parsed {
                    Value::Null => Ok(Self::default()),
                    Value::Object(map) => Self::from_object(&map),
                    other => Err(FilterError::NotAnObject {
                        found: json_kind(&other).to_string(),
                    }),
                }
            }
            Some(other) => Err(FilterError::NotAnObject {
                found: json_kind(other).to_string(),
            }),
        }
    }

    /// Parse criteria stored as JSON text
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        Self::from_value(Some(&Value::String(text.to_string())))
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self, FilterError> {
        Ok(Self {
            tld: text_field(map, "tld")?.map(|t| t.trim_start_matches('.').to_string()),
            word_count: count_field(map, "word_count")?,
            starts_with: text_field(map, "starts_with")?,
            ends_with: text_field(map, "ends_with")?,
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.tld.is_none()
            && self.word_count.is_none()
            && self.starts_with.is_none()
            && self.ends_with.is_none()
    }

    /// Match with the default conjunctive affix policy
    pub fn matches(&self, domain: &DomainRecord) -> bool {
        FilterMatcher::default().matches(domain, self)
    }
}

fn text_field(map: &Map<String, Value>, field: &'static str) -> Result<Option<String>, FilterError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_lowercase()))
            }
        }
        Some(other) => Err(FilterError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_kind(other)),
        }),
    }
}

fn count_field(map: &Map<String, Value>, field: &'static str) -> Result<Option<u32>, FilterError> {
    let invalid = |reason: String| FilterError::InvalidField { field, reason };

    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(format!("expected a non-negative integer, got {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| invalid(format!("expected a non-negative integer, got '{}'", s))),
        Some(other) => Err(invalid(format!(
            "expected a non-negative integer, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// How `starts_with` and `ends_with` combine when both are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AffixPolicy {
    /// Both predicates must hold
    #[default]
    All,
    /// The first specified predicate alone decides (`starts_with` before `ends_with`)
    FirstSpecified,
}

impl FromStr for AffixPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(AffixPolicy::All),
            "first" | "first-specified" => Ok(AffixPolicy::FirstSpecified),
            _ => Err(anyhow!(
                "Invalid affix match policy: {}. Must be 'all' or 'first'",
                s
            )),
        }
    }
}

impl fmt::Display for AffixPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffixPolicy::All => write!(f, "all"),
            AffixPolicy::FirstSpecified => write!(f, "first"),
        }
    }
}

/// Evaluates a group's criteria against one domain. Pure, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterMatcher {
    affix_policy: AffixPolicy,
}

impl FilterMatcher {
    pub fn new(affix_policy: AffixPolicy) -> Self {
        Self { affix_policy }
    }

    pub fn matches(&self, domain: &DomainRecord, criteria: &FilterCriteria) -> bool {
        if let Some(tld) = &criteria.tld
            && domain.tld.trim_start_matches('.').to_lowercase() != *tld
        {
            return false;
        }

        if let Some(word_count) = criteria.word_count
            && domain.word_count != word_count
        {
            return false;
        }

        let prefix = criteria.starts_with.as_deref();
        let suffix = criteria.ends_with.as_deref();

        match self.affix_policy {
            AffixPolicy::All => {
                prefix.is_none_or(|p| affix_matches(domain, |c| c.starts_with(p)))
                    && suffix.is_none_or(|s| affix_matches(domain, |c| c.ends_with(s)))
            }
            AffixPolicy::FirstSpecified => match (prefix, suffix) {
                (Some(p), _) => affix_matches(domain, |c| c.starts_with(p)),
                (None, Some(s)) => affix_matches(domain, |c| c.ends_with(s)),
                (None, None) => true,
            },
        }
    }
}

/// Keywords qualify the domain when any one satisfies the predicate.
/// Without keywords the full domain name is tested instead.
fn affix_matches(domain: &DomainRecord, predicate: impl Fn(&str) -> bool) -> bool {
    if domain.keywords.is_empty() {
        predicate(&domain.name.to_lowercase())
    } else {
        domain
            .keywords
            .iter()
            .any(|keyword| predicate(&keyword.to_lowercase()))
    }
}

/// Evaluate `criteria` against `domain` with the conjunctive affix policy
pub fn matches(domain: &DomainRecord, criteria: &FilterCriteria) -> bool {
    criteria.matches(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn domain(name: &str, tld: &str, word_count: u32, keywords: &[&str]) -> DomainRecord {
        DomainRecord {
            id: name.to_string(),
            name: name.to_string(),
            tld: tld.to_string(),
            word_count,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            group_id: None,
        }
    }

    #[test]
    fn test_empty_criteria_matches_everything() {
        let criteria = FilterCriteria::default();
        assert!(criteria.is_unconstrained());

        for d in [
            domain("aiworld.com", "com", 2, &["ai", "world"]),
            domain("x.io", "IO", 1, &[]),
            domain("", "", 0, &[]),
        ] {
            assert!(matches(&d, &criteria));
            assert!(FilterMatcher::new(AffixPolicy::FirstSpecified).matches(&d, &criteria));
        }
    }

    #[test]
    fn test_tld_is_case_insensitive() {
        let criteria = FilterCriteria::parse(r#"{"tld": "COM"}"#).unwrap();

        assert!(matches(&domain("a.com", "com", 1, &[]), &criteria));
        assert!(matches(&domain("a.com", "Com", 1, &[]), &criteria));
        assert!(matches(&domain("a.com", ".com", 1, &[]), &criteria));
        assert!(!matches(&domain("a.io", "io", 1, &[]), &criteria));
    }

    #[test]
    fn test_word_count_exact() {
        let criteria = FilterCriteria::from_value(Some(&json!({"word_count": 2}))).unwrap();

        assert!(matches(&domain("aiworld.com", "com", 2, &[]), &criteria));
        assert!(!matches(&domain("ai.com", "com", 1, &[]), &criteria));
    }

    #[test]
    fn test_word_count_accepts_numeric_string() {
        let criteria = FilterCriteria::from_value(Some(&json!({"word_count": " 3 "}))).unwrap();
        assert_eq!(criteria.word_count, Some(3));
    }

    #[test]
    fn test_prefix_uses_any_keyword() {
        let criteria = FilterCriteria::parse(r#"{"starts_with": "Bot"}"#).unwrap();

        assert!(matches(&domain("aibot.io", "io", 2, &["ai", "bot"]), &criteria));
        assert!(!matches(&domain("robotic.io", "io", 1, &["robotic"]), &criteria));
    }

    #[test]
    fn test_affix_falls_back_to_name_without_keywords() {
        let criteria = FilterCriteria::parse(r#"{"starts_with": "ai"}"#).unwrap();

        assert!(matches(&domain("aiworld.com", "com", 2, &[]), &criteria));
        assert!(!matches(&domain("fairtrade.com", "com", 2, &[]), &criteria));
    }

    #[test]
    fn test_both_affixes_are_anded_by_default() {
        let criteria = FilterCriteria::parse(r#"{"starts_with": "ai", "ends_with": "bot"}"#).unwrap();
        let aibot = domain("aibot", "io", 2, &[]);
        let aiworld = domain("aiworld", "com", 2, &[]);

        assert!(matches(&aibot, &criteria));
        assert!(!matches(&aiworld, &criteria));
    }

    #[test]
    fn test_first_specified_affix_short_circuits() {
        let criteria = FilterCriteria::parse(r#"{"starts_with": "ai", "ends_with": "bot"}"#).unwrap();
        let matcher = FilterMatcher::new(AffixPolicy::FirstSpecified);

        // ends_with is never consulted once starts_with is present
        assert!(matcher.matches(&domain("aiworld", "com", 2, &[]), &criteria));
        assert!(!matcher.matches(&domain("robot", "com", 1, &[]), &criteria));

        let suffix_only = FilterCriteria::parse(r#"{"ends_with": "bot"}"#).unwrap();
        assert!(matcher.matches(&domain("robot", "com", 1, &[]), &suffix_only));
    }

    #[test]
    fn test_constraints_are_anded() {
        let criteria =
            FilterCriteria::parse(r#"{"tld": "com", "word_count": 2, "starts_with": "ai"}"#)
                .unwrap();

        assert!(matches(&domain("aiworld.com", "com", 2, &[]), &criteria));
        assert!(!matches(&domain("aibot.io", "io", 2, &[]), &criteria));
        assert!(!matches(&domain("aiworldwide.com", "com", 3, &[]), &criteria));
    }

    #[test]
    fn test_empty_strings_and_nulls_are_absent() {
        let criteria =
            FilterCriteria::from_value(Some(&json!({"tld": "", "starts_with": null, "word_count": ""})))
                .unwrap();
        assert!(criteria.is_unconstrained());

        assert!(FilterCriteria::from_value(None).unwrap().is_unconstrained());
        assert!(FilterCriteria::parse("null").unwrap().is_unconstrained());
    }

    #[test]
    fn test_malformed_criteria_are_rejected() {
        assert!(matches!(
            FilterCriteria::parse("{tld: com"),
            Err(FilterError::InvalidJson { .. })
        ));
        assert!(matches!(
            FilterCriteria::parse("[1, 2]"),
            Err(FilterError::NotAnObject { .. })
        ));
        assert!(matches!(
            FilterCriteria::from_value(Some(&json!(42))),
            Err(FilterError::NotAnObject { .. })
        ));
        assert_eq!(
            FilterCriteria::from_value(Some(&json!({"word_count": -1}))),
            Err(FilterError::InvalidField {
                field: "word_count",
                reason: "expected a non-negative integer, got -1".to_string(),
            })
        );
        assert!(matches!(
            FilterCriteria::from_value(Some(&json!({"tld": 7}))),
            Err(FilterError::InvalidField { field: "tld", .. })
        ));
    }

    #[test]
    fn test_affix_policy_parsing() {
        assert_eq!(AffixPolicy::from_str("ALL").unwrap(), AffixPolicy::All);
        assert_eq!(
            AffixPolicy::from_str("first").unwrap(),
            AffixPolicy::FirstSpecified
        );
        assert!(AffixPolicy::from_str("any").is_err());
    }
}
