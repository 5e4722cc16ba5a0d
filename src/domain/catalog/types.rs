use crate::domain::catalog::filter_criteria::FilterCriteria;
use crate::domain::errors::FilterError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type DomainId = String;

/// A registered domain name as read from the `dn` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: DomainId,
    pub name: String,
    pub tld: String,
    pub word_count: u32,
    /// Keywords derived from the name, in order. May be empty.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Precomputed group membership, when the store tags domains directly.
    #[serde(default)]
    pub group_id: Option<String>,
}

/// A historical sale of one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub domain_id: DomainId,
    pub date: NaiveDate,
    pub price_adjusted: Decimal,
}

/// A named segment of the domain universe.
///
/// Criteria are validated once, when the group is loaded. A group whose
/// criteria failed validation keeps the error so the pipeline can skip it
/// without aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub criteria: Result<FilterCriteria, FilterError>,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>, criteria: FilterCriteria) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            criteria: Ok(criteria),
        }
    }

    /// Build a group from loosely-typed stored filters (JSON object, JSON text or null).
    pub fn from_raw(
        id: impl Into<String>,
        name: impl Into<String>,
        filters: Option<&serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            criteria: FilterCriteria::from_value(filters),
        }
    }

    /// Label used as the trend row key
    pub fn label(&self) -> &str {
        &self.name
    }
}
