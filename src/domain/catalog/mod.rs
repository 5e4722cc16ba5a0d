//! Domain-name catalog: the records a trend run reads and the group filters
//! that segment them.

pub mod filter_criteria;
pub mod types;

pub use filter_criteria::{AffixPolicy, FilterCriteria, FilterMatcher, matches};
pub use types::{DomainId, DomainRecord, Group, SaleRecord};
