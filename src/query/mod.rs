//! Listing requests: parameter validation, safelisted sorting and page metadata.

pub mod filters;
pub mod metadata;
pub mod planner;

pub use filters::{Filters, SortKey};
pub use metadata::Metadata;
pub use planner::{QueryPlanner, QuotePlan};
