//! Eligibility policy for topic reservations.
//!
//! Only topics created on or after a cutoff timestamp, in one of the allowed
//! categories, get reserved. Both values are deployment policy, loaded from
//! configuration at startup; historically these drifted as hardcoded
//! constants per deployment, which is why they are externalized here.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{CategoryId, TopicEvent};

/// The reservation eligibility policy, immutable after load.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    /// Topics created before this instant are out of scope.
    pub cutoff: DateTime<Utc>,

    /// Topics outside these categories are out of scope.
    pub allowed_categories: HashSet<CategoryId>,
}

impl EligibilityPolicy {
    pub fn new(
        cutoff: DateTime<Utc>,
        allowed_categories: impl IntoIterator<Item = CategoryId>,
    ) -> Self {
        EligibilityPolicy {
            cutoff,
            allowed_categories: allowed_categories.into_iter().collect(),
        }
    }

    /// Pure predicate: is this topic in scope for a reservation?
    ///
    /// Eligible iff `created_at >= cutoff` and the category is allowed.
    /// A topic created exactly at the cutoff is eligible.
    pub fn is_eligible(&self, event: &TopicEvent) -> bool {
        event.created_at >= self.cutoff && self.allowed_categories.contains(&event.category_id)
    }
}
