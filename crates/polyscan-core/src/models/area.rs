//! Combined demographic and business insights for one polygon.

use serde::{Deserialize, Serialize};

use super::frequency::InsightsResponse;

/// Every insight gathered for a single area.
///
/// Fields stay `None` when the corresponding request failed or the remote
/// service rejected the geometry. Group-level failures are kept in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaInsights {
    pub household_count: Option<u64>,
    pub income: Option<InsightsResponse>,
    pub home_value: Option<InsightsResponse>,
    pub home_ownership: Option<InsightsResponse>,
    pub wealth: Option<InsightsResponse>,
    pub education: Option<InsightsResponse>,
    pub language: Option<InsightsResponse>,
    pub business_count: Option<u64>,
    pub business_categories: Option<InsightsResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AreaInsights {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
