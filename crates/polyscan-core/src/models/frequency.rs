//! Aggregate statistics returned by the insights endpoints.

use serde::{Deserialize, Serialize};

/// Categorical value of a frequency bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketValue {
    Flag(bool),
    Number(f64),
    Label(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedInsights {
    #[serde(default)]
    pub unique_count: Option<u64>,
}

/// One bucket of a frequency distribution.
///
/// Range buckets carry `lower`/`upper` (either may be open), categorical
/// buckets carry `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBucket {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
    #[serde(default)]
    pub value: Option<BucketValue>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub insights: Option<NestedInsights>,
}

impl FrequencyBucket {
    pub fn range(lower: Option<f64>, upper: Option<f64>, count: u64) -> Self {
        Self { lower, upper, count, ..Default::default() }
    }

    pub fn flag(value: bool, count: u64) -> Self {
        Self { value: Some(BucketValue::Flag(value)), count, ..Default::default() }
    }

    /// Nested unique count when present, otherwise the plain count
    pub fn effective_count(&self) -> u64 {
        self.insights
            .as_ref()
            .and_then(|nested| nested.unique_count)
            .unwrap_or(self.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    /// Field the calculations ran over, echoed by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub frequencies: Vec<FrequencyBucket>,
    #[serde(default)]
    pub unique_count: Option<u64>,
    #[serde(default)]
    pub fill_count: Option<u64>,
}

/// Body of an insights response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub insights: Option<InsightSummary>,
}

impl InsightsResponse {
    pub fn frequencies(&self) -> &[FrequencyBucket] {
        self.insights
            .as_ref()
            .map(|summary| summary.frequencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn unique_count(&self) -> Option<u64> {
        self.insights.as_ref().and_then(|summary| summary.unique_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_range_buckets() {
        let body = json!({
            "count": 1200,
            "insights": {
                "field": "family.estimated_income_range",
                "frequencies": [
                    {"lower": 0, "upper": 50000, "count": 300},
                    {"lower": 50000, "count": 900}
                ]
            }
        });

        let response: InsightsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.count, Some(1200));

        let income = response.frequencies();
        assert_eq!(income.len(), 2);
        assert_eq!(income[0].upper, Some(50000.0));
        assert_eq!(income[1].upper, None);
    }

    #[test]
    fn test_parse_flag_buckets_with_nested_counts() {
        let body = json!({
            "insights": {
                "frequencies": [
                    {"value": true, "count": 10, "insights": {"unique_count": 7}},
                    {"value": false, "count": 5}
                ]
            }
        });

        let response: InsightsResponse = serde_json::from_value(body).unwrap();
        let owners = response.frequencies();
        assert_eq!(owners[0].value, Some(BucketValue::Flag(true)));
        assert_eq!(owners[0].effective_count(), 7);
        assert_eq!(owners[1].effective_count(), 5);
    }

    #[test]
    fn test_unique_count() {
        let body = json!({"count": 80, "insights": {"unique_count": 31}});
        let response: InsightsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.unique_count(), Some(31));
        assert!(response.frequencies().is_empty());
    }

    #[test]
    fn test_empty_body_defaults() {
        let response: InsightsResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response, InsightsResponse::default());
    }
}
