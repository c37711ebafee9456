//! Reductions from histogram-style insight responses to scalar summaries.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{AreaInsights, BucketValue, FrequencyBucket};

/// Reference ceilings that map each input onto 0-100
pub const INCOME_CEILING: f64 = 125_000.0;
pub const HOME_VALUE_CEILING: f64 = 250_000.0;
pub const WEALTH_CEILING: f64 = 200_000.0;
pub const OWNERSHIP_CEILING: f64 = 1.0;

/// Term weights: income, home value, wealth, ownership
pub const AFFLUENCE_WEIGHTS: [f64; 4] = [0.30, 0.30, 0.25, 0.15];

/// Representative value of a bucket.
///
/// Closed ranges use their midpoint, an open top bucket its lower bound. A
/// bucket with only an upper bound is treated as starting at zero.
fn representative(bucket: &FrequencyBucket) -> f64 {
    match (bucket.lower, bucket.upper) {
        (Some(lower), Some(upper)) => (lower + upper) / 2.0,
        (Some(lower), None) => lower,
        (None, Some(upper)) => upper / 2.0,
        (None, None) => 0.0,
    }
}

/// Median of a bucketed distribution, or 0 for an empty one.
///
/// When the cumulative count lands exactly on half the total and more
/// buckets follow, the result is the average of this and the next bucket.
pub fn median_from_buckets(buckets: &[FrequencyBucket]) -> f64 {
    let mut points: Vec<(f64, u64)> = buckets
        .iter()
        .filter(|bucket| bucket.count > 0)
        .map(|bucket| (representative(bucket), bucket.count))
        .collect();

    let total: u64 = points.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return 0.0;
    }

    points.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    let mut cumulative = 0u64;
    for (i, &(value, count)) in points.iter().enumerate() {
        cumulative += count;
        // cumulative >= total / 2 without leaving integers
        if cumulative * 2 >= total {
            if cumulative * 2 == total {
                if let Some(&(next, _)) = points.get(i + 1) {
                    return (value + next) / 2.0;
                }
            }
            return value;
        }
    }

    0.0
}

/// Share of `true` among boolean-valued buckets, or 0 when there are none.
pub fn boolean_ratio(buckets: &[FrequencyBucket]) -> f64 {
    let mut yes = 0u64;
    let mut no = 0u64;

    for bucket in buckets {
        match bucket.value {
            Some(BucketValue::Flag(true)) => yes += bucket.effective_count(),
            Some(BucketValue::Flag(false)) => no += bucket.effective_count(),
            _ => {}
        }
    }

    let total = yes + no;
    if total == 0 {
        return 0.0;
    }
    yes as f64 / total as f64
}

/// Inputs to the affluence score. A missing input contributes nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AffluenceInputs {
    pub median_income: Option<f64>,
    pub median_home_value: Option<f64>,
    pub median_wealth: Option<f64>,
    pub ownership_ratio: Option<f64>,
}

impl AffluenceInputs {
    /// Derive the four inputs from already fetched area insights
    pub fn from_insights(insights: &AreaInsights) -> Self {
        let median = |response: &Option<crate::models::InsightsResponse>| {
            response
                .as_ref()
                .map(|response| median_from_buckets(response.frequencies()))
        };

        Self {
            median_income: median(&insights.income),
            median_home_value: median(&insights.home_value),
            median_wealth: median(&insights.wealth),
            ownership_ratio: insights
                .home_ownership
                .as_ref()
                .map(|response| boolean_ratio(response.frequencies())),
        }
    }
}

/// Insight field names on the remote service
pub mod fields {
    pub const INCOME: &str = "family.estimated_income_range";
    pub const HOME_VALUE: &str = "real_estate.estimated_home_value";
    pub const HOME_OWNER: &str = "family.estimated_home_owner";
    pub const WEALTH: &str = "family.estimated_wealth";
    pub const EDUCATION: &str = "family.estimated_education_level";
    pub const LANGUAGE: &str = "estimated_language";
    pub const BUSINESS_CATEGORY: &str = "primary_sic_code_id";
    pub const STREET: &str = "street";
    pub const LEGAL_NAME: &str = "legal_name";
}

fn normalized(value: Option<f64>, ceiling: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => (v / ceiling * 100.0).clamp(0.0, 100.0),
        _ => 0.0,
    }
}

/// Weighted 0-100 composite, rounded to two decimals
pub fn affluence_score(inputs: &AffluenceInputs) -> f64 {
    let terms = [
        normalized(inputs.median_income, INCOME_CEILING),
        normalized(inputs.median_home_value, HOME_VALUE_CEILING),
        normalized(inputs.median_wealth, WEALTH_CEILING),
        normalized(inputs.ownership_ratio, OWNERSHIP_CEILING),
    ];

    let score: f64 = terms
        .iter()
        .zip(AFFLUENCE_WEIGHTS.iter())
        .map(|(term, weight)| term * weight)
        .sum();

    (score * 100.0).round() / 100.0
}

fn bound_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Flatten one area into a single tabular row.
///
/// Income buckets become `income_{lower}_{upper}` columns (`plus` for an open
/// top bucket) and ownership buckets `home_owners` / `non_home_owners`.
pub fn flatten_area_insights(
    polygon_name: &str,
    folder: &str,
    affluence_score: f64,
    insights: &AreaInsights,
) -> BTreeMap<String, Value> {
    let mut row = BTreeMap::new();
    row.insert("polygon_name".to_string(), Value::from(polygon_name));
    row.insert("folder".to_string(), Value::from(folder));
    row.insert("affluence_score".to_string(), Value::from(affluence_score));
    row.insert(
        "household_count".to_string(),
        Value::from(insights.household_count.unwrap_or(0)),
    );
    row.insert(
        "business_count".to_string(),
        Value::from(insights.business_count.unwrap_or(0)),
    );

    if let Some(income) = &insights.income {
        for bucket in income.frequencies() {
            let lower = bound_label(bucket.lower.unwrap_or(0.0));
            let upper = bucket.upper.map(bound_label).unwrap_or_else(|| "plus".to_string());
            row.insert(format!("income_{}_{}", lower, upper), Value::from(bucket.count));
        }
    }

    if let Some(ownership) = &insights.home_ownership {
        for bucket in ownership.frequencies() {
            match bucket.value {
                Some(BucketValue::Flag(true)) => {
                    row.insert("home_owners".to_string(), Value::from(bucket.count));
                }
                Some(BucketValue::Flag(false)) => {
                    row.insert("non_home_owners".to_string(), Value::from(bucket.count));
                }
                _ => {}
            }
        }
    }

    row
}
