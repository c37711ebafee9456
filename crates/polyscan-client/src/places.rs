//! Business retrieval from the places collection

use polyscan_core::error::Result;
use polyscan_core::models::{BoundaryPoint, Predicate};
use serde_json::Value;

use crate::client::ApiClient;
use crate::insights::InsightQuery;
use crate::scan::{Collection, PaginatedQuery, ScanControl, ScanResult};

/// Code attribute matching the given category codes: NAICS codes are eight
/// digits or longer, anything shorter is treated as SIC.
pub fn category_attribute(codes: &[String]) -> &'static str {
    match codes.first() {
        Some(code) if code.len() >= 8 => "naics_code_ids",
        _ => "sic_code_ids",
    }
}

/// Filter for businesses inside `points` with one of the category codes
pub fn category_filter(points: &[BoundaryPoint], codes: &[String]) -> Predicate {
    let values = codes.iter().map(|code| Value::from(code.as_str())).collect();
    Predicate::and([
        Predicate::within_polygon(points),
        Predicate::one_of(category_attribute(codes), values),
    ])
}

impl ApiClient {
    fn places_query(&self, filter: Predicate, max_results: Option<usize>) -> PaginatedQuery {
        PaginatedQuery::new(Collection::Places, filter)
            .with_target(max_results)
            .with_page_param("packages", self.settings().places_package.clone())
    }

    /// Every business inside the polygon, up to `max_results`
    pub async fn businesses(
        &self,
        points: &[BoundaryPoint],
        max_results: Option<usize>,
        control: &ScanControl,
    ) -> Result<ScanResult> {
        let query = self.places_query(Predicate::within_polygon(points), max_results);
        self.scan(&query, control).await
    }

    /// Businesses inside the polygon with one of the given SIC or NAICS codes
    pub async fn businesses_by_category(
        &self,
        points: &[BoundaryPoint],
        codes: &[String],
        max_results: Option<usize>,
        control: &ScanControl,
    ) -> Result<ScanResult> {
        let query = self.places_query(category_filter(points, codes), max_results);
        self.scan(&query, control).await
    }

    /// Number of businesses with a legal name inside the polygon.
    ///
    /// `None` when the service rejected the polygon.
    pub async fn business_count(&self, points: &[BoundaryPoint]) -> Result<Option<u64>> {
        let response = self.insight(InsightQuery::BusinessCount, points).await?;
        Ok(response.map(|response| {
            let count = response.count.unwrap_or(0);
            tracing::info!("Found {} businesses in polygon", count);
            count
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triangle() -> Vec<BoundaryPoint> {
        vec![
            BoundaryPoint::new(40.0, -75.0),
            BoundaryPoint::new(40.0, -74.9),
            BoundaryPoint::new(40.1, -74.9),
        ]
    }

    #[test]
    fn test_category_attribute_by_code_length() {
        assert_eq!(category_attribute(&["581208".to_string()]), "sic_code_ids");
        assert_eq!(category_attribute(&["72251101".to_string()]), "naics_code_ids");
        assert_eq!(category_attribute(&[]), "sic_code_ids");
    }

    #[test]
    fn test_category_filter_wire_shape() {
        let filter = category_filter(&triangle(), &["581208".to_string(), "581209".to_string()]);
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["connective"], "and");
        assert_eq!(value["propositions"][0]["relation"], "geo_polygon");
        assert_eq!(
            value["propositions"][1],
            json!({"relation": "in", "attribute": "sic_code_ids", "value": ["581208", "581209"]})
        );
    }
}
