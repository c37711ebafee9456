//! Consumer retrieval from the people collection

use std::collections::BTreeMap;

use polyscan_core::error::Result;
use polyscan_core::models::{AttributeFilter, BoundaryPoint, Predicate};

use crate::client::ApiClient;
use crate::insights::InsightQuery;
use crate::scan::{Collection, PaginatedQuery, ScanControl, ScanResult};

pub const HEAD_OF_FAMILY: &str = "estimated_head_of_family";

/// Restrict a filter to heads of household
pub fn heads_of_household(filter: Predicate) -> Predicate {
    Predicate::and([filter, Predicate::equals(HEAD_OF_FAMILY, true)])
}

/// Polygon filter combined with one or more constraints per attribute
pub fn attribute_filter(
    points: &[BoundaryPoint],
    attributes: &BTreeMap<String, AttributeFilter>,
) -> Predicate {
    let mut propositions = vec![Predicate::within_polygon(points)];
    for (attribute, constraint) in attributes {
        propositions.extend(constraint.clone().into_predicates(attribute));
    }
    Predicate::and(propositions)
}

impl ApiClient {
    fn people_query(&self, filter: Predicate, max_results: Option<usize>) -> PaginatedQuery {
        PaginatedQuery::new(Collection::People, filter)
            .with_target(max_results)
            .with_page_param("packages", self.settings().people_package.clone())
    }

    /// Consumers inside the polygon, optionally heads of household only
    pub async fn consumers(
        &self,
        points: &[BoundaryPoint],
        head_of_household: bool,
        max_results: Option<usize>,
        control: &ScanControl,
    ) -> Result<ScanResult> {
        let mut filter = Predicate::within_polygon(points);
        if head_of_household {
            filter = heads_of_household(filter);
        }
        let query = self.people_query(filter, max_results);
        self.scan(&query, control).await
    }

    /// Consumers inside the polygon matching every attribute constraint
    pub async fn consumers_by_attributes(
        &self,
        points: &[BoundaryPoint],
        attributes: &BTreeMap<String, AttributeFilter>,
        max_results: Option<usize>,
        control: &ScanControl,
    ) -> Result<ScanResult> {
        let query = self.people_query(attribute_filter(points, attributes), max_results);
        self.scan(&query, control).await
    }

    /// Households inside the polygon, counted as distinct streets.
    ///
    /// `None` when the service rejected the polygon.
    pub async fn household_count(&self, points: &[BoundaryPoint]) -> Result<Option<u64>> {
        let response = self.insight(InsightQuery::HouseholdCount, points).await?;
        Ok(response.map(|response| match response.unique_count() {
            Some(count) => {
                tracing::info!("Found {} households in polygon", count);
                count
            }
            None => {
                tracing::warn!("Household count response has no unique_count");
                0
            }
        }))
    }
}
