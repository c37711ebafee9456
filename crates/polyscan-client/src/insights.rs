//! Aggregate insight queries and the per-area insight bundle

use polyscan_core::error::Result;
use polyscan_core::models::{AreaInsights, BoundaryPoint, InsightsResponse, Predicate};
use polyscan_core::stats::{affluence_score, fields, AffluenceInputs};
use serde_json::{json, Value};

use crate::client::{decode, ApiClient, Reply};
use crate::people::heads_of_household;
use crate::scan::Collection;
use crate::transport::ApiRequest;

/// Every insight the service is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightQuery {
    HouseholdCount,
    Income,
    HomeValue,
    HomeOwnership,
    Wealth,
    Education,
    Language,
    BusinessCount,
    BusinessCategories,
}

impl InsightQuery {
    pub fn collection(&self) -> Collection {
        match self {
            InsightQuery::BusinessCount | InsightQuery::BusinessCategories => Collection::Places,
            _ => Collection::People,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            InsightQuery::HouseholdCount => fields::STREET,
            InsightQuery::Income => fields::INCOME,
            InsightQuery::HomeValue => fields::HOME_VALUE,
            InsightQuery::HomeOwnership => fields::HOME_OWNER,
            InsightQuery::Wealth => fields::WEALTH,
            InsightQuery::Education => fields::EDUCATION,
            InsightQuery::Language => fields::LANGUAGE,
            InsightQuery::BusinessCount => fields::LEGAL_NAME,
            InsightQuery::BusinessCategories => fields::BUSINESS_CATEGORY,
        }
    }

    fn calculation(&self) -> &'static str {
        match self {
            InsightQuery::HouseholdCount => "unique_count",
            InsightQuery::BusinessCount => "fill_count",
            _ => "frequencies",
        }
    }

    fn heads_of_household_only(&self) -> bool {
        matches!(
            self,
            InsightQuery::Income
                | InsightQuery::HomeValue
                | InsightQuery::HomeOwnership
                | InsightQuery::Wealth
        )
    }

    /// Buckets are refined by a distinct street count, one per household
    fn counts_households(&self) -> bool {
        matches!(
            self,
            InsightQuery::HomeValue | InsightQuery::HomeOwnership | InsightQuery::Wealth
        )
    }

    /// Request body: filter plus the field and calculation to run
    pub fn body(&self, points: &[BoundaryPoint]) -> Value {
        let mut filter = Predicate::within_polygon(points);
        if self.heads_of_household_only() {
            filter = heads_of_household(filter);
        }

        let mut insights = json!({
            "field": self.field(),
            "calculations": [self.calculation()],
        });
        if self.counts_households() {
            insights["insights"] = json!({
                "field": fields::STREET,
                "calculations": ["unique_count"],
            });
        }

        json!({ "filter": filter, "insights": insights })
    }
}

/// Affluence score of already fetched insights
pub fn affluence_from_insights(insights: &AreaInsights) -> f64 {
    affluence_score(&AffluenceInputs::from_insights(insights))
}

impl ApiClient {
    /// Run one insight query.
    ///
    /// `None` when the service rejected the polygon.
    pub async fn insight(
        &self,
        query: InsightQuery,
        points: &[BoundaryPoint],
    ) -> Result<Option<InsightsResponse>> {
        let url = self.url(&format!("{}/insights", query.collection().path()));
        let request = ApiRequest::get(&url)
            .with_body(query.body(points))
            .with_spatial_filter(true);

        match self.execute(&request).await? {
            Reply::GeometryRejected { .. } => Ok(None),
            Reply::Data(Value::Null) => Ok(Some(InsightsResponse::default())),
            Reply::Data(value) => decode(&url, value).map(Some),
        }
    }

    /// Household count, six demographic distributions, business count and
    /// business categories for one area.
    ///
    /// A failure in the people group or the business group is logged and
    /// recorded in `errors`; fields fetched before it are kept.
    pub async fn complete_area_insights(&self, points: &[BoundaryPoint]) -> AreaInsights {
        let mut insights = AreaInsights::default();

        if let Err(e) = self.people_insights(points, &mut insights).await {
            tracing::error!("Error getting consumer insights: {}", e);
            insights.errors.push(format!("consumer insights: {}", e));
        }
        if let Err(e) = self.business_insights(points, &mut insights).await {
            tracing::error!("Error getting business insights: {}", e);
            insights.errors.push(format!("business insights: {}", e));
        }

        insights
    }

    async fn people_insights(
        &self,
        points: &[BoundaryPoint],
        insights: &mut AreaInsights,
    ) -> Result<()> {
        insights.household_count = self.household_count(points).await?;
        insights.income = self.insight(InsightQuery::Income, points).await?;
        insights.home_value = self.insight(InsightQuery::HomeValue, points).await?;
        insights.home_ownership = self.insight(InsightQuery::HomeOwnership, points).await?;
        insights.wealth = self.insight(InsightQuery::Wealth, points).await?;
        insights.education = self.insight(InsightQuery::Education, points).await?;
        insights.language = self.insight(InsightQuery::Language, points).await?;
        Ok(())
    }

    async fn business_insights(
        &self,
        points: &[BoundaryPoint],
        insights: &mut AreaInsights,
    ) -> Result<()> {
        insights.business_count = self.business_count(points).await?;
        insights.business_categories =
            self.insight(InsightQuery::BusinessCategories, points).await?;
        Ok(())
    }

    /// Fetch the four affluence inputs and score them
    pub async fn affluence_score(&self, points: &[BoundaryPoint]) -> Result<f64> {
        let insights = AreaInsights {
            income: self.insight(InsightQuery::Income, points).await?,
            home_value: self.insight(InsightQuery::HomeValue, points).await?,
            wealth: self.insight(InsightQuery::Wealth, points).await?,
            home_ownership: self.insight(InsightQuery::HomeOwnership, points).await?,
            ..Default::default()
        };
        Ok(affluence_from_insights(&insights))
    }
}
