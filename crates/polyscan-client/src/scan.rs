//! Cursor-based bulk retrieval.
//!
//! A scan posts the filter once, receives the total match count and a cursor,
//! then pages through the cursor until the target is reached, the cursor runs
//! dry, or the caller stops it. Records gathered so far are always returned.

use std::fmt;
use std::time::{Duration, Instant};

use polyscan_core::error::{PolyscanError, Result};
use polyscan_core::models::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::client::{decode, ApiClient, Reply};
use crate::transport::ApiRequest;

/// Remote record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Businesses
    Places,
    /// Consumers
    People,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Places => "places",
            Collection::People => "people",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Collection::Places => "businesses",
            Collection::People => "consumers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A filtered scan over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedQuery {
    pub collection: Collection,
    pub filter: Predicate,
    /// Stop after this many records; `None` retrieves every match
    pub target_count: Option<usize>,
    /// Query parameters sent with every page fetch
    pub page_params: Vec<(String, String)>,
}

impl PaginatedQuery {
    pub fn new(collection: Collection, filter: Predicate) -> Self {
        Self { collection, filter, target_count: None, page_params: Vec::new() }
    }

    pub fn with_target(mut self, target_count: Option<usize>) -> Self {
        self.target_count = target_count;
        self
    }

    pub fn with_page_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.page_params.push((key.into(), value.into()));
        self
    }
}

/// Progress through an open cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSession {
    pub cursor_id: String,
    pub target_count: usize,
    pub retrieved_count: usize,
}

impl RetrievalSession {
    pub fn is_satisfied(&self) -> bool {
        self.retrieved_count >= self.target_count
    }
}

/// Why a scan stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The filter matched nothing; no cursor was opened
    NoMatches,
    /// The target count was reached
    Complete,
    /// A page came back empty before the target was reached
    Exhausted,
    /// The service could not use the polygon in the filter
    GeometryRejected,
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub records: Vec<Value>,
    /// Matches reported by the service
    pub total_count: u64,
    pub target_count: usize,
    pub status: ScanStatus,
}

impl ScanResult {
    fn empty(status: ScanStatus) -> Self {
        Self { records: Vec::new(), total_count: 0, target_count: 0, status }
    }

    /// Fewer records than the target were retrieved
    pub fn is_partial(&self) -> bool {
        self.records.len() < self.target_count
    }
}

/// Caller-side stop conditions, checked before every page fetch
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn stop_reason(&self, now: Instant) -> Option<ScanStatus> {
        if self.cancel.is_cancelled() {
            return Some(ScanStatus::Cancelled);
        }
        match self.deadline {
            Some(deadline) if now >= deadline => Some(ScanStatus::DeadlineExceeded),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScanStart {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    scroll_id: Option<String>,
}

impl ApiClient {
    /// Run a paginated scan
    pub async fn scan(&self, query: &PaginatedQuery, control: &ScanControl) -> Result<ScanResult> {
        let url = self.url(&format!("{}/scan", query.collection.path()));
        let request = ApiRequest::post(&url)
            .with_body(json!({ "filter": query.filter }))
            .with_spatial_filter(query.filter.references_spatial_filter());

        let start: ScanStart = match self.execute(&request).await? {
            Reply::GeometryRejected { .. } => {
                return Ok(ScanResult::empty(ScanStatus::GeometryRejected));
            }
            Reply::Data(Value::Null) => {
                tracing::warn!("Empty response to initial {} scan", query.collection);
                return Ok(ScanResult::empty(ScanStatus::NoMatches));
            }
            Reply::Data(value) => decode(&url, value)?,
        };

        tracing::info!("Total {} found: {}", query.collection.noun(), start.count);
        if start.count == 0 {
            return Ok(ScanResult::empty(ScanStatus::NoMatches));
        }

        let total = usize::try_from(start.count).unwrap_or(usize::MAX);
        let target_count = match query.target_count {
            Some(target) if target < total => {
                tracing::info!("Limiting results to {} {}", target, query.collection.noun());
                target
            }
            _ => total,
        };

        let cursor_id = start.scroll_id.ok_or_else(|| PolyscanError::InvalidResponse {
            endpoint: url.clone(),
            reason: format!("{} matches but no scroll_id", start.count),
        })?;
        tracing::debug!("Using scroll ID: {}", cursor_id);

        let mut session = RetrievalSession { cursor_id, target_count, retrieved_count: 0 };
        let mut records = Vec::new();
        let status = self.fetch_pages(&url, query, control, &mut session, &mut records).await?;

        records.truncate(session.target_count);
        tracing::info!(
            status = ?status,
            retrieved = records.len(),
            target = session.target_count,
            "Retrieved {} {}",
            records.len(),
            query.collection.noun()
        );

        Ok(ScanResult { records, total_count: start.count, target_count, status })
    }

    async fn fetch_pages(
        &self,
        scan_url: &str,
        query: &PaginatedQuery,
        control: &ScanControl,
        session: &mut RetrievalSession,
        records: &mut Vec<Value>,
    ) -> Result<ScanStatus> {
        let page_url = format!("{}/{}", scan_url, session.cursor_id);

        loop {
            if session.is_satisfied() {
                return Ok(ScanStatus::Complete);
            }

            if let Some(stop) = control.stop_reason(self.clock().now()) {
                tracing::warn!(
                    "Scan stopped ({:?}) after {} of {} records",
                    stop,
                    session.retrieved_count,
                    session.target_count
                );
                return Ok(stop);
            }

            let request = ApiRequest::get(&page_url).with_query(query.page_params.clone());
            let page = match self.execute(&request).await? {
                Reply::Data(Value::Array(items)) => items,
                Reply::Data(Value::Null) | Reply::GeometryRejected { .. } => Vec::new(),
                Reply::Data(other) => {
                    return Err(PolyscanError::InvalidResponse {
                        endpoint: page_url,
                        reason: format!("expected an array of records, got {}", kind(&other)),
                    });
                }
            };

            if page.is_empty() {
                tracing::warn!(
                    "Cursor exhausted after {} of {} records",
                    session.retrieved_count,
                    session.target_count
                );
                return Ok(ScanStatus::Exhausted);
            }

            session.retrieved_count += page.len();
            records.extend(page);
            tracing::info!(
                "Retrieved {} of {} {}",
                session.retrieved_count,
                session.target_count,
                query.collection.noun()
            );

            if !session.is_satisfied() {
                self.page_pause(control).await;
            }
        }
    }

    /// Courtesy delay between pages; cut short by cancellation
    async fn page_pause(&self, control: &ScanControl) {
        let delay: Duration = self.settings().page_delay;
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = control.cancel.cancelled() => {}
            _ = self.clock().sleep(delay) => {}
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
