//! Polyscan Client - Rate-limited access to the remote record collections
//!
//! Every outbound request passes one shared sliding-window gate, is retried
//! on rate-limit and transient network failures, and is classified into
//! data, a rejected geometry, or an error. Paginated scans, counts and
//! insight queries are built on top of that single request path.

pub mod client;
pub mod insights;
pub mod people;
pub mod places;
pub mod rate_limit;
pub mod scan;
pub mod transport;

pub use client::{ApiClient, ClientSettings, Reply, RetryPolicy};
pub use insights::{affluence_from_insights, InsightQuery};
pub use rate_limit::{Clock, ManualClock, RateLimiter, RateLimiterState, SystemClock};
pub use scan::{Collection, PaginatedQuery, RetrievalSession, ScanControl, ScanResult, ScanStatus};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
