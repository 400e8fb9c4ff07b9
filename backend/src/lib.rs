//! Contest registration backend.
//!
//! The domain layer owns capacity accounting and registration rules; inbound
//! HTTP and outbound PostgreSQL adapters plug into its ports.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
