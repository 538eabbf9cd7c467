//! # Mock Backend Library
//!
//! A REST backend emulator: HTTP-shaped calls are matched against declared or generated
//! route templates and served from persisted, in-memory collections.
//!
//! ## Startup Sequence
//!
//! 1. Open a persistence slot and declare fixtures (seed datasets). Seeding is drift-aware:
//!    stored data is only overwritten when the declared dataset changed.
//! 2. Register explicit routes and resources on a [`RouterBuilder`].
//! 3. Call [`RouterBuilder::build`]. Fixtures without an explicit route get the five
//!    standard REST routes, and a catch-all passthrough is installed for every verb.
//! 4. Dispatch requests through the immutable [`Router`].
//!
//! ```rust,no_run
//! use mock_backend::{MockResult, RouterBuilder};
//! use http::Method;
//! use serde_json::json;
//!
//! # async fn run() -> MockResult<()> {
//! let users = serde_json::from_value(json!([{"id": 1, "name": "terry"}]))?;
//! let router = RouterBuilder::new().fixture("users", users)?.build()?;
//!
//! let response = router.dispatch_parts(Method::GET, "/users", None).await?;
//! assert_eq!(response.status_code, 200);
//! # Ok(())
//! # }
//! ```

/// Error types, request/response types and configuration
pub mod core;

/// Seed datasets and drift detection
pub mod fixtures;

/// Logging setup
pub mod observability;

/// Forwarding of unmatched requests to a live backend
pub mod passthrough;

/// Route templates, registration, dispatch and auto-routing
pub mod routing;

/// Persistence slots and collection stores
pub mod storage;

pub use crate::core::config::BackendConfig;
pub use crate::core::error::{MockError, MockResult};
pub use crate::core::types::{MockRequest, MockResponse, ParamMap, Record};
pub use fixtures::{FixtureRegistry, SeedOutcome};
pub use passthrough::{HttpPassthrough, OfflinePassthrough, Passthrough};
pub use routing::router::{Router, RouterBuilder};
pub use routing::template::RouteTemplate;
pub use storage::{CollectionStore, FileSlot, MemorySlot, PersistenceSlot};
