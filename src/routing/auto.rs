//! # Auto-Route Generator
//!
//! Wires standard REST routes for every seeded collection that has no explicit route, then
//! installs a catch-all passthrough for every verb. Runs once, as the last startup step,
//! from [`RouterBuilder::build`](crate::routing::router::RouterBuilder::build).

use http::Method;
use tracing::info;

use crate::core::error::MockResult;
use crate::routing::router::{RouteTarget, RouterBuilder};

/// Template matching any non-empty path
pub const CATCH_ALL_TEMPLATE: &str = "{path}";

/// Verbs the catch-all passthrough is installed for
pub const PASSTHROUGH_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Generator for default routes
pub struct AutoRouteGenerator;

impl AutoRouteGenerator {
    /// Wire `/name` and `/name/{id}` for each unconfigured fixture, then the catch-all
    pub fn run(mut builder: RouterBuilder) -> MockResult<RouterBuilder> {
        let unconfigured = builder.fixtures().get_unconfigured_collections();

        for name in &unconfigured {
            let collection_path = format!("/{}", name);
            let item_path = format!("/{}/{{id}}", name);
            builder = builder.register_resource(&collection_path, Some(item_path.as_str()), Some(name.as_str()))?;
        }

        for method in PASSTHROUGH_METHODS {
            builder.register_route(method, CATCH_ALL_TEMPLATE, RouteTarget::Passthrough)?;
        }

        info!(
            generated = unconfigured.len(),
            collections = ?unconfigured,
            "Auto-routed unconfigured collections"
        );

        Ok(builder)
    }
}
