//! # Routing Module
//!
//! Template compilation, route registration and dispatch, and the auto-router that fills in
//! REST routes for seeded collections.

pub mod auto;
pub mod router;
pub mod template;

pub use auto::AutoRouteGenerator;
pub use router::{Handler, Route, RouteMatch, RouteTarget, Router, RouterBuilder};
pub use template::{RouteTemplate, Segment};
