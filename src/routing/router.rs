//! # Router Module
//!
//! Registration and dispatch of emulated REST routes.
//!
//! Routing happens in two phases:
//! - [`RouterBuilder`] collects fixtures, routes and resources. Every registration compiles
//!   its template immediately, so a malformed template aborts startup with a
//!   `MockError::Template` instead of being skipped.
//! - [`Router`] is produced by [`RouterBuilder::build`], after the auto-router has wired
//!   default routes. It is immutable and only dispatches.
//!
//! Routes are matched in registration order, per verb. The first template that matches the
//! path wins; there is no specificity ranking. Requests nothing matches go to the
//! passthrough.

use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

use crate::core::error::{MockError, MockResult};
use crate::core::types::{MockRequest, MockResponse, ParamMap, Record};
use crate::fixtures::{FixtureRegistry, SeedOutcome};
use crate::passthrough::{OfflinePassthrough, Passthrough};
use crate::routing::auto::AutoRouteGenerator;
use crate::routing::template::RouteTemplate;
use crate::storage::{CollectionStore, MemorySlot, PersistenceSlot};

/// Handler invoked for a matched route with the bound parameters and the parsed body
pub type Handler = Arc<dyn Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync>;

/// What a matched route does with the request
#[derive(Clone)]
pub enum RouteTarget {
    /// Run a handler
    Handler(Handler),
    /// Forward to the live backend
    Passthrough,
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Handler(_) => write!(f, "Handler"),
            RouteTarget::Passthrough => write!(f, "Passthrough"),
        }
    }
}

/// A registered route: verb, compiled template and target
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP verb this route answers
    pub method: Method,

    /// Compiled path template
    pub template: RouteTemplate,

    /// Handler or passthrough
    pub target: RouteTarget,
}

impl Route {
    /// Check if this route answers the given verb
    pub fn matches_method(&self, method: &Method) -> bool {
        self.method == *method
    }

    /// Check whether this route forwards to the live backend
    pub fn is_passthrough(&self) -> bool {
        matches!(self.target, RouteTarget::Passthrough)
    }
}

/// Result of matching a request against the route table
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Template of the matched route
    pub pattern: String,

    /// Bound placeholders
    pub params: ParamMap,

    /// Whether the route forwards to the live backend
    pub passthrough: bool,
}

/// Immutable router produced by [`RouterBuilder::build`]
pub struct Router {
    /// Routes in registration order
    routes: Vec<Route>,

    /// Live backend for unmatched requests
    passthrough: Arc<dyn Passthrough>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("passthrough", &self.passthrough.describe())
            .finish()
    }
}

impl Router {
    /// Dispatch a request
    ///
    /// Scans the verb's routes in registration order and runs the first match. A body that is
    /// not valid JSON is answered with a 400 envelope. Unmatched requests are forwarded to the
    /// passthrough. `Err` only surfaces persistence or passthrough transport failures.
    pub async fn dispatch(&self, request: &MockRequest) -> MockResult<MockResponse> {
        let span = info_span!(
            "dispatch",
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
        );

        async move {
            let Some((route, params)) = self.find(&request.method, &request.path) else {
                debug!("No route matched, forwarding to passthrough");
                return self.passthrough.forward(request).await;
            };

            match &route.target {
                RouteTarget::Passthrough => {
                    debug!(pattern = %route.template, "Matched passthrough route");
                    self.passthrough.forward(request).await
                }
                RouteTarget::Handler(handler) => {
                    let body = match parse_body(request.body.as_deref()) {
                        Ok(body) => body,
                        Err(err) => return Ok(err.into_response()),
                    };

                    let response = handler(&params, body.as_ref())?;
                    debug!(
                        pattern = %route.template,
                        status = response.status_code,
                        "Route handled"
                    );
                    Ok(response)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Dispatch from loose parts: verb, path (may carry a query string) and raw body
    pub async fn dispatch_parts(
        &self,
        method: Method,
        path: &str,
        raw_body: Option<&str>,
    ) -> MockResult<MockResponse> {
        let mut request = MockRequest::new(method, path);
        request.body = raw_body.map(str::to_string);
        self.dispatch(&request).await
    }

    /// Match a verb and path without running anything
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.find(method, path).map(|(route, params)| RouteMatch {
            pattern: route.template.as_str().to_string(),
            params,
            passthrough: route.is_passthrough(),
        })
    }

    /// Registered routes as (verb, template) pairs, in registration order
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|route| (route.method.clone(), route.template.as_str().to_string()))
            .collect()
    }

    /// Check if the router has any routes
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn find(&self, method: &Method, path: &str) -> Option<(&Route, ParamMap)> {
        self.routes
            .iter()
            .filter(|route| route.matches_method(method))
            .find_map(|route| route.template.match_path(path).map(|params| (route, params)))
    }
}

/// Parse a raw body as JSON; blank bodies count as absent
fn parse_body(raw: Option<&str>) -> MockResult<Option<Value>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| MockError::invalid_request(format!("malformed JSON body: {}", e))),
    }
}

/// Builder for routers: the registration phase
pub struct RouterBuilder {
    slot: Arc<dyn PersistenceSlot>,
    fixtures: FixtureRegistry,
    passthrough: Arc<dyn Passthrough>,
    routes: Vec<Route>,
    stores: HashMap<String, Arc<CollectionStore>>,
    explicit_paths: Vec<String>,
}

impl RouterBuilder {
    /// Create a builder backed by an in-memory slot and no live backend
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemorySlot::new()))
    }

    /// Create a builder whose fixtures and collections persist to `slot`
    pub fn with_storage(slot: Arc<dyn PersistenceSlot>) -> Self {
        Self {
            fixtures: FixtureRegistry::new(slot.clone()),
            slot,
            passthrough: Arc::new(OfflinePassthrough),
            routes: Vec::new(),
            stores: HashMap::new(),
            explicit_paths: Vec::new(),
        }
    }

    /// Set the live backend unmatched requests are forwarded to
    pub fn passthrough(mut self, passthrough: Arc<dyn Passthrough>) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Declare a seed dataset
    pub fn fixture(self, key: &str, dataset: Vec<Record>) -> MockResult<Self> {
        self.set_initial_data(key, dataset)?;
        Ok(self)
    }

    /// Declare a seed dataset, reporting whether stored data was (re)written
    pub fn set_initial_data(&self, key: &str, dataset: Vec<Record>) -> MockResult<SeedOutcome> {
        self.fixtures.set_initial_data(key, dataset)
    }

    /// Fixture registry backing this builder
    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    /// Add a GET route
    pub fn on_get<F>(self, template: &str, handler: F) -> MockResult<Self>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.route(Method::GET, template, handler)
    }

    /// Add a POST route
    pub fn on_post<F>(self, template: &str, handler: F) -> MockResult<Self>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.route(Method::POST, template, handler)
    }

    /// Add a PUT route
    pub fn on_put<F>(self, template: &str, handler: F) -> MockResult<Self>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.route(Method::PUT, template, handler)
    }

    /// Add a DELETE route
    pub fn on_delete<F>(self, template: &str, handler: F) -> MockResult<Self>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.route(Method::DELETE, template, handler)
    }

    /// Add a route for any verb
    pub fn route<F>(mut self, method: Method, template: &str, handler: F) -> MockResult<Self>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.register_route(method, template, RouteTarget::Handler(Arc::new(handler)))?;
        Ok(self)
    }

    /// Add a route that forwards matching requests to the live backend
    pub fn passthrough_route(mut self, method: Method, template: &str) -> MockResult<Self> {
        self.register_route(method, template, RouteTarget::Passthrough)?;
        Ok(self)
    }

    /// Declare a standard REST resource backed by the collection `name`
    ///
    /// Shorthand for `register_resource(collection_path, None, Some(name))`.
    pub fn resource(self, collection_path: &str, name: &str) -> MockResult<Self> {
        self.register_resource(collection_path, None, Some(name))
    }

    /// Register the five standard REST routes for a collection
    ///
    /// `item_path` defaults to `collection_path + "/{id}"`; its last placeholder carries
    /// the record ID. Without a `name` the backing store is anonymous and never persists.
    /// Routes are registered as GET item, PUT item, DELETE item, GET collection and
    /// POST collection.
    pub fn register_resource(
        mut self,
        collection_path: &str,
        item_path: Option<&str>,
        name: Option<&str>,
    ) -> MockResult<Self> {
        let item_path = match item_path {
            Some(path) => path.to_string(),
            None => format!("{}/{{id}}", collection_path.trim_end_matches('/')),
        };

        let id_param = RouteTemplate::compile(&item_path)?
            .param_names()
            .last()
            .cloned()
            .ok_or_else(|| MockError::template(&item_path, "item path needs a placeholder for the record id"))?;

        let store = match name {
            Some(name) => self.collection(name),
            None => Arc::new(CollectionStore::anonymous()),
        };

        let (s, p) = (store.clone(), id_param.clone());
        self.register_handler(Method::GET, &item_path, move |params, _| s.find_one(param(params, &p)))?;

        let (s, p) = (store.clone(), id_param.clone());
        self.register_handler(Method::PUT, &item_path, move |params, body| {
            s.update(param(params, &p), body_or_empty(body))
        })?;

        let (s, p) = (store.clone(), id_param);
        self.register_handler(Method::DELETE, &item_path, move |params, _| s.delete(param(params, &p)))?;

        let s = store.clone();
        self.register_handler(Method::GET, collection_path, move |_, _| s.find_all())?;

        let s = store;
        self.register_handler(Method::POST, collection_path, move |_, body| s.create(body_or_empty(body)))?;

        info!(
            collection = collection_path,
            item = %item_path,
            name = name.unwrap_or("<anonymous>"),
            "Registered resource"
        );

        Ok(self)
    }

    /// Store for the collection `name`, shared by every route bound to that name
    pub fn collection(&mut self, name: &str) -> Arc<CollectionStore> {
        self.stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CollectionStore::new(name, self.slot.clone())))
            .clone()
    }

    /// Finish registration: run the auto-router and freeze the route table
    ///
    /// Collections seeded without an explicit route get standard REST routes, then a
    /// catch-all passthrough is installed for every verb. Must be the last step.
    pub fn build(mut self) -> MockResult<Router> {
        // Routes registered before their fixture was declared still count as explicit.
        for path in &self.explicit_paths {
            self.fixtures.mark_route_configured(path);
        }

        self = AutoRouteGenerator::run(self)?;

        info!(
            routes = self.routes.len(),
            collections = self.stores.len(),
            passthrough = %self.passthrough.describe(),
            "Router built"
        );

        Ok(Router {
            routes: self.routes,
            passthrough: self.passthrough,
        })
    }

    fn register_handler<F>(&mut self, method: Method, template: &str, handler: F) -> MockResult<()>
    where
        F: Fn(&ParamMap, Option<&Value>) -> MockResult<MockResponse> + Send + Sync + 'static,
    {
        self.register_route(method, template, RouteTarget::Handler(Arc::new(handler)))
    }

    /// Compile, append and mark the collection as explicitly routed
    pub(crate) fn register_route(
        &mut self,
        method: Method,
        template: &str,
        target: RouteTarget,
    ) -> MockResult<()> {
        let template = RouteTemplate::compile(template)?;

        if !matches!(target, RouteTarget::Passthrough) {
            self.fixtures.mark_route_configured(template.as_str());
            self.explicit_paths.push(template.as_str().to_string());
        }

        debug!(method = %method, pattern = %template, target = ?target, "Registered route");
        self.routes.push(Route {
            method,
            template,
            target,
        });

        Ok(())
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn param<'a>(params: &'a ParamMap, name: &str) -> &'a str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

fn body_or_empty(body: Option<&Value>) -> Value {
    body.cloned().unwrap_or_else(|| Value::Object(Record::new()))
}
