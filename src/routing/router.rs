//! Route table.
//!
//! # Responsibilities
//! - Store registered routes and their handler chains
//! - Maintain the allowed-methods set
//! - Look up a route by (method, path) with a three-way result
//!
//! # Design Decisions
//! - One `matchit` tree per method; the tree stores an index into `routes`
//! - Duplicate (method, pattern) registrations are rejected, never overwritten
//! - Built during startup only. Lookups take `&self` and the table is frozen
//!   inside the engine before serving, so no locking is needed
//! - A miss tries the slash-toggled path in the same tree to decide whether
//!   the caller should redirect

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::http::handler::Unit;
use crate::http::response::toggle_trailing_slash;
use crate::routing::methods::AllowedMethods;

/// Registration failure. Any of these should abort startup.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {method} {path} has no handler")]
    EmptyChain { method: Method, path: String },

    #[error("route {method} {path} is already registered (conflicts with {existing})")]
    DuplicateRoute {
        method: Method,
        path: String,
        existing: String,
    },

    #[error("invalid route pattern {method} {path}: {source}")]
    InvalidPattern {
        method: Method,
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// A registered route: its pattern and its full chain.
#[derive(Debug)]
pub struct Route {
    method: Method,
    pattern: String,
    /// Never empty; the last unit is the handler.
    chain: Vec<Unit>,
}

impl Route {
    pub(crate) fn new(method: Method, pattern: String, chain: Vec<Unit>) -> Self {
        debug_assert!(!chain.is_empty(), "route {method} {pattern} has an empty chain");
        Self {
            method,
            pattern,
            chain,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn chain(&self) -> &[Unit] {
        &self.chain
    }

    /// The terminal unit. Always present for registered routes.
    pub fn handler(&self) -> Option<&Unit> {
        self.chain.last()
    }

    /// Copy of this route with `prefix` units run first.
    fn with_prefix(&self, prefix: &[Unit]) -> Self {
        let chain = prefix.iter().chain(self.chain.iter()).cloned().collect();
        Self::new(self.method.clone(), self.pattern.clone(), chain)
    }
}

/// Ordered (name, value) pairs for the dynamic segments of a match.
///
/// Values are percent-decoded; invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<matchit::Params<'_, '_>> for PathParams {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        Self(
            params
                .iter()
                .map(|(k, v)| {
                    let value = percent_decode_str(v).decode_utf8_lossy().into_owned();
                    (k.to_string(), value)
                })
                .collect(),
        )
    }
}

/// Result of a route lookup.
#[derive(Debug)]
pub enum Lookup {
    /// Exact match.
    Found { route: Arc<Route>, params: PathParams },
    /// No match, but the path with its trailing slash toggled would match.
    Redirect,
    NotFound,
}

/// Registered routes plus the allowed-methods set.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    trees: HashMap<Method, matchit::Router<usize>>,
    methods: AllowedMethods,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chain for (method, pattern).
    ///
    /// The last unit of `chain` is the handler. Must be called before the
    /// table is handed to an engine; it is not safe alongside lookups.
    pub fn register(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        chain: impl IntoIterator<Item = Unit>,
    ) -> Result<(), RouteError> {
        let pattern = pattern.into();
        let chain: Vec<Unit> = chain.into_iter().collect();
        if chain.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                path: pattern,
            });
        }

        let index = self.routes.len();
        let tree = self
            .trees
            .entry(method.clone())
            .or_insert_with(matchit::Router::new);
        tree.insert(pattern.as_str(), index).map_err(|e| match e {
            matchit::InsertError::Conflict { with } => RouteError::DuplicateRoute {
                method: method.clone(),
                path: pattern.clone(),
                existing: with,
            },
            source => RouteError::InvalidPattern {
                method: method.clone(),
                path: pattern.clone(),
                source,
            },
        })?;

        if self.methods.insert(&method) {
            tracing::debug!(method = %method, allow = ?self.methods.allow_header(), "New method allowed");
        }
        tracing::debug!(method = %method, pattern = %pattern, units = chain.len(), "Route registered");

        self.routes.push(Arc::new(Route::new(method, pattern, chain)));
        Ok(())
    }

    /// Find the route for (method, path).
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let Some(tree) = self.trees.get(method) else {
            return Lookup::NotFound;
        };

        if let Ok(matched) = tree.at(path) {
            return Lookup::Found {
                route: Arc::clone(&self.routes[*matched.value]),
                params: matched.params.into(),
            };
        }

        if path.len() > 1 && tree.at(&toggle_trailing_slash(path)).is_ok() {
            return Lookup::Redirect;
        }

        Lookup::NotFound
    }

    pub fn allowed_methods(&self) -> &AllowedMethods {
        &self.methods
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run `units` before every registered chain.
    ///
    /// Route indices are unchanged, so the trees stay valid.
    pub(crate) fn prepend_all(&mut self, units: &[Unit]) {
        if units.is_empty() {
            return;
        }
        for route in &mut self.routes {
            *route = Arc::new(route.with_prefix(units));
        }
    }
}
