//! Route groups.
//!
//! A group shares a path prefix and a middleware list with its children.
//! Groups only exist while routes are being declared: [`Group::flatten`]
//! turns a tree of groups into plain route definitions, which the table then
//! registers one by one in declaration order.
//!
//! Prefixes are concatenated verbatim (`"/api"` + `"/users"`), with no
//! collapsing of duplicate slashes.

use axum::http::Method;

use crate::http::handler::Unit;

/// A route declared inside a group, before flattening.
#[derive(Debug, Clone)]
pub struct RouteDef {
    pub method: Method,
    pub path: String,
    /// Middleware followed by the handler.
    pub chain: Vec<Unit>,
}

#[derive(Debug, Clone)]
enum Child {
    Route(RouteDef),
    Group(Group),
}

/// A path prefix plus shared middleware over nested routes and groups.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: String,
    middleware: Vec<Unit>,
    children: Vec<Child>,
}

impl Group {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Append shared middleware. Runs before every child's own chain.
    pub fn middleware(mut self, unit: Unit) -> Self {
        self.middleware.push(unit);
        self
    }

    /// Declare a route relative to this group's prefix.
    pub fn route(
        mut self,
        method: Method,
        path: impl Into<String>,
        chain: impl IntoIterator<Item = Unit>,
    ) -> Self {
        self.children.push(Child::Route(RouteDef {
            method,
            path: path.into(),
            chain: chain.into_iter().collect(),
        }));
        self
    }

    /// Nest another group under this one.
    pub fn group(mut self, group: Group) -> Self {
        self.children.push(Child::Group(group));
        self
    }

    /// Resolve every descendant route to its full path and chain.
    ///
    /// A child's effective chain is this group's middleware followed by the
    /// child's own chain. Routes come out in declaration order, depth first.
    pub fn flatten(self) -> Vec<RouteDef> {
        let mut out = Vec::new();
        self.flatten_into("", &[], &mut out);
        out
    }

    fn flatten_into(self, base: &str, inherited: &[Unit], out: &mut Vec<RouteDef>) {
        let prefix = format!("{base}{}", self.prefix);
        let middleware: Vec<Unit> = inherited.iter().chain(&self.middleware).cloned().collect();

        for child in self.children {
            match child {
                Child::Route(def) => {
                    // An empty chain stays empty so registration can reject it.
                    let chain = if def.chain.is_empty() {
                        def.chain
                    } else {
                        middleware.iter().cloned().chain(def.chain).collect()
                    };
                    out.push(RouteDef {
                        method: def.method,
                        path: format!("{prefix}{}", def.path),
                        chain,
                    });
                }
                Child::Group(group) => group.flatten_into(&prefix, &middleware, out),
            }
        }
    }
}
