//! Declarative route descriptors and the method-keyed route table.

use std::collections::HashMap;

use super::handler::{Controller, Middleware};

/// Matcher options: the path pattern plus optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOptions {
    /// Pattern such as `/items/:id` or `/items/{id}`.
    pub path: String,
    pub name: Option<String>,
    /// Accepted `Accept-Version` values; empty accepts any.
    pub versions: Vec<String>,
}

impl RouteOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            versions: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.versions.push(version.into());
        self
    }
}

impl From<&str> for RouteOptions {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RouteOptions {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// One endpoint: matcher, guards and terminal handler.
///
/// Guards run in order auth, cache, precondition. A missing controller is
/// rejected at assembly.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub options: RouteOptions,
    pub auth_method: Option<Middleware>,
    pub cache: Option<Middleware>,
    pub precondition: Option<Middleware>,
    pub controller: Option<Controller>,
}

impl RouteDescriptor {
    pub fn new(options: impl Into<RouteOptions>) -> Self {
        Self {
            options: options.into(),
            auth_method: None,
            cache: None,
            precondition: None,
            controller: None,
        }
    }

    pub fn auth(mut self, middleware: Middleware) -> Self {
        self.auth_method = Some(middleware);
        self
    }

    pub fn cache(mut self, middleware: Middleware) -> Self {
        self.cache = Some(middleware);
        self
    }

    pub fn precondition(mut self, middleware: Middleware) -> Self {
        self.precondition = Some(middleware);
        self
    }

    pub fn controller(mut self, controller: Controller) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn path(&self) -> &str {
        &self.options.path
    }
}

/// Method name to ordered descriptors. Method names are case-insensitive
/// and the order methods were first added is kept.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    methods: Vec<(String, Vec<RouteDescriptor>)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push`](Self::push).
    pub fn route(mut self, method: &str, descriptor: RouteDescriptor) -> Self {
        self.push(method, descriptor);
        self
    }

    pub fn push(&mut self, method: &str, descriptor: RouteDescriptor) {
        let method = method.to_ascii_lowercase();
        match self.methods.iter_mut().find(|(m, _)| *m == method) {
            Some((_, routes)) => routes.push(descriptor),
            None => self.methods.push((method, vec![descriptor])),
        }
    }

    pub fn get(&self, method: &str) -> Option<&[RouteDescriptor]> {
        let method = method.to_ascii_lowercase();
        self.methods
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, routes)| routes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.methods.iter().map(|(_, routes)| routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_methods(self) -> Vec<(String, Vec<RouteDescriptor>)> {
        self.methods
    }
}

impl From<HashMap<String, Vec<RouteDescriptor>>> for RouteTable {
    /// Methods are sorted by name since map order is arbitrary.
    fn from(map: HashMap<String, Vec<RouteDescriptor>>) -> Self {
        let mut entries: Vec<_> = map.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut table = RouteTable::new();
        for (method, routes) in entries {
            for route in routes {
                table.push(&method, route);
            }
        }
        table
    }
}
