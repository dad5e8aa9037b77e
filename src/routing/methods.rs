//! Allowed-methods set.
//!
//! Tracks every HTTP method registered on at least one route so the engine
//! can reject anything else before path matching. The comma-joined `Allow`
//! header value is recomputed whenever a new method is added and read
//! lock-free afterwards.

use axum::http::{HeaderValue, Method};

#[derive(Debug, Clone)]
pub struct AllowedMethods {
    /// Sorted by method name, no duplicates.
    methods: Vec<Method>,
    allow: HeaderValue,
}

impl AllowedMethods {
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            allow: HeaderValue::from_static(""),
        }
    }

    /// Add a method. Returns false if it was already present.
    pub fn insert(&mut self, method: &Method) -> bool {
        match self
            .methods
            .binary_search_by(|m| m.as_str().cmp(method.as_str()))
        {
            Ok(_) => false,
            Err(pos) => {
                self.methods.insert(pos, method.clone());
                self.rejoin();
                true
            }
        }
    }

    pub fn contains(&self, method: &Method) -> bool {
        self.methods
            .binary_search_by(|m| m.as_str().cmp(method.as_str()))
            .is_ok()
    }

    /// Value for the `Allow` header.
    pub fn allow_header(&self) -> &HeaderValue {
        &self.allow
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn rejoin(&mut self) {
        let joined = self
            .methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",");
        // Method names are tokens, so the joined string is always a valid value.
        if let Ok(value) = HeaderValue::from_str(&joined) {
            self.allow = value;
        }
    }
}

impl Default for AllowedMethods {
    fn default() -> Self {
        Self::new()
    }
}
