//! Operation registry - cache key templates per (method, route)

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use super::key::KeyTemplate;
use crate::domain::DomainError;

/// Identifies a cacheable operation by method and route pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub method: Method,
    pub route: String,
}

impl OperationKey {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)
    }
}

impl std::str::FromStr for OperationKey {
    type Err = DomainError;

    /// Parses `"GET /v1/teams/{id}"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, route) = s.trim().split_once(char::is_whitespace).ok_or_else(|| {
            DomainError::configuration(format!(
                "Invalid operation '{}'. Expected '<METHOD> <route>'",
                s
            ))
        })?;

        let method = Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| {
            DomainError::configuration(format!("Invalid HTTP method in operation '{}'", s))
        })?;

        let route = route.trim();

        if !route.starts_with('/') {
            return Err(DomainError::configuration(format!(
                "Route in operation '{}' must start with '/'",
                s
            )));
        }

        Ok(Self::new(method, route))
    }
}

/// Registry of key templates, filled at startup and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    templates: HashMap<OperationKey, KeyTemplate>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template for an operation. Templates are immutable, so a
    /// second registration for the same operation is rejected.
    pub fn register(
        &mut self,
        method: Method,
        route: impl Into<String>,
        template: &str,
    ) -> Result<(), DomainError> {
        let key = OperationKey::new(method, route);
        let template = KeyTemplate::parse(template)?;

        if self.templates.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "A cache key template is already registered for '{}'",
                key
            )));
        }

        self.templates.insert(key, template);
        Ok(())
    }

    /// Registers from the `"GET /route" = "template"` configuration form
    pub fn register_str(&mut self, operation: &str, template: &str) -> Result<(), DomainError> {
        let key: OperationKey = operation.parse()?;
        self.register(key.method, key.route, template)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(
        mut self,
        method: Method,
        route: impl Into<String>,
        template: &str,
    ) -> Result<Self, DomainError> {
        self.register(method, route, template)?;
        Ok(self)
    }

    pub fn template_for(&self, method: &Method, route: &str) -> Option<&KeyTemplate> {
        self.templates
            .get(&OperationKey::new(method.clone(), route))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperationKey, &KeyTemplate)> {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = OperationRegistry::new()
            .with(Method::GET, "/v1/teams", "teams:list")
            .unwrap();

        let template = registry.template_for(&Method::GET, "/v1/teams").unwrap();
        assert_eq!(template.as_str(), "teams:list");
        assert!(registry.template_for(&Method::POST, "/v1/teams").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = OperationRegistry::new();
        registry.register(Method::GET, "/v1/teams", "teams:list").unwrap();

        let result = registry.register(Method::GET, "/v1/teams", "teams:other");
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut registry = OperationRegistry::new();
        let result = registry.register(Method::GET, "/v1/teams", "teams:$args[x]");

        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_str() {
        let mut registry = OperationRegistry::new();
        registry
            .register_str("get /v1/teams/{id}", "teams:$params.id")
            .unwrap();

        assert!(registry.template_for(&Method::GET, "/v1/teams/{id}").is_some());
    }

    #[test]
    fn test_operation_key_parse_errors() {
        assert!("GET".parse::<OperationKey>().is_err());
        assert!("GET v1/teams".parse::<OperationKey>().is_err());
        assert!("G@T /v1".parse::<OperationKey>().is_err());
    }

    #[test]
    fn test_operation_key_display() {
        let key = OperationKey::new(Method::DELETE, "/v1/teams/{id}");
        assert_eq!(key.to_string(), "DELETE /v1/teams/{id}");
    }
}
