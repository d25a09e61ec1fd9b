//! Service lookup by request path.
//!
//! # Responsibilities
//! - Store the service descriptors in declaration order
//! - Resolve a request path to the service owning the longest matching prefix
//! - Return an explicit no-match instead of a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(total prefixes) scan per lookup; service tables are small
//! - On equal-length matches the first declared service wins

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::routing::descriptor::ServiceDescriptor;

/// Static table of backend services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    /// Build the registry from (already validated) service configs.
    pub fn from_config(configs: &[ServiceConfig]) -> Self {
        let services = configs
            .iter()
            .map(|c| Arc::new(ServiceDescriptor::from(c)))
            .collect();
        Self { services }
    }

    /// Find the service whose longest route prefix is a prefix of `path`.
    pub fn resolve(&self, path: &str) -> Option<Arc<ServiceDescriptor>> {
        let mut best: Option<(&Arc<ServiceDescriptor>, usize)> = None;

        for service in &self.services {
            for prefix in &service.route_prefixes {
                if !path.starts_with(prefix.as_str()) {
                    continue;
                }
                // Strictly longer only, so earlier declarations keep ties.
                if best.map_or(true, |(_, len)| prefix.len() > len) {
                    best = Some((service, prefix.len()));
                }
            }
        }

        best.map(|(service, _)| Arc::clone(service))
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services.iter().find(|s| s.name == name).cloned()
    }

    /// All services in declaration order.
    pub fn services(&self) -> &[Arc<ServiceDescriptor>] {
        &self.services
    }

    /// Service names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::from_config(&[
            ServiceConfig::new(
                "user-service",
                "http://users:8001",
                &["/api/v1/users", "/api/v1/auth"],
            ),
            ServiceConfig::new("account-service", "http://accounts:8002", &["/api/v1/accounts"]),
            ServiceConfig::new(
                "account-type-service",
                "http://types:8003",
                &["/api/v1/account-types"],
            ),
            ServiceConfig::new("catch-all", "http://legacy:9000", &["/api/v1/"]),
        ])
    }

    #[test]
    fn resolves_longest_prefix() {
        let registry = registry();
        let service = registry.resolve("/api/v1/account-types/5").unwrap();
        assert_eq!(service.name, "account-type-service");

        let service = registry.resolve("/api/v1/accounts/5/balance").unwrap();
        assert_eq!(service.name, "account-service");

        let service = registry.resolve("/api/v1/auth/login").unwrap();
        assert_eq!(service.name, "user-service");
    }

    #[test]
    fn shorter_prefix_still_matches_when_nothing_longer_does() {
        let registry = registry();
        assert_eq!(registry.resolve("/api/v1/unknown").unwrap().name, "catch-all");
    }

    #[test]
    fn no_match_is_none() {
        let registry = ServiceRegistry::from_config(&[ServiceConfig::new(
            "account-service",
            "http://accounts:8002",
            &["/api/v1/accounts"],
        )]);
        assert!(registry.resolve("/api/v1/unknown").is_none());
        assert!(registry.resolve("/health").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn equal_length_tie_goes_to_first_declared() {
        // Validation rejects identical prefixes, but the registry itself must stay deterministic.
        let registry = ServiceRegistry::from_config(&[
            ServiceConfig::new("first", "http://a:1", &["/api/v1/x"]),
            ServiceConfig::new("second", "http://b:1", &["/api/v1/x"]),
        ]);
        assert_eq!(registry.resolve("/api/v1/x/1").unwrap().name, "first");
    }

    #[test]
    fn lookup_by_name_and_order() {
        let registry = registry();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.names()[0], "user-service");
        assert_eq!(registry.get("account-service").unwrap().base_url, "http://accounts:8002");
        assert!(registry.get("missing").is_none());
    }
}
