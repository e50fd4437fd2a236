use crate::types::{Requirements, Resource};

/// A pure filter over the catalog.
pub struct RequirementMatcher;

impl RequirementMatcher {
    /// True when every requirement key is present on the resource with an equal
    /// value. No coercion: the string `"1"` does not match the number `1`, and a
    /// `null` requirement only matches an explicit `null` attribute.
    pub fn matches(resource: &Resource, requirements: &Requirements) -> bool {
        requirements
            .iter()
            .all(|(key, expected)| resource.get(key) == Some(expected))
    }

    /// Returns the matching resources in catalog order.
    pub fn filter(resources: &[Resource], requirements: &Requirements) -> Vec<Resource> {
        resources
            .iter()
            .filter(|r| Self::matches(r, requirements))
            .cloned()
            .collect()
    }
}
