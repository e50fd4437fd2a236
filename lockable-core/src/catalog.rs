//! The static list of allocatable resources.
//!
//! A catalog is validated once, when it is loaded: it must be a JSON array of
//! objects, every object must carry an `id`, and ids must be unique. Any
//! violation rejects the whole catalog.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use crate::error::CatalogError;
use crate::types::Resource;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
}

impl Catalog {
    /// Read and validate a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), resources = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        let Value::Array(entries) = value else {
            return Err(CatalogError::Malformed("expected a list of resources".into()));
        };

        let mut seen = HashSet::with_capacity(entries.len());
        let mut resources = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let Value::Object(attributes) = entry else {
                return Err(CatalogError::Malformed(format!(
                    "entry #{} is not an object",
                    index
                )));
            };
            let resource = Resource::from_entry(index, attributes)?;
            if !seen.insert(resource.id().to_string()) {
                return Err(CatalogError::DuplicateId(resource.id().to_string()));
            }
            resources.push(resource);
        }

        Ok(Self { resources })
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
