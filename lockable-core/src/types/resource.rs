use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// One allocatable resource: an immutable attribute mapping with a unique `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Canonical string form of the `id` attribute (numbers are rendered as text).
    id: String,
    attributes: Map<String, Value>,
}

impl Resource {
    /// Builds a resource from a decoded catalog entry. `index` is only used for
    /// error reporting.
    pub(crate) fn from_entry(index: usize, attributes: Map<String, Value>) -> Result<Self, CatalogError> {
        let id = match attributes.get("id") {
            None | Some(Value::Null) => return Err(CatalogError::MissingId { index }),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(CatalogError::Malformed(format!(
                    "entry #{} has a non-scalar id: {}",
                    index, other
                )));
            }
        };

        // The id names the lock artifact, so it must be usable as a file name.
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(CatalogError::Malformed(format!(
                "entry #{} has an id that cannot name a lock slot: {:?}",
                index, id
            )));
        }

        Ok(Self { id, attributes })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

impl TryFrom<Map<String, Value>> for Resource {
    type Error = CatalogError;

    fn try_from(attributes: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_entry(0, attributes)
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.attributes.clone()))
    }
}
