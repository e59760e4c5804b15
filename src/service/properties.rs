// src/service/properties.rs - Named solver properties with JSON introspection

//! A bounded table of named `u32` properties a host can inspect and tune
//! without recompiling. Each property declares its default and an inclusive
//! range; sets outside the range are rejected.

use super::types::ServiceError;
use serde::Serialize;

/// Upper bound on table entries
pub const MAX_NUM_PROPERTIES: usize = 16;

/// Worker thread count property name
pub const PROP_NUM_THREADS: &str = "NUM_THREADS";
/// Trim round count property name
pub const PROP_NUM_TRIMS: &str = "NUM_TRIMS";

/// One named, range-checked property
#[derive(Debug, Clone, Serialize)]
pub struct SolverProperty {
    /// Property name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Value used until a host sets one
    pub default_value: u32,
    /// Inclusive minimum
    pub min_value: u32,
    /// Inclusive maximum
    pub max_value: u32,
    /// Current value
    #[serde(skip)]
    pub value: u32,
}

/// Bounded property table
#[derive(Debug, Default)]
pub struct PropertyTable {
    props: Vec<SolverProperty>,
}

impl PropertyTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property. Fails once [`MAX_NUM_PROPERTIES`] are held.
    pub fn add(
        &mut self,
        name: &str,
        description: &str,
        default_value: u32,
        min_value: u32,
        max_value: u32,
    ) -> Result<(), ServiceError> {
        if self.props.len() >= MAX_NUM_PROPERTIES {
            return Err(ServiceError::TooManyProperties);
        }
        self.props.push(SolverProperty {
            name: name.to_string(),
            description: description.to_string(),
            default_value,
            min_value,
            max_value,
            value: default_value,
        });
        Ok(())
    }

    /// Current value of a property
    pub fn get(&self, name: &str) -> Option<u32> {
        self.props.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// Set a property, enforcing its declared range
    pub fn set(&mut self, name: &str, value: u32) -> Result<(), ServiceError> {
        let prop = self
            .props
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ServiceError::PropertyNotFound(name.to_string()))?;
        if value < prop.min_value || value > prop.max_value {
            return Err(ServiceError::PropertyOutOfRange {
                name: name.to_string(),
                value,
                min: prop.min_value,
                max: prop.max_value,
            });
        }
        prop.value = value;
        Ok(())
    }

    /// All properties as a JSON array of metadata objects
    pub fn as_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PropertyTable {
        let mut t = PropertyTable::new();
        t.add(PROP_NUM_THREADS, "worker threads per solve", 4, 1, 64)
            .unwrap();
        t.add(PROP_NUM_TRIMS, "trim rounds per solve", 7, 0, 256)
            .unwrap();
        t
    }

    #[test]
    fn defaults_and_sets() {
        let mut t = table();
        assert_eq!(t.get(PROP_NUM_THREADS), Some(4));
        t.set(PROP_NUM_THREADS, 8).unwrap();
        assert_eq!(t.get(PROP_NUM_THREADS), Some(8));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut t = table();
        let err = t.set(PROP_NUM_THREADS, 65).unwrap_err();
        assert!(matches!(err, ServiceError::PropertyOutOfRange { .. }));
        assert_eq!(t.get(PROP_NUM_THREADS), Some(4));
    }

    #[test]
    fn unknown_property() {
        let mut t = table();
        assert!(t.get("NUM_DUCKS").is_none());
        assert!(matches!(
            t.set("NUM_DUCKS", 1),
            Err(ServiceError::PropertyNotFound(_))
        ));
    }

    #[test]
    fn json_lists_metadata() {
        let t = table();
        let json = t.as_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"name\":\"NUM_THREADS\""));
        assert!(json.contains("\"min_value\":1"));
        // current values are runtime state, not introspection metadata
        assert!(!json.contains("\"value\""));
    }

    #[test]
    fn table_is_bounded() {
        let mut t = PropertyTable::new();
        for i in 0..MAX_NUM_PROPERTIES {
            t.add(&format!("P{}", i), "", 0, 0, 1).unwrap();
        }
        assert!(matches!(
            t.add("ONE_TOO_MANY", "", 0, 0, 1),
            Err(ServiceError::TooManyProperties)
        ));
    }
}
