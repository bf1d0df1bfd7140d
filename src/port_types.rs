//! Port type registry.
//!
//! Maps a port type identifier to the rules the diagram consults when a
//! connection is committed: compatibility (exact identity, no coercion) and
//! multiplicity (whether an input of that type accepts more than one
//! incoming connector). The registry is filled once at startup from block
//! definitions and is read-only afterwards; diagrams share it through an `Rc`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::PortTypeId;

/// Rules and presentation hints for one port type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTypeInfo {
    #[serde(rename = "type")]
    pub type_id: PortTypeId,
    /// Human-readable name shown in tooltips.
    #[serde(default)]
    pub label: String,
    /// Whether an input port of this type accepts several connectors.
    #[serde(default)]
    pub multiple: bool,
    /// Connector stroke color as `"r:g:b:a"`.
    #[serde(default)]
    pub color: Option<String>,
}

impl PortTypeInfo {
    pub fn new(type_id: &str, label: &str, multiple: bool) -> Self {
        Self {
            type_id: type_id.to_string(),
            label: label.to_string(),
            multiple,
            color: None,
        }
    }
}

/// Registry of known port types, kept in registration order.
#[derive(Clone, Debug, Default)]
pub struct PortTypeRegistry {
    types: IndexMap<PortTypeId, PortTypeInfo>,
}

impl PortTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of definitions. Later definitions of the
    /// same type replace earlier ones.
    pub fn from_definitions<I: IntoIterator<Item = PortTypeInfo>>(defs: I) -> Self {
        let mut registry = Self::new();
        for info in defs {
            registry.register(info);
        }
        registry
    }

    /// Replace or insert a port type definition.
    pub fn register(&mut self, info: PortTypeInfo) {
        self.types.insert(info.type_id.clone(), info);
    }

    pub fn get(&self, type_id: &str) -> Option<&PortTypeInfo> {
        self.types.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// Two port types are compatible only when they are the same type.
    pub fn is_compatible(&self, a: &str, b: &str) -> bool {
        a == b
    }

    /// Unknown types never accept multiple connectors.
    pub fn accepts_multiple(&self, type_id: &str) -> bool {
        self.types.get(type_id).is_some_and(|t| t.multiple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortTypeInfo> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PortTypeRegistry {
        PortTypeRegistry::from_definitions([
            PortTypeInfo::new("double", "Double", false),
            PortTypeInfo::new("sound", "Sound", true),
        ])
    }

    #[test]
    fn test_exact_match_compatibility() {
        let reg = registry();
        assert!(reg.is_compatible("double", "double"));
        assert!(!reg.is_compatible("double", "sound"));
        assert!(!reg.is_compatible("int", "double"));
    }

    #[test]
    fn test_accepts_multiple() {
        let reg = registry();
        assert!(reg.accepts_multiple("sound"));
        assert!(!reg.accepts_multiple("double"));
        assert!(!reg.accepts_multiple("unknown"));
    }

    #[test]
    fn test_register_replaces() {
        let mut reg = registry();
        reg.register(PortTypeInfo::new("double", "Double", true));
        assert_eq!(reg.len(), 2);
        assert!(reg.accepts_multiple("double"));
    }

    #[test]
    fn test_definitions_from_json() {
        let defs: Vec<PortTypeInfo> = serde_json::from_str(
            r#"[{"type":"image","label":"Image"},{"type":"sound","multiple":true,"color":"0:0:255:255"}]"#,
        )
        .unwrap();
        let reg = PortTypeRegistry::from_definitions(defs);
        assert!(reg.contains("image"));
        assert!(!reg.accepts_multiple("image"));
        assert_eq!(reg.get("sound").and_then(|t| t.color.as_deref()), Some("0:0:255:255"));
    }
}
