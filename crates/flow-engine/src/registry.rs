//! Component registry
//!
//! Maps a component type to its schema: display name, allowed input and
//! output types, port arity and default configuration. The registry is the
//! single source of truth for palette contents, default configuration and
//! connection legality. It is populated once at start-up and read-only
//! afterwards.
//!
//! # Usage
//!
//! ```ignore
//! use flow_engine::{ComponentRegistry, ComponentType};
//!
//! let registry = ComponentRegistry::with_builtins();
//! let schema = registry.get_schema(ComponentType::AiEvaluator)?;
//! assert!(schema.accepts_input_from(ComponentType::PriceListener));
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::components::NodeConfig;
use crate::error::{FlowEngineError, Result};
use crate::types::{ComponentCategory, ComponentType, PortMode};

/// Static metadata describing a component type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchema {
    /// Type id
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Display name
    pub name: String,
    /// Category for palette grouping and execution dispatch
    pub category: ComponentCategory,
    /// Description shown in the palette
    pub description: String,
    /// Arity of the input port
    pub input_mode: PortMode,
    /// Arity of the output port
    pub output_mode: PortMode,
    /// Types that may feed into this type
    pub input_connectables: BTreeSet<ComponentType>,
    /// Types this type may feed
    pub output_connectables: BTreeSet<ComponentType>,
    /// Default configuration copied onto new nodes
    pub default_config: serde_json::Value,
}

impl ComponentSchema {
    /// Create a schema with no connectables and an empty default configuration
    pub fn new(
        component_type: ComponentType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            component_type,
            name: name.into(),
            category: component_type.category(),
            description: description.into(),
            input_mode: PortMode::Single,
            output_mode: PortMode::Single,
            input_connectables: BTreeSet::new(),
            output_connectables: BTreeSet::new(),
            default_config: serde_json::json!({}),
        }
    }

    /// Set the input arity and the types accepted as input
    pub fn inputs(mut self, mode: PortMode, types: &[ComponentType]) -> Self {
        self.input_mode = mode;
        self.input_connectables = types.iter().copied().collect();
        self
    }

    /// Set the output arity and the types this component may feed
    pub fn outputs(mut self, mode: PortMode, types: &[ComponentType]) -> Self {
        self.output_mode = mode;
        self.output_connectables = types.iter().copied().collect();
        self
    }

    /// Set the default configuration
    pub fn with_default_config(mut self, config: serde_json::Value) -> Self {
        self.default_config = config;
        self
    }

    /// Whether `source` is listed in this type's input connectables
    pub fn accepts_input_from(&self, source: ComponentType) -> bool {
        self.input_connectables.contains(&source)
    }

    /// Whether this component has an input port at all
    pub fn has_input(&self) -> bool {
        !self.input_connectables.is_empty()
    }

    /// Whether this component has an output port at all
    pub fn has_output(&self) -> bool {
        !self.output_connectables.is_empty()
    }
}

/// Link-time registration of a built-in component schema.
///
/// ```ignore
/// inventory::submit!(flow_engine::SchemaFn(price_listener_schema));
/// ```
pub struct SchemaFn(pub fn() -> ComponentSchema);

inventory::collect!(SchemaFn);

/// Registry of component schemas keyed by component type
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    schemas: HashMap<ComponentType, ComponentSchema>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in component schema
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for schema_fn in inventory::iter::<SchemaFn> {
            registry.register((schema_fn.0)());
        }
        log::debug!("Component registry initialized with {} schemas", registry.len());
        registry
    }

    /// Register a schema, replacing any schema with the same type
    pub fn register(&mut self, schema: ComponentSchema) {
        self.schemas.insert(schema.component_type, schema);
    }

    /// Look up the schema for a component type
    pub fn get_schema(&self, component_type: ComponentType) -> Result<&ComponentSchema> {
        self.schemas
            .get(&component_type)
            .ok_or_else(|| FlowEngineError::UnknownType(component_type.to_string()))
    }

    /// Look up the schema for a type id string
    pub fn get_schema_by_id(&self, type_id: &str) -> Result<&ComponentSchema> {
        let component_type: ComponentType = type_id.parse()?;
        self.get_schema(component_type)
    }

    /// Check if a component type is registered
    pub fn has_component(&self, component_type: ComponentType) -> bool {
        self.schemas.contains_key(&component_type)
    }

    /// Fresh typed default configuration for a component type
    pub fn default_config(&self, component_type: ComponentType) -> Result<NodeConfig> {
        let schema = self.get_schema(component_type)?;
        NodeConfig::from_value(component_type, schema.default_config.clone())
    }

    /// All registered schemas in palette order
    pub fn all_schemas(&self) -> Vec<&ComponentSchema> {
        let mut schemas: Vec<&ComponentSchema> = self.schemas.values().collect();
        schemas.sort_by_key(|s| s.component_type);
        schemas
    }

    /// All registered component types in palette order
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.all_schemas().iter().map(|s| s.component_type).collect()
    }

    /// Schemas grouped by category, categories in palette order.
    ///
    /// Categories without any registered schema are omitted.
    pub fn palette(&self) -> Vec<(ComponentCategory, Vec<&ComponentSchema>)> {
        let all = self.all_schemas();
        ComponentCategory::ORDER
            .iter()
            .filter_map(|category| {
                let entries: Vec<&ComponentSchema> = all
                    .iter()
                    .copied()
                    .filter(|s| s.category == *category)
                    .collect();
                if entries.is_empty() {
                    None
                } else {
                    Some((*category, entries))
                }
            })
            .collect()
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Merge another registry into this one
    ///
    /// Schemas from `other` override schemas in `self` with the same type.
    pub fn merge(&mut self, other: ComponentRegistry) {
        self.schemas.extend(other.schemas);
    }
}
