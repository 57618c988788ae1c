use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::BindingType;

pub type Name = String;
/// Integer key assigned to component property and event names.
pub type PropertyKey = u32;
pub type TypeProperties = IndexMap<Name, ExtensionProperty>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionProperty {
    pub binding: BindingType,
    pub default: Value,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefinition {
    pub uri: String,
    pub name: Name,
    pub properties: TypeProperties,
    pub require_response: bool,
    pub allow_fast_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventExecutionMode {
    Normal,
    Fast,
}

impl EventExecutionMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NORMAL" => Some(EventExecutionMode::Normal),
            "FAST" => Some(EventExecutionMode::Fast),
            _ => None,
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, EventExecutionMode::Fast)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EventHandlerDefinition {
    pub uri: String,
    pub name: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveDataKind {
    Array,
    Object,
}

/// Which property changes fire a live-data handler, and whether simultaneous changes
/// collapse into a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    pub event_handler: Option<Name>,
    /// Property name → collapse flag.
    pub properties: BTreeMap<Name, bool>,
}

impl TriggerConfig {
    pub fn handler(&self) -> Option<&str> {
        self.event_handler.as_deref().filter(|name| !name.is_empty())
    }

    /// `None` when the property does not fire this trigger at all.
    pub fn collapse(&self, property: &str) -> Option<bool> {
        self.properties.get(property).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataDefinition {
    pub name: Name,
    pub kind: LiveDataKind,
    /// Element type for arrays, property type for objects (without the `[]` suffix).
    pub type_name: Name,
    pub initial: Value,
    pub add: TriggerConfig,
    pub update: TriggerConfig,
    pub remove: TriggerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub uri: String,
    pub name: Name,
    pub resource_type: Option<String>,
    pub visual_context: String,
    pub properties: BTreeMap<PropertyKey, ExtensionProperty>,
    pub event_handlers: BTreeMap<PropertyKey, EventHandlerDefinition>,
    pub commands: Vec<CommandDefinition>,
}

/// What the document sees as `${environment.extension.<Name>}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Environment {
    /// Extension is available but published no structured data.
    #[default]
    Present,
    Map(Map<String, Value>),
}

impl Environment {
    pub fn to_value(&self) -> Value {
        match self {
            Environment::Present => Value::Bool(true),
            Environment::Map(map) => Value::Object(map.clone()),
        }
    }
}

impl Serialize for Environment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSchema {
    pub uri: String,
    pub version: String,
    pub types: IndexMap<Name, TypeProperties>,
    pub commands: Vec<CommandDefinition>,
    pub event_handlers: Vec<EventHandlerDefinition>,
    pub event_modes: IndexMap<Name, EventExecutionMode>,
    pub live_data: IndexMap<Name, LiveDataDefinition>,
    pub components: Vec<ComponentDefinition>,
    pub environment: Environment,
}

impl ExtensionSchema {
    pub fn empty(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            version: String::new(),
            types: IndexMap::new(),
            commands: Vec::new(),
            event_handlers: Vec::new(),
            event_modes: IndexMap::new(),
            live_data: IndexMap::new(),
            components: Vec::new(),
            environment: Environment::Present,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn type_properties(&self, name: &str) -> Option<&TypeProperties> {
        self.types.get(name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|command| command.name == name)
    }

    pub fn event_mode(&self, name: &str) -> Option<EventExecutionMode> {
        self.event_modes.get(name).copied()
    }

    pub fn live_data(&self, name: &str) -> Option<&LiveDataDefinition> {
        self.live_data.get(name)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDefinition> {
        self.components.iter().find(|component| component.name == name)
    }
}
