//! Builds an [`ExtensionSchema`] from the `schema` member of a `RegisterSuccess` message.
//!
//! Only the document header can fail a registration: the schema type tag, its version and the
//! extension URI. Everything below the header is read section by section and entry by entry;
//! a malformed entry is skipped and reported as a [`SchemaWarning`] so one bad command
//! definition does not take the whole extension down.

use std::collections::BTreeMap;

use extlink_protocol::MAX_SCHEMA_VERSION;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    BindingType, CommandDefinition, ComponentDefinition, EventExecutionMode,
    EventHandlerDefinition, ExtensionProperty, ExtensionSchema, LiveDataDefinition, LiveDataKind,
    PropertyKeyRegistry, TriggerConfig, TypeProperties, truthy,
};

const SCHEMA_TYPE: &str = "Schema";
const ARRAY_SUFFIX: &str = "[]";
const ALL_PROPERTIES: &str = "*";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema must be an object")]
    NotAnObject,
    #[error("unsupported schema type '{found}'")]
    UnsupportedType { found: String },
    #[error("unsupported extension schema version '{version}' (max {max})")]
    UnsupportedVersion { version: String, max: String },
    #[error("missing or invalid extension URI")]
    MissingUri,
}

/// Recoverable problem found while reading a schema; the offending entry was skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaWarning {
    #[error("malformed '{section}' block")]
    MalformedSection { section: &'static str },
    #[error("invalid entry in '{section}': {reason}")]
    InvalidEntry { section: &'static str, reason: String },
    #[error("duplicate {section} definition '{name}' ignored")]
    Duplicate { section: &'static str, name: String },
    #[error("unknown type '{parent}' extended by type '{type_name}'")]
    UnknownParentType { type_name: String, parent: String },
    #[error("invalid property '{property}' of '{owner}'")]
    InvalidProperty { owner: String, property: String },
    #[error("command '{command}' references unknown payload type '{payload}'")]
    UnknownPayloadType { command: String, payload: String },
    #[error("data type '{type_name}' for live data '{name}' is invalid")]
    InvalidLiveDataType { name: String, type_name: String },
    #[error("initial data for live data '{name}' should be {expected}")]
    InvalidInitialData { name: String, expected: &'static str },
    #[error("trigger properties for live data '{name}' should be an array")]
    InvalidTriggerProperties { name: String },
}

/// Parsed schema plus every entry-level problem that was skipped over.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub schema: ExtensionSchema,
    pub warnings: Vec<SchemaWarning>,
}

/// Reads schema documents. Component property/event names are registered with `registry`.
pub struct SchemaReader<'a> {
    registry: &'a PropertyKeyRegistry,
    max_version: String,
}

impl<'a> SchemaReader<'a> {
    pub fn new(registry: &'a PropertyKeyRegistry) -> Self {
        Self {
            registry,
            max_version: MAX_SCHEMA_VERSION.into(),
        }
    }

    pub fn max_version(mut self, version: impl Into<String>) -> Self {
        self.max_version = version.into();
        self
    }

    pub fn read(&self, raw: &Value) -> Result<ParsedSchema, SchemaError> {
        let doc = raw.as_object().ok_or(SchemaError::NotAnObject)?;

        let schema_type = str_field(doc, "type").unwrap_or_default();
        if schema_type != SCHEMA_TYPE {
            return Err(SchemaError::UnsupportedType {
                found: schema_type.to_owned(),
            });
        }
        // Plain string ordering, so "1.10" sorts below "1.2".
        let version = str_field(doc, "version").unwrap_or_default();
        if version > self.max_version.as_str() {
            return Err(SchemaError::UnsupportedVersion {
                version: version.to_owned(),
                max: self.max_version.clone(),
            });
        }
        let uri = match str_field(doc, "uri") {
            Some(uri) if !uri.is_empty() => uri.to_owned(),
            _ => return Err(SchemaError::MissingUri),
        };

        let mut state = ReadState {
            registry: self.registry,
            schema: ExtensionSchema::empty(uri),
            warnings: Vec::new(),
        };
        state.schema.version = version.to_owned();

        if let Some(types) = state.section(doc, "types") {
            state.read_types(&types);
        }
        if let Some(commands) = state.section(doc, "commands") {
            let commands = state.read_commands(&commands);
            state.schema.commands.extend(commands);
        }
        if let Some(events) = state.section(doc, "events") {
            state.read_events(&events);
        }
        if let Some(live_data) = state.section(doc, "liveData") {
            state.read_live_data(&live_data);
        }
        if let Some(components) = state.section(doc, "components") {
            state.read_components(&components);
        }

        Ok(ParsedSchema {
            schema: state.schema,
            warnings: state.warnings,
        })
    }
}

struct ReadState<'a> {
    registry: &'a PropertyKeyRegistry,
    schema: ExtensionSchema,
    warnings: Vec<SchemaWarning>,
}

impl ReadState<'_> {
    fn warn(&mut self, warning: SchemaWarning) {
        log::warn!("extension {}: {}", self.schema.uri, warning);
        self.warnings.push(warning);
    }

    /// A single object counts as a one-element array; absent means empty.
    fn section(&mut self, doc: &Map<String, Value>, section: &'static str) -> Option<Vec<Value>> {
        match arrayify(doc.get(section)) {
            Some(items) => Some(items),
            None => {
                self.warn(SchemaWarning::MalformedSection { section });
                None
            }
        }
    }

    fn read_types(&mut self, types: &[Value]) {
        for entry in types {
            let name = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());
            let props = entry.get("properties").and_then(Value::as_object);
            let (Some(name), Some(props)) = (name, props) else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "types",
                    reason: "a type needs a name and a properties map".into(),
                });
                continue;
            };
            if self.schema.types.contains_key(name) {
                self.warn(SchemaWarning::Duplicate {
                    section: "types",
                    name: name.to_owned(),
                });
                continue;
            }

            let mut properties = TypeProperties::new();
            if let Some(parent) = entry.get("extends").and_then(Value::as_str) {
                match self.schema.types.get(parent).cloned() {
                    Some(inherited) => properties.extend(inherited),
                    None => self.warn(SchemaWarning::UnknownParentType {
                        type_name: name.to_owned(),
                        parent: parent.to_owned(),
                    }),
                }
            }
            for (prop_name, definition) in props {
                if let Some(property) = self.read_property(name, prop_name, definition) {
                    properties.insert(prop_name.clone(), property);
                }
            }
            self.schema.types.insert(name.to_owned(), properties);
        }
    }

    /// `"number"` shorthand (required) or `{type, default, required}` (optional by default).
    fn read_property(&mut self, owner: &str, name: &str, definition: &Value) -> Option<ExtensionProperty> {
        let (binding, default, required) = match definition {
            Value::String(type_name) => (
                BindingType::from_name(type_name).unwrap_or(BindingType::Any),
                Value::Null,
                true,
            ),
            Value::Object(map) if map.contains_key("type") => (
                map.get("type")
                    .and_then(Value::as_str)
                    .and_then(BindingType::from_name)
                    .unwrap_or(BindingType::Any),
                map.get("default").cloned().unwrap_or(Value::Null),
                flag(map, "required", false),
            ),
            _ => {
                self.warn(SchemaWarning::InvalidProperty {
                    owner: owner.to_owned(),
                    property: name.to_owned(),
                });
                return None;
            }
        };
        Some(ExtensionProperty {
            binding,
            default: binding.coerce(&default),
            required,
        })
    }

    fn read_commands(&mut self, commands: &[Value]) -> Vec<CommandDefinition> {
        let mut definitions = Vec::new();
        for entry in commands {
            let Some(command) = entry.as_object() else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "commands",
                    reason: "a command must be an object".into(),
                });
                continue;
            };
            let Some(name) = str_field(command, "name").filter(|n| !n.is_empty()) else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "commands",
                    reason: "a command needs a name".into(),
                });
                continue;
            };

            let mut properties = TypeProperties::new();
            if let Some(payload) = command.get("payload") {
                let type_name = match payload {
                    Value::String(type_name) => type_name.as_str(),
                    Value::Object(inline) => str_field(inline, "type").unwrap_or_default(),
                    _ => "",
                };
                match self.schema.types.get(type_name).cloned() {
                    Some(payload_props) => properties = payload_props,
                    None => {
                        self.warn(SchemaWarning::UnknownPayloadType {
                            command: name.to_owned(),
                            payload: type_name.to_owned(),
                        });
                        continue;
                    }
                }
            }

            definitions.push(CommandDefinition {
                uri: self.schema.uri.clone(),
                name: name.to_owned(),
                properties,
                require_response: flag(command, "requireResponse", false),
                allow_fast_mode: flag(command, "allowFastMode", false),
            });
        }
        definitions
    }

    /// Returns the handlers that were accepted, recording their execution modes.
    fn read_event_handlers(
        &mut self,
        section: &'static str,
        handlers: &[Value],
    ) -> Vec<EventHandlerDefinition> {
        let mut accepted = Vec::new();
        for entry in handlers {
            let Some(name) = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty())
            else {
                self.warn(SchemaWarning::InvalidEntry {
                    section,
                    reason: "an event handler needs a name".into(),
                });
                continue;
            };
            let mode = entry
                .get("mode")
                .and_then(Value::as_str)
                .and_then(EventExecutionMode::from_name)
                .unwrap_or(EventExecutionMode::Fast);
            self.schema.event_modes.entry(name.to_owned()).or_insert(mode);
            accepted.push(EventHandlerDefinition {
                uri: self.schema.uri.clone(),
                name: name.to_owned(),
            });
        }
        accepted
    }

    fn read_events(&mut self, handlers: &[Value]) {
        let handlers = self.read_event_handlers("events", handlers);
        self.schema.event_handlers.extend(handlers);
    }

    fn read_live_data(&mut self, bindings: &[Value]) {
        for binding in bindings {
            let Some(name) = binding.get("name").and_then(Value::as_str).filter(|n| !n.is_empty())
            else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "liveData",
                    reason: "a live data binding needs a name".into(),
                });
                continue;
            };
            let Some(declared) = binding.get("type").and_then(Value::as_str) else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "liveData",
                    reason: format!("live data '{name}' needs a type"),
                });
                continue;
            };
            if self.schema.live_data.contains_key(name) {
                self.warn(SchemaWarning::Duplicate {
                    section: "liveData",
                    name: name.to_owned(),
                });
                continue;
            }

            let (kind, type_name) = match declared.find(ARRAY_SUFFIX) {
                Some(pos) => (LiveDataKind::Array, &declared[..pos]),
                None => (LiveDataKind::Object, declared),
            };
            let declared_type = self.schema.types.get(type_name).cloned();
            let primitive_element =
                kind == LiveDataKind::Array && BindingType::from_name(type_name).is_some();
            if declared_type.is_none() && !primitive_element {
                self.warn(SchemaWarning::InvalidLiveDataType {
                    name: name.to_owned(),
                    type_name: type_name.to_owned(),
                });
                continue;
            }
            let type_props = declared_type.unwrap_or_default();

            let initial = self.initial_data(name, kind, binding.get("data"));

            let mut add = TriggerConfig::default();
            let mut update = TriggerConfig::default();
            let mut remove = TriggerConfig::default();
            if let Some(events) = binding.get("events").and_then(Value::as_object) {
                if let Some(trigger) = self.trigger(name, events, "add", &type_props) {
                    add = trigger;
                }
                if let Some(trigger) = self.trigger(name, events, "update", &type_props) {
                    update = trigger;
                }
                // Map `Set` operations report through the update handler.
                if let Some(trigger) = self.trigger(name, events, "set", &type_props) {
                    update = trigger;
                }
                if let Some(trigger) = self.trigger(name, events, "remove", &type_props) {
                    remove = trigger;
                }
            }

            self.schema.live_data.insert(
                name.to_owned(),
                LiveDataDefinition {
                    name: name.to_owned(),
                    kind,
                    type_name: type_name.to_owned(),
                    initial,
                    add,
                    update,
                    remove,
                },
            );
        }
    }

    fn initial_data(&mut self, name: &str, kind: LiveDataKind, data: Option<&Value>) -> Value {
        match (kind, data) {
            (LiveDataKind::Array, Some(Value::Array(items))) => Value::Array(items.clone()),
            (LiveDataKind::Object, Some(Value::Object(map))) => Value::Object(map.clone()),
            (kind, data) => {
                if data.is_some_and(|data| !data.is_null()) {
                    self.warn(SchemaWarning::InvalidInitialData {
                        name: name.to_owned(),
                        expected: match kind {
                            LiveDataKind::Array => "an array",
                            LiveDataKind::Object => "a map",
                        },
                    });
                }
                match kind {
                    LiveDataKind::Array => Value::Array(Vec::new()),
                    LiveDataKind::Object => Value::Object(Map::new()),
                }
            }
        }
    }

    fn trigger(
        &mut self,
        live_name: &str,
        events: &Map<String, Value>,
        block: &str,
        type_props: &TypeProperties,
    ) -> Option<TriggerConfig> {
        let event = events.get(block)?.as_object()?;
        let properties = match event.get("properties") {
            None | Some(Value::Null) => include_all(type_props),
            Some(Value::Array(triggers)) => requested_triggers(type_props, triggers),
            Some(_) => {
                self.warn(SchemaWarning::InvalidTriggerProperties {
                    name: live_name.to_owned(),
                });
                include_all(type_props)
            }
        };
        Some(TriggerConfig {
            event_handler: str_field(event, "eventHandler")
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
            properties,
        })
    }

    fn read_components(&mut self, components: &[Value]) {
        for entry in components {
            let Some(component) = entry.as_object() else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "components",
                    reason: "a component must be an object".into(),
                });
                continue;
            };
            let Some(name) = str_field(component, "name").filter(|n| !n.is_empty()) else {
                self.warn(SchemaWarning::InvalidEntry {
                    section: "components",
                    reason: "a component needs a name".into(),
                });
                continue;
            };

            let events = match component.get("events") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(events)) => events.clone(),
                Some(_) => {
                    self.warn(SchemaWarning::InvalidEntry {
                        section: "components",
                        reason: format!("component '{name}' has a malformed 'events' block"),
                    });
                    continue;
                }
            };

            let commands = match component.get("commands") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(commands)) => self.read_commands(commands),
                Some(_) => {
                    self.warn(SchemaWarning::InvalidEntry {
                        section: "components",
                        reason: format!("component '{name}' has a malformed 'commands' block"),
                    });
                    Vec::new()
                }
            };
            self.schema.commands.extend(commands.iter().cloned());

            let mut event_handlers = BTreeMap::new();
            for handler in self.read_event_handlers("components", &events) {
                let key = self.registry.append(&handler.name);
                event_handlers.insert(key, handler);
            }

            let mut properties = BTreeMap::new();
            if let Some(props) = component.get("properties").and_then(Value::as_object) {
                for (prop_name, definition) in props {
                    if let Some(property) = self.read_property(name, prop_name, definition) {
                        properties.insert(self.registry.append(prop_name), property);
                    }
                }
            }

            self.schema.components.push(ComponentDefinition {
                uri: self.schema.uri.clone(),
                name: name.to_owned(),
                resource_type: str_field(component, "resourceType").map(str::to_owned),
                visual_context: str_field(component, "context").unwrap_or_default().to_owned(),
                properties,
                event_handlers,
                commands,
            });
        }
    }
}

fn arrayify(value: Option<&Value>) -> Option<Vec<Value>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items.clone()),
        Some(object @ Value::Object(_)) => Some(vec![object.clone()]),
        Some(_) => None,
    }
}

fn str_field<'v>(map: &'v Map<String, Value>, field: &str) -> Option<&'v str> {
    map.get(field).and_then(Value::as_str)
}

fn flag(map: &Map<String, Value>, field: &str, default: bool) -> bool {
    match map.get(field) {
        None | Some(Value::Null) => default,
        Some(value) => truthy(value),
    }
}

fn include_all(type_props: &TypeProperties) -> BTreeMap<String, bool> {
    type_props.keys().map(|name| (name.clone(), true)).collect()
}

/// `{name, update, collapse}` entries applied in order; `"*"` addresses every property.
/// Names the type does not declare are dropped.
fn requested_triggers(type_props: &TypeProperties, triggers: &[Value]) -> BTreeMap<String, bool> {
    let mut requested = BTreeMap::new();
    for trigger in triggers {
        let Some(trigger) = trigger.as_object() else {
            continue;
        };
        let name = str_field(trigger, "name").unwrap_or_default();
        let update = flag(trigger, "update", false);
        let collapse = flag(trigger, "collapse", true);
        if name == ALL_PROPERTIES && update {
            for prop in type_props.keys() {
                requested.insert(prop.clone(), collapse);
            }
        } else if update {
            requested.insert(name.to_owned(), collapse);
        } else {
            requested.remove(name);
        }
    }
    requested.retain(|name, _| type_props.contains_key(name));
    requested
}
