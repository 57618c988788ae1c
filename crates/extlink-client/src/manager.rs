use std::collections::{BTreeMap, HashMap};

use extlink_schema::{CommandDefinition, EventHandlerDefinition};
use serde_json::{Map, Value};

use crate::ExtensionClient;

/// A document's request to use the extension at `uri` under `namespace`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub namespace: String,
    pub uri: String,
}

impl ExtensionRequest {
    pub fn new(namespace: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            uri: uri.into(),
        }
    }
}

/// Document-facing view of the registered extensions: commands and event handlers under their
/// `namespace:Name` qualified names, and the `environment.extension` map.
#[derive(Debug, Default)]
pub struct ExtensionManager {
    commands: BTreeMap<String, CommandDefinition>,
    event_handlers: BTreeMap<String, EventHandlerDefinition>,
    handlers: HashMap<EventHandlerDefinition, Value>,
    environment: Map<String, Value>,
}

impl ExtensionManager {
    pub fn new<'a>(
        requests: &[ExtensionRequest],
        clients: impl IntoIterator<Item = &'a ExtensionClient>,
    ) -> Self {
        let mut manager = Self::default();
        let mut supported: HashMap<&str, Value> = HashMap::new();

        for client in clients {
            if !client.registered() {
                continue;
            }
            supported.insert(client.uri(), client.environment());
            let schema = client.schema();
            // One extension may be requested under several namespaces.
            for request in requests.iter().filter(|request| request.uri == client.uri()) {
                for command in &schema.commands {
                    let name = qualify(&request.namespace, &command.name);
                    manager.commands.entry(name).or_insert_with(|| command.clone());
                }
                let component_handlers = schema
                    .components
                    .iter()
                    .flat_map(|component| component.event_handlers.values());
                for handler in schema.event_handlers.iter().chain(component_handlers) {
                    let name = qualify(&request.namespace, &handler.name);
                    manager
                        .event_handlers
                        .entry(name)
                        .or_insert_with(|| handler.clone());
                }
            }
        }

        for request in requests {
            let environment = supported
                .get(request.uri.as_str())
                .cloned()
                .unwrap_or(Value::Bool(false));
            manager
                .environment
                .insert(request.namespace.clone(), environment);
        }
        manager
    }

    pub fn find_command_definition(&self, qualified_name: &str) -> Option<&CommandDefinition> {
        self.commands.get(qualified_name)
    }

    pub fn find_event_handler(&self, qualified_name: &str) -> Option<&EventHandlerDefinition> {
        self.event_handlers.get(qualified_name)
    }

    /// Records the document commands to run when `handler` fires.
    pub fn add_event_handler(&mut self, handler: EventHandlerDefinition, commands: Value) {
        self.handlers.insert(handler, commands);
    }

    pub fn find_handler(&self, handler: &EventHandlerDefinition) -> Option<&Value> {
        self.handlers.get(handler)
    }

    /// Namespace → extension environment, or `false` for extensions that are not registered.
    pub fn environment(&self) -> &Map<String, Value> {
        &self.environment
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}
