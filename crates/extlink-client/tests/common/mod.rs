#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use extlink_client::{
    ClientConfig, ExtensionClient, ExtensionComponent, ExtensionDocument, ExtensionEvent,
    ExtensionServices,
};
use extlink_protocol::ResourceState;
use once_cell::sync::Lazy;
use serde_json::{Value, json};

pub const AUDIO_URI: &str = "aplext:audioplayer:10";

pub static AUDIO_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "Schema",
        "version": "1.0",
        "uri": AUDIO_URI,
        "types": [
            {"name": "playbackState", "properties": {"playerActivity": "string", "offset": "number"}},
            {"name": "seekPayload", "properties": {"offset": {"type": "number", "default": 0}}}
        ],
        "commands": [
            {"name": "Play", "requireResponse": true},
            {"name": "Seek", "payload": {"type": "seekPayload"}}
        ],
        "events": [
            {"name": "OnPlayerActivity"},
            {"name": "OnQueueChanged", "mode": "NORMAL"}
        ],
        "liveData": [
            {
                "name": "MyState",
                "type": "playbackState",
                "events": {"update": {"eventHandler": "OnStateChange"}}
            },
            {
                "name": "Playlist",
                "type": "string[]",
                "data": ["intro"],
                "events": {
                    "add": {"eventHandler": "OnTrackAdded"},
                    "remove": {"eventHandler": "OnTrackRemoved"}
                }
            }
        ],
        "components": [{
            "name": "Visualizer",
            "resourceType": "Surface",
            "context": "Visualizer",
            "events": [{"name": "OnVisualizerReady"}],
            "properties": {"color": {"type": "color", "default": "#ff0000"}}
        }]
    })
});

pub fn audio_client(services: &ExtensionServices) -> ExtensionClient {
    ExtensionClient::new(AUDIO_URI, ClientConfig::default(), services.clone())
}

pub fn register_success(token: &str, schema: &Value) -> Value {
    json!({
        "version": "1.0",
        "method": "RegisterSuccess",
        "token": token,
        "schema": schema,
    })
}

pub fn live_data_update(name: &str, operations: Value) -> Value {
    json!({
        "version": "1.0",
        "method": "LiveDataUpdate",
        "name": name,
        "target": AUDIO_URI,
        "operations": operations,
    })
}

pub fn event(name: &str, payload: Value) -> Value {
    json!({
        "version": "1.0",
        "method": "Event",
        "name": name,
        "target": AUDIO_URI,
        "payload": payload,
    })
}

#[derive(Default)]
pub struct RecordingDocument {
    pub events: RefCell<Vec<ExtensionEvent>>,
    pub components: RefCell<Vec<Rc<FakeComponent>>>,
}

impl RecordingDocument {
    pub fn event_names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|event| event.name.clone()).collect()
    }

    pub fn add_component(&self, component: FakeComponent) -> Rc<FakeComponent> {
        let component = Rc::new(component);
        self.components.borrow_mut().push(component.clone());
        component
    }
}

impl ExtensionDocument for RecordingDocument {
    fn invoke_extension_event_handler(&self, event: &ExtensionEvent) {
        self.events.borrow_mut().push(event.clone());
    }

    fn find_extension_component(&self, resource_id: &str) -> Option<Rc<dyn ExtensionComponent>> {
        self.components
            .borrow()
            .iter()
            .find(|component| component.resource_id == resource_id)
            .map(|component| component.clone() as Rc<dyn ExtensionComponent>)
    }

    fn extension_components(&self) -> Vec<Rc<dyn ExtensionComponent>> {
        self.components
            .borrow()
            .iter()
            .map(|component| component.clone() as Rc<dyn ExtensionComponent>)
            .collect()
    }
}

pub struct FakeComponent {
    pub uri: String,
    pub resource_id: String,
    pub state: RefCell<ResourceState>,
    pub viewport: Option<Value>,
    pub properties: RefCell<BTreeMap<String, Value>>,
    pub dirty: RefCell<BTreeSet<String>>,
    pub failure: RefCell<Option<(i64, String)>>,
}

impl FakeComponent {
    pub fn new(uri: &str, resource_id: &str, state: ResourceState) -> Self {
        Self {
            uri: uri.into(),
            resource_id: resource_id.into(),
            state: RefCell::new(state),
            viewport: None,
            properties: RefCell::new(BTreeMap::new()),
            dirty: RefCell::new(BTreeSet::new()),
            failure: RefCell::new(None),
        }
    }

    pub fn with_property(self, name: &str, value: Value) -> Self {
        self.properties.borrow_mut().insert(name.into(), value);
        self
    }
}

impl ExtensionComponent for FakeComponent {
    fn uri(&self) -> String {
        self.uri.clone()
    }

    fn resource_id(&self) -> String {
        self.resource_id.clone()
    }

    fn resource_state(&self) -> ResourceState {
        *self.state.borrow()
    }

    fn viewport(&self) -> Option<Value> {
        self.viewport.clone()
    }

    fn outgoing_properties(&self) -> Vec<(String, Value)> {
        self.properties
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn is_dirty(&self, property: &str) -> bool {
        self.dirty.borrow().contains(property)
    }

    fn set_calculated(&self, property: &str, value: Value) {
        self.properties.borrow_mut().insert(property.into(), value);
    }

    fn fail(&self, code: i64, message: &str) {
        *self.state.borrow_mut() = ResourceState::Error;
        *self.failure.borrow_mut() = Some((code, message.into()));
    }
}
