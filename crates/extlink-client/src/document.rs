use std::rc::Rc;

use extlink_protocol::ResourceState;
use serde_json::{Map, Value};

/// Handler invocation delivered to a document.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionEvent {
    pub uri: String,
    pub name: String,
    pub payload: Map<String, Value>,
    pub fast_mode: bool,
    pub resource_id: Option<String>,
}

/// The rendering document a client delivers extension events to.
pub trait ExtensionDocument {
    fn invoke_extension_event_handler(&self, event: &ExtensionEvent);

    fn find_extension_component(&self, resource_id: &str) -> Option<Rc<dyn ExtensionComponent>>;

    fn extension_components(&self) -> Vec<Rc<dyn ExtensionComponent>>;

    /// Resolves data-binding expressions in an inbound message.
    fn evaluate(&self, message: &Value) -> Value {
        message.clone()
    }
}

/// A document component whose rendering is provided by an extension.
pub trait ExtensionComponent {
    fn uri(&self) -> String;

    fn resource_id(&self) -> String;

    fn resource_state(&self) -> ResourceState;

    fn viewport(&self) -> Option<Value> {
        None
    }

    /// Current values of the properties sent to the extension, by name.
    fn outgoing_properties(&self) -> Vec<(String, Value)>;

    fn is_dirty(&self, property: &str) -> bool;

    fn set_calculated(&self, property: &str, value: Value);

    fn fail(&self, code: i64, message: &str);
}
