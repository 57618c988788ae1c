use serde::Serialize;
use serde_json::{Map, Value};

use crate::{INTERFACE_VERSION, Method, ProtocolError, ResourceState};

/// Registration request (host → extension).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub version: String,
    pub method: Method,
    pub uri: String,
    pub settings: Value,
    pub flags: Value,
}

impl RegisterRequest {
    pub fn new(uri: impl Into<String>, settings: Value, flags: Value) -> Self {
        Self {
            version: INTERFACE_VERSION.into(),
            method: Method::Register,
            uri: uri.into(),
            settings,
            flags,
        }
    }

    pub fn encode(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Command invocation (host → extension). `id` correlates the eventual response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub version: String,
    pub method: Method,
    pub token: String,
    pub id: u64,
    pub name: String,
    pub target: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl CommandRequest {
    pub fn new(
        token: impl Into<String>,
        id: u64,
        name: impl Into<String>,
        target: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            version: INTERFACE_VERSION.into(),
            method: Method::Command,
            token: token.into(),
            id,
            name: name.into(),
            target: target.into(),
            payload,
            resource_id: None,
        }
    }

    pub fn with_resource_id(mut self, resource_id: Option<String>) -> Self {
        self.resource_id = resource_id;
        self
    }

    pub fn encode(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Component state change (host → extension).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentChange {
    pub version: String,
    pub method: Method,
    pub target: String,
    pub token: String,
    pub resource_id: String,
    pub state: ResourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

impl ComponentChange {
    pub fn new(
        target: impl Into<String>,
        token: impl Into<String>,
        resource_id: impl Into<String>,
        state: ResourceState,
    ) -> Self {
        Self {
            version: INTERFACE_VERSION.into(),
            method: Method::Component,
            target: target.into(),
            token: token.into(),
            resource_id: resource_id.into(),
            state,
            viewport: None,
            payload: None,
        }
    }

    pub fn encode(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_shape() {
        let request = RegisterRequest::new(
            "aplext:audioplayer:10",
            json!({"playbackStateName": "MyState"}),
            Value::Null,
        );
        assert_eq!(
            request.encode().unwrap(),
            json!({
                "version": "1.0",
                "method": "Register",
                "uri": "aplext:audioplayer:10",
                "settings": {"playbackStateName": "MyState"},
                "flags": null
            })
        );
    }

    #[test]
    fn command_request_omits_missing_resource_id() {
        let plain = CommandRequest::new("tok", 1000, "Play", "aplext:audioplayer:10", json!({}))
            .encode()
            .unwrap();
        assert!(plain.get("resourceId").is_none());
        assert_eq!(plain["method"], "Command");
        assert_eq!(plain["id"], 1000);

        let scoped = CommandRequest::new("tok", 1001, "Seek", "aplext:audioplayer:10", json!({}))
            .with_resource_id(Some("video-1".into()))
            .encode()
            .unwrap();
        assert_eq!(scoped["resourceId"], "video-1");
    }

    #[test]
    fn component_change_uses_camel_case() {
        let mut change = ComponentChange::new("aplext:video:10", "tok", "video-1", ResourceState::Ready);
        change.payload = Some(Map::new());
        let value = change.encode().unwrap();
        assert_eq!(value["resourceId"], "video-1");
        assert_eq!(value["state"], "Ready");
        assert!(value.get("viewport").is_none());
        assert_eq!(value["payload"], json!({}));
    }
}
