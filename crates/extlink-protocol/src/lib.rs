//! Wire envelopes for the extension messaging protocol shared by the client and its tests.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod inbound;
mod outbound;

pub use inbound::{
    CommandResponse, ComponentResponse, EventMessage, LiveDataOperation, LiveDataUpdate,
    RegisterSuccess,
};
pub use outbound::{CommandRequest, ComponentChange, RegisterRequest};

/// Protocol version carried by every message in both directions.
pub const INTERFACE_VERSION: &str = "1.0";

/// Newest schema document version this implementation understands.
pub const MAX_SCHEMA_VERSION: &str = "1.1";

/// Token value an extension sends when it wants the host to pick the connection token.
pub const AUTO_TOKEN: &str = "<AUTO_TOKEN>";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Register,
    RegisterSuccess,
    RegisterFailure,
    Command,
    CommandSuccess,
    CommandFailure,
    Event,
    LiveDataUpdate,
    Component,
    ComponentSuccess,
    ComponentFailure,
    ComponentUpdate,
}

impl Method {
    pub const ALL: [Method; 12] = [
        Method::Register,
        Method::RegisterSuccess,
        Method::RegisterFailure,
        Method::Command,
        Method::CommandSuccess,
        Method::CommandFailure,
        Method::Event,
        Method::LiveDataUpdate,
        Method::Component,
        Method::ComponentSuccess,
        Method::ComponentFailure,
        Method::ComponentUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Register => "Register",
            Method::RegisterSuccess => "RegisterSuccess",
            Method::RegisterFailure => "RegisterFailure",
            Method::Command => "Command",
            Method::CommandSuccess => "CommandSuccess",
            Method::CommandFailure => "CommandFailure",
            Method::Event => "Event",
            Method::LiveDataUpdate => "LiveDataUpdate",
            Method::Component => "Component",
            Method::ComponentSuccess => "ComponentSuccess",
            Method::ComponentFailure => "ComponentFailure",
            Method::ComponentUpdate => "ComponentUpdate",
        }
    }

    pub fn is_registration_response(&self) -> bool {
        matches!(self, Method::RegisterSuccess | Method::RegisterFailure)
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownMethod(s.to_owned()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an extension-provided component resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    Pending,
    Ready,
    Error,
    Released,
}

impl ResourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceState::Pending => "Pending",
            ResourceState::Ready => "Ready",
            ResourceState::Error => "Error",
            ResourceState::Released => "Released",
        }
    }
}

impl FromStr for ResourceState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ResourceState::Pending),
            "Ready" => Ok(ResourceState::Ready),
            "Error" => Ok(ResourceState::Error),
            "Released" => Ok(ResourceState::Released),
            other => Err(ProtocolError::InvalidField {
                field: "state",
                reason: format!("unknown resource state '{other}'"),
            }),
        }
    }
}

/// Mutation kinds carried in a `LiveDataUpdate` operation list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiveDataOperationType {
    Insert,
    Update,
    Set,
    Remove,
    Clear,
}

impl LiveDataOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveDataOperationType::Insert => "Insert",
            LiveDataOperationType::Update => "Update",
            LiveDataOperationType::Set => "Set",
            LiveDataOperationType::Remove => "Remove",
            LiveDataOperationType::Clear => "Clear",
        }
    }
}

impl FromStr for LiveDataOperationType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Insert" => Ok(LiveDataOperationType::Insert),
            "Update" => Ok(LiveDataOperationType::Update),
            "Set" => Ok(LiveDataOperationType::Set),
            "Remove" => Ok(LiveDataOperationType::Remove),
            "Clear" => Ok(LiveDataOperationType::Clear),
            other => Err(ProtocolError::UnknownOperation(other.to_owned())),
        }
    }
}

impl fmt::Display for LiveDataOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two fields every message carries, read before anything else is trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub version: Option<String>,
    pub method: Option<Method>,
    pub method_name: Option<String>,
}

impl Envelope {
    pub fn read(message: &Value) -> Result<Self, ProtocolError> {
        let body = message.as_object().ok_or(ProtocolError::NotAnObject)?;
        let version = body.get("version").and_then(Value::as_str).map(str::to_owned);
        let method_name = body.get("method").and_then(Value::as_str).map(str::to_owned);
        let method = method_name.as_deref().and_then(|name| name.parse().ok());
        Ok(Self {
            version,
            method,
            method_name,
        })
    }

    pub fn check_version(&self, expected: &str) -> Result<(), ProtocolError> {
        match self.version.as_deref() {
            Some(actual) if actual == expected => Ok(()),
            actual => Err(ProtocolError::VersionMismatch {
                expected: expected.to_owned(),
                actual: actual.unwrap_or("<missing>").to_owned(),
            }),
        }
    }

    /// Resolved method, or the error describing why it could not be resolved.
    pub fn require_method(&self) -> Result<Method, ProtocolError> {
        match (self.method, self.method_name.as_deref()) {
            (Some(method), _) => Ok(method),
            (None, Some(name)) => Err(ProtocolError::UnknownMethod(name.to_owned())),
            (None, None) => Err(ProtocolError::MissingField("method")),
        }
    }
}

/// Parse raw wire text into the dynamic value model.
pub fn parse_message(raw: &str) -> Result<Value, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("interface version is wrong: expected {expected}, actual {actual}")]
    VersionMismatch { expected: String, actual: String },
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unknown live data operation '{0}'")]
    UnknownOperation(String),
}

pub(crate) fn body(message: &Value) -> Result<&Map<String, Value>, ProtocolError> {
    message.as_object().ok_or(ProtocolError::NotAnObject)
}

/// Non-empty string field; anything else is reported against `field`.
pub(crate) fn required_string(
    body: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ProtocolError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ProtocolError::MissingField(field)),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ProtocolError::InvalidField {
            field,
            reason: "must not be empty".into(),
        }),
        Some(other) => Err(ProtocolError::InvalidField {
            field,
            reason: format!("expected a string, found {other}"),
        }),
    }
}

pub(crate) fn optional_string(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_owned)
}
