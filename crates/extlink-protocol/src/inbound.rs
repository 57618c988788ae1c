use serde_json::{Map, Value};

use crate::{
    LiveDataOperationType, Method, ProtocolError, ResourceState, body, optional_string,
    required_string,
};

/// `RegisterSuccess` body. The schema stays dynamic here; the schema parser owns its validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterSuccess {
    pub token: String,
    pub schema: Value,
    pub environment: Option<Map<String, Value>>,
}

impl RegisterSuccess {
    pub fn decode(message: &Value) -> Result<Self, ProtocolError> {
        let body = body(message)?;
        let token = required_string(body, "token")?;
        let schema = match body.get("schema") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingField("schema")),
            Some(schema) => schema.clone(),
        };
        let environment = body.get("environment").and_then(Value::as_object).cloned();
        Ok(Self {
            token,
            schema,
            environment,
        })
    }
}

/// `CommandSuccess` / `CommandFailure` body.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandResponse {
    pub id: u64,
    pub success: bool,
    pub result: Option<Value>,
}

impl CommandResponse {
    pub fn decode(method: Method, message: &Value) -> Result<Self, ProtocolError> {
        let body = body(message)?;
        let id = command_id(body.get("id"))?;
        let result = body.get("result").filter(|value| !value.is_null()).cloned();
        Ok(Self {
            id,
            success: method == Method::CommandSuccess,
            result,
        })
    }
}

fn command_id(value: Option<&Value>) -> Result<u64, ProtocolError> {
    let invalid = |reason: &str| ProtocolError::InvalidField {
        field: "id",
        reason: reason.to_owned(),
    };
    match value {
        None | Some(Value::Null) => Err(ProtocolError::MissingField("id")),
        Some(Value::Number(number)) => {
            if let Some(id) = number.as_u64() {
                return Ok(id);
            }
            match number.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
                _ => Err(invalid("not a non-negative integer")),
            }
        }
        Some(_) => Err(invalid("not a number")),
    }
}

/// Extension-originated `Event` body.
#[derive(Clone, Debug, PartialEq)]
pub struct EventMessage {
    pub name: String,
    pub target: String,
    pub payload: Map<String, Value>,
    pub resource_id: Option<String>,
}

impl EventMessage {
    pub fn decode(message: &Value) -> Result<Self, ProtocolError> {
        let body = body(message)?;
        let name = required_string(body, "name")?;
        let target = required_string(body, "target")?;
        let payload = match body.get("payload") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    field: "payload",
                    reason: "expected a map".into(),
                });
            }
        };
        Ok(Self {
            name,
            target,
            payload,
            resource_id: optional_string(body, "resourceId"),
        })
    }
}

/// `LiveDataUpdate` body. Operations are kept raw so one bad entry cannot sink the batch.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveDataUpdate {
    pub name: String,
    pub target: String,
    pub operations: Vec<Value>,
}

impl LiveDataUpdate {
    pub fn decode(message: &Value) -> Result<Self, ProtocolError> {
        let body = body(message)?;
        let name = required_string(body, "name")?;
        let target = required_string(body, "target")?;
        let operations = match body.get("operations") {
            Some(Value::Array(ops)) => ops.clone(),
            None | Some(Value::Null) => return Err(ProtocolError::MissingField("operations")),
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    field: "operations",
                    reason: "expected an array".into(),
                });
            }
        };
        Ok(Self {
            name,
            target,
            operations,
        })
    }
}

/// One entry of a `LiveDataUpdate` operation list. Which fields are required depends on
/// whether the target is an array or a map, so that check happens at apply time.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveDataOperation {
    pub kind: LiveDataOperationType,
    pub key: Option<String>,
    pub index: Option<i64>,
    pub item: Option<Value>,
    pub count: Option<i64>,
}

impl LiveDataOperation {
    pub fn decode(operation: &Value) -> Result<Self, ProtocolError> {
        let body = body(operation)?;
        let kind = match body.get("type") {
            Some(Value::String(kind)) => kind.parse()?,
            None | Some(Value::Null) => return Err(ProtocolError::MissingField("type")),
            Some(other) => return Err(ProtocolError::UnknownOperation(other.to_string())),
        };
        Ok(Self {
            kind,
            key: optional_string(body, "key").filter(|key| !key.is_empty()),
            index: body.get("index").and_then(integer),
            item: body.get("item").filter(|item| !item.is_null()).cloned(),
            count: body.get("count").and_then(integer),
        })
    }
}

fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
}

/// `ComponentSuccess` / `ComponentFailure` / `ComponentUpdate` body.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentResponse {
    pub method: Method,
    pub resource_id: String,
    pub state: Option<ResourceState>,
    pub payload: Option<Map<String, Value>>,
    pub code: i64,
    pub message: String,
}

impl ComponentResponse {
    pub fn decode(method: Method, message: &Value) -> Result<Self, ProtocolError> {
        let body = body(message)?;
        let state = match body.get("state").and_then(Value::as_str) {
            Some(state) => Some(state.parse()?),
            None => None,
        };
        Ok(Self {
            method,
            resource_id: optional_string(body, "resourceId").unwrap_or_default(),
            state,
            payload: body.get("payload").and_then(Value::as_object).cloned(),
            code: body.get("code").and_then(Value::as_i64).unwrap_or(-1),
            message: optional_string(body, "message").unwrap_or_default(),
        })
    }
}
