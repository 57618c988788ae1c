use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Primitive property types an extension may declare for its properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingType {
    Any,
    Array,
    Boolean,
    Color,
    Component,
    Dimension,
    AbsoluteDimension,
    RelativeDimension,
    Integer,
    Map,
    Number,
    Object,
    String,
    StyledText,
}

impl BindingType {
    pub const ALL: [BindingType; 14] = [
        BindingType::Any,
        BindingType::Array,
        BindingType::Boolean,
        BindingType::Color,
        BindingType::Component,
        BindingType::Dimension,
        BindingType::AbsoluteDimension,
        BindingType::RelativeDimension,
        BindingType::Integer,
        BindingType::Map,
        BindingType::Number,
        BindingType::Object,
        BindingType::String,
        BindingType::StyledText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingType::Any => "any",
            BindingType::Array => "array",
            BindingType::Boolean => "boolean",
            BindingType::Color => "color",
            BindingType::Component => "component",
            BindingType::Dimension => "dimension",
            BindingType::AbsoluteDimension => "absoluteDimension",
            BindingType::RelativeDimension => "relativeDimension",
            BindingType::Integer => "integer",
            BindingType::Map => "map",
            BindingType::Number => "number",
            BindingType::Object => "object",
            BindingType::String => "string",
            BindingType::StyledText => "styledText",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|binding| binding.as_str() == name)
    }

    /// Coerce a raw value into this binding's domain. Used for declared defaults, so a
    /// missing default becomes the type's zero value.
    pub fn coerce(&self, value: &Value) -> Value {
        match self {
            BindingType::Any | BindingType::Object | BindingType::Component => value.clone(),
            BindingType::Boolean => Value::Bool(truthy(value)),
            BindingType::Number => Value::Number(
                as_f64(value)
                    .and_then(Number::from_f64)
                    .unwrap_or_else(|| Number::from(0)),
            ),
            BindingType::Integer => Value::Number(Number::from(
                as_f64(value).map(|f| f.trunc() as i64).unwrap_or(0),
            )),
            BindingType::String | BindingType::StyledText => match value {
                Value::Null => Value::String(String::new()),
                Value::String(_) => value.clone(),
                other => Value::String(other.to_string()),
            },
            BindingType::Array => match value {
                Value::Array(_) => value.clone(),
                Value::Null => Value::Array(Vec::new()),
                other => Value::Array(vec![other.clone()]),
            },
            BindingType::Map => match value {
                Value::Object(_) => value.clone(),
                _ => Value::Object(Map::new()),
            },
            BindingType::Color => match value {
                Value::String(_) => value.clone(),
                _ => Value::String("#00000000".into()),
            },
            BindingType::Dimension => dimension_or(value, || Value::String("auto".into())),
            BindingType::AbsoluteDimension => dimension_or(value, || Value::Number(0.into())),
            BindingType::RelativeDimension => dimension_or(value, || Value::String("0%".into())),
        }
    }
}

fn dimension_or(value: &Value, fallback: impl FnOnce() -> Value) -> Value {
    match value {
        Value::Number(_) | Value::String(_) => value.clone(),
        _ => fallback(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Truthiness used for boolean flags in schema documents.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
