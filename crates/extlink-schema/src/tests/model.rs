use serde_json::json;

use super::{read, schema_doc};
use crate::{BindingType, Environment, EventExecutionMode, LiveDataKind};

#[test]
fn schema_serializes_with_camel_case_fields() {
    let parsed = read(schema_doc(json!({
        "types": [{"name": "Track", "properties": {"title": "string"}}],
        "events": [{"name": "OnPlay", "mode": "FAST"}],
        "liveData": [{"name": "Levels", "type": "number[]", "data": [1]}]
    })));
    let mut env = serde_json::Map::new();
    env.insert("volume".into(), json!(11));
    let schema = parsed.schema.with_environment(Environment::Map(env));

    let value = serde_json::to_value(&schema).expect("schema serializes");
    assert_eq!(value["uri"], "test:ext:1.0");
    assert_eq!(
        value["types"]["Track"]["title"],
        json!({"binding": "string", "default": "", "required": true})
    );
    assert_eq!(value["eventModes"]["OnPlay"], "FAST");
    assert_eq!(value["liveData"]["Levels"]["kind"], "array");
    assert_eq!(value["liveData"]["Levels"]["typeName"], "number");
    assert_eq!(value["environment"], json!({"volume": 11}));

    let present = serde_json::to_value(Environment::Present).expect("environment serializes");
    assert_eq!(present, json!(true));
}

#[test]
fn enums_read_back_from_their_serialized_names() {
    let binding: BindingType = serde_json::from_value(json!("styledText")).expect("binding");
    assert_eq!(binding, BindingType::StyledText);
    let mode: EventExecutionMode = serde_json::from_value(json!("NORMAL")).expect("mode");
    assert_eq!(mode, EventExecutionMode::Normal);
    let kind: LiveDataKind = serde_json::from_value(json!("object")).expect("kind");
    assert_eq!(kind, LiveDataKind::Object);
    assert_eq!(
        serde_json::to_value(BindingType::AbsoluteDimension).expect("binding"),
        json!("absoluteDimension")
    );
}
