use serde_json::Value;

use crate::{ParsedSchema, PropertyKeyRegistry, SchemaReader};

pub mod model;

pub(crate) fn read(doc: Value) -> ParsedSchema {
    read_with(&PropertyKeyRegistry::new(), doc)
}

pub(crate) fn read_with(registry: &PropertyKeyRegistry, doc: Value) -> ParsedSchema {
    SchemaReader::new(registry)
        .read(&doc)
        .expect("schema header should be accepted")
}

pub(crate) fn schema_doc(sections: Value) -> Value {
    let mut doc = serde_json::json!({
        "type": "Schema",
        "version": "1.0",
        "uri": "test:ext:1.0",
    });
    if let (Some(doc), Some(sections)) = (doc.as_object_mut(), sections.as_object()) {
        doc.extend(sections.clone());
    }
    doc
}
