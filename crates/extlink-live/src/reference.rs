use std::collections::BTreeSet;

use extlink_protocol::{LiveDataOperation, LiveDataOperationType};
use extlink_schema::{LiveDataDefinition, LiveDataKind, TriggerConfig};
use serde_json::{Map, Value};

use crate::{
    ArrayCommand, LiveArray, LiveArrayChange, LiveDataError, LiveMap, LiveMapChange, LiveResult,
    MapCommand,
};

/// Backing replica of a live-data binding.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveObject {
    Array(LiveArray),
    Map(LiveMap),
}

impl LiveObject {
    /// Empty replica of `kind`, seeded from `initial` when it has the matching shape.
    pub fn from_initial(kind: LiveDataKind, initial: &Value) -> Self {
        match (kind, initial) {
            (LiveDataKind::Array, Value::Array(items)) => {
                LiveObject::Array(LiveArray::from_items(items.clone()))
            }
            (LiveDataKind::Array, _) => LiveObject::Array(LiveArray::new()),
            (LiveDataKind::Object, Value::Object(map)) => {
                LiveObject::Map(LiveMap::from_map(map.clone()))
            }
            (LiveDataKind::Object, _) => LiveObject::Map(LiveMap::new()),
        }
    }

    pub fn kind(&self) -> LiveDataKind {
        match self {
            LiveObject::Array(_) => LiveDataKind::Array,
            LiveObject::Map(_) => LiveDataKind::Object,
        }
    }

    pub fn snapshot(&self) -> Value {
        match self {
            LiveObject::Array(array) => array.to_value(),
            LiveObject::Map(map) => map.to_value(),
        }
    }

    pub fn as_array(&self) -> Option<&LiveArray> {
        match self {
            LiveObject::Array(array) => Some(array),
            LiveObject::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&LiveMap> {
        match self {
            LiveObject::Map(map) => Some(map),
            LiveObject::Array(_) => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut LiveArray> {
        match self {
            LiveObject::Array(array) => Some(array),
            LiveObject::Map(_) => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut LiveMap> {
        match self {
            LiveObject::Map(map) => Some(map),
            LiveObject::Array(_) => None,
        }
    }

    pub fn discard_changes(&mut self) {
        match self {
            LiveObject::Array(array) => drop(array.take_changes()),
            LiveObject::Map(map) => drop(map.take_changes()),
        }
    }

    pub fn has_changes(&self) -> bool {
        match self {
            LiveObject::Array(array) => !array.changes().is_empty(),
            LiveObject::Map(map) => !map.changes().is_empty(),
        }
    }

    /// Applies one `LiveDataUpdate` operation. Maps take `Set`/`Remove` with a key; arrays take
    /// `Insert`/`Update`/`Remove` with an index and `Clear`. An array item expands in place.
    pub fn apply(&mut self, operation: &LiveDataOperation) -> LiveResult<()> {
        match self {
            LiveObject::Map(map) => apply_to_map(map, operation),
            LiveObject::Array(array) => apply_to_array(array, operation),
        }
    }
}

fn apply_to_map(map: &mut LiveMap, operation: &LiveDataOperation) -> LiveResult<()> {
    let key = operation.key.as_deref().ok_or(LiveDataError::MissingKey)?;
    match operation.kind {
        LiveDataOperationType::Set => {
            map.set(key, operation.item.clone().unwrap_or(Value::Null));
            Ok(())
        }
        LiveDataOperationType::Remove => map.remove(key).map(|_| ()),
        other => Err(LiveDataError::UnsupportedOperation {
            operation: other,
            kind: "map",
        }),
    }
}

fn apply_to_array(array: &mut LiveArray, operation: &LiveDataOperation) -> LiveResult<()> {
    use LiveDataOperationType::*;

    if operation.kind == Clear {
        array.clear();
        return Ok(());
    }
    if operation.kind == Set {
        return Err(LiveDataError::UnsupportedOperation {
            operation: Set,
            kind: "array",
        });
    }
    let items = match (&operation.item, operation.kind) {
        (Some(Value::Array(items)), _) => items.clone(),
        (Some(item), _) => vec![item.clone()],
        (None, Remove) => Vec::new(),
        (None, _) => return Err(LiveDataError::MissingItem),
    };
    let index = operation.index.ok_or(LiveDataError::MissingIndex)?;
    match operation.kind {
        Insert => array.insert(index, items),
        Update => array.update(index, items),
        _ => array.remove(index, operation.count.unwrap_or(1)),
    }
}

/// Live-data handler invocation produced by a change report.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveDataEvent {
    pub handler: String,
    pub current: Value,
    pub changed: Option<Map<String, Value>>,
}

impl LiveDataEvent {
    /// `{current, changed?}` as handed to the document.
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("current".into(), self.current.clone());
        if let Some(changed) = &self.changed {
            payload.insert("changed".into(), Value::Object(changed.clone()));
        }
        payload
    }
}

/// A declared live-data binding: its replica plus the triggers that report changes to it.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveDataRef {
    pub name: String,
    pub type_name: String,
    pub add: TriggerConfig,
    pub update: TriggerConfig,
    pub remove: TriggerConfig,
    object: LiveObject,
    has_pending_update: bool,
    needs_snapshot: bool,
}

impl LiveDataRef {
    pub fn from_definition(definition: &LiveDataDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            type_name: definition.type_name.clone(),
            add: definition.add.clone(),
            update: definition.update.clone(),
            remove: definition.remove.clone(),
            object: LiveObject::from_initial(definition.kind, &definition.initial),
            has_pending_update: false,
            needs_snapshot: false,
        }
    }

    pub fn kind(&self) -> LiveDataKind {
        self.object.kind()
    }

    pub fn object(&self) -> &LiveObject {
        &self.object
    }

    /// Local mutations. Changes made here are reported on the next flush.
    pub fn object_mut(&mut self) -> &mut LiveObject {
        &mut self.object
    }

    pub fn has_pending_update(&self) -> bool {
        self.has_pending_update
    }

    /// Applies an inbound operation and marks the binding as awaiting a report.
    pub fn apply(&mut self, operation: &LiveDataOperation) -> LiveResult<()> {
        self.object.apply(operation)?;
        self.has_pending_update = true;
        Ok(())
    }

    /// Applies an inbound operation while nothing can receive reports yet. No change log is
    /// kept; the next report is a snapshot of the whole replica.
    pub fn apply_detached(&mut self, operation: &LiveDataOperation) -> LiveResult<()> {
        self.apply(operation)?;
        self.object.discard_changes();
        self.needs_snapshot = true;
        Ok(())
    }

    /// Drains recorded changes into handler events and clears the pending flag.
    pub fn report_changes(&mut self) -> Vec<LiveDataEvent> {
        if self.needs_snapshot {
            return self.report_snapshot();
        }
        let events = match &mut self.object {
            LiveObject::Array(array) => {
                let changes = array.take_changes();
                array_events(array, &changes, [&self.add, &self.update, &self.remove])
            }
            LiveObject::Map(map) => {
                let changes = map.take_changes();
                map_events(map, &changes, &self.update, &self.remove)
            }
        };
        self.has_pending_update = false;
        events
    }

    /// Reports the current contents as if all of it had just arrived: one insert covering the
    /// whole array, or a `Set` for every map key. Recorded changes are discarded.
    pub fn report_snapshot(&mut self) -> Vec<LiveDataEvent> {
        let events = match &mut self.object {
            LiveObject::Array(array) => {
                array.take_changes();
                let changes = [LiveArrayChange::insert(0, array.len())];
                array_events(array, &changes, [&self.add, &self.update, &self.remove])
            }
            LiveObject::Map(map) => {
                map.take_changes();
                let changes: Vec<_> = map.map().keys().map(LiveMapChange::set).collect();
                map_events(map, &changes, &self.update, &self.remove)
            }
        };
        self.has_pending_update = false;
        self.needs_snapshot = false;
        events
    }
}

fn map_events(
    map: &LiveMap,
    changes: &[LiveMapChange],
    update: &TriggerConfig,
    remove: &TriggerConfig,
) -> Vec<LiveDataEvent> {
    let current = map.to_value();
    let value_of = |key: &str| map.get(key).cloned().unwrap_or(Value::Null);

    let mut events = Vec::new();
    let mut updated_collapsed = BTreeSet::new();
    let mut removed_collapsed = BTreeSet::new();
    for change in changes {
        let (trigger, collapsed) = match change.command {
            MapCommand::Set => (update, &mut updated_collapsed),
            MapCommand::Remove => (remove, &mut removed_collapsed),
        };
        match trigger.collapse(&change.key) {
            Some(true) => {
                collapsed.insert(change.key.as_str());
            }
            Some(false) => {
                let changed = Map::from_iter([(change.key.clone(), value_of(&change.key))]);
                push_event(&mut events, trigger, &current, Some(changed));
            }
            None => {}
        }
    }

    for (trigger, keys) in [(update, updated_collapsed), (remove, removed_collapsed)] {
        if keys.is_empty() {
            continue;
        }
        let changed = keys
            .into_iter()
            .map(|key| (key.to_owned(), value_of(key)))
            .collect();
        push_event(&mut events, trigger, &current, Some(changed));
    }
    events
}

/// At most one event per group, in add, update, remove order, without per-item detail.
fn array_events(
    array: &LiveArray,
    changes: &[LiveArrayChange],
    [add, update, remove]: [&TriggerConfig; 3],
) -> Vec<LiveDataEvent> {
    let current = array.to_value();
    let present = |command| changes.iter().any(|change| change.command == command);

    let mut events = Vec::new();
    for (command, trigger) in [
        (ArrayCommand::Insert, add),
        (ArrayCommand::Update, update),
        (ArrayCommand::Remove, remove),
    ] {
        if present(command) {
            push_event(&mut events, trigger, &current, None);
        }
    }
    events
}

fn push_event(
    events: &mut Vec<LiveDataEvent>,
    trigger: &TriggerConfig,
    current: &Value,
    changed: Option<Map<String, Value>>,
) {
    let Some(handler) = trigger.handler() else {
        log::debug!("live data change without a bound handler dropped");
        return;
    };
    events.push(LiveDataEvent {
        handler: handler.to_owned(),
        current: current.clone(),
        changed,
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use serde_json::json;

    fn trigger(handler: &str, properties: &[(&str, bool)]) -> TriggerConfig {
        TriggerConfig {
            event_handler: Some(handler.into()),
            properties: properties
                .iter()
                .map(|(name, collapse)| (name.to_string(), *collapse))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn definition(kind: LiveDataKind, initial: Value) -> LiveDataDefinition {
        LiveDataDefinition {
            name: "State".into(),
            kind,
            type_name: "state".into(),
            initial,
            add: TriggerConfig::default(),
            update: TriggerConfig::default(),
            remove: TriggerConfig::default(),
        }
    }

    fn op(value: Value) -> LiveDataOperation {
        LiveDataOperation::decode(&value).expect("operation decodes")
    }

    #[test]
    fn collapsed_keys_batch_after_individual_events() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Object, json!({})));
        live.update = trigger("onUpdate", &[("x", true), ("y", false)]);

        live.apply(&op(json!({"type": "Set", "key": "x", "item": 1}))).unwrap();
        live.apply(&op(json!({"type": "Set", "key": "y", "item": 2}))).unwrap();
        live.apply(&op(json!({"type": "Set", "key": "z", "item": 3}))).unwrap();
        assert!(live.has_pending_update());

        let events = live.report_changes();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].changed, Some(Map::from_iter([("y".into(), json!(2))])));
        assert_eq!(events[1].changed, Some(Map::from_iter([("x".into(), json!(1))])));
        for event in &events {
            assert_eq!(event.handler, "onUpdate");
            assert_eq!(event.current, json!({"x": 1, "y": 2, "z": 3}));
        }
        assert!(!live.has_pending_update());
        assert!(live.report_changes().is_empty());
    }

    #[test]
    fn removed_keys_report_null() {
        let mut live =
            LiveDataRef::from_definition(&definition(LiveDataKind::Object, json!({"a": 1, "b": 2})));
        live.remove = trigger("onRemove", &[("a", false), ("b", true)]);

        live.apply(&op(json!({"type": "Remove", "key": "a"}))).unwrap();
        live.apply(&op(json!({"type": "Remove", "key": "b"}))).unwrap();
        let events = live.report_changes();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload()["changed"], json!({"a": null}));
        assert_eq!(events[1].payload()["changed"], json!({"b": null}));
        assert_eq!(events[1].payload()["current"], json!({}));
    }

    #[test]
    fn map_operations_are_validated() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Object, Value::Null));
        assert!(matches!(
            live.apply(&op(json!({"type": "Set", "item": 1}))),
            Err(LiveDataError::MissingKey)
        ));
        assert!(matches!(
            live.apply(&op(json!({"type": "Remove", "key": "ghost"}))),
            Err(LiveDataError::KeyNotFound(_))
        ));
        assert!(matches!(
            live.apply(&op(json!({"type": "Insert", "key": "k", "index": 0, "item": 1}))),
            Err(LiveDataError::UnsupportedOperation { kind: "map", .. })
        ));
        assert!(!live.has_pending_update());
    }

    #[test]
    fn array_reports_one_event_per_group() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Array, json!([1])));
        live.add = trigger("onAdd", &[]);
        live.update = trigger("onUpdate", &[]);
        live.remove = trigger("onRemove", &[]);

        live.apply(&op(json!({"type": "Remove", "index": 0}))).unwrap();
        live.apply(&op(json!({"type": "Insert", "index": 0, "item": [1, 2, 3]}))).unwrap();
        live.apply(&op(json!({"type": "Insert", "index": 3, "item": 4}))).unwrap();
        live.apply(&op(json!({"type": "Update", "index": 0, "item": 10}))).unwrap();

        let events = live.report_changes();
        let handlers: Vec<_> = events.iter().map(|event| event.handler.as_str()).collect();
        assert_eq!(handlers, ["onAdd", "onUpdate", "onRemove"]);
        for event in &events {
            assert_eq!(event.current, json!([10, 2, 3, 4]));
            assert_eq!(event.changed, None);
            assert!(!event.payload().contains_key("changed"));
        }
    }

    #[test]
    fn array_operations_are_validated() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Array, json!([])));
        assert!(matches!(
            live.apply(&op(json!({"type": "Insert", "index": 0}))),
            Err(LiveDataError::MissingItem)
        ));
        assert!(matches!(
            live.apply(&op(json!({"type": "Insert", "item": 1}))),
            Err(LiveDataError::MissingIndex)
        ));
        assert!(matches!(
            live.apply(&op(json!({"type": "Set", "index": 0, "item": 1}))),
            Err(LiveDataError::UnsupportedOperation { kind: "array", .. })
        ));
        live.apply(&op(json!({"type": "Clear"}))).unwrap();
        assert!(live.has_pending_update());
    }

    #[test]
    fn missing_handler_produces_no_event() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Array, json!([])));
        live.apply(&op(json!({"type": "Insert", "index": 0, "item": "a"}))).unwrap();
        assert!(live.report_changes().is_empty());
        assert!(!live.has_pending_update());
    }

    #[test]
    fn detached_operations_keep_no_change_log() {
        let mut live = LiveDataRef::from_definition(&definition(LiveDataKind::Array, json!([])));
        live.add = trigger("onAdd", &[]);
        for index in 0..100 {
            live.apply_detached(&op(json!({"type": "Insert", "index": index, "item": index})))
                .unwrap();
        }
        assert!(live.has_pending_update());
        assert!(!live.object().has_changes());
        assert!(live.apply_detached(&op(json!({"type": "Remove", "index": 500}))).is_err());

        let events = live.report_changes();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].handler, "onAdd");
        assert_eq!(events[0].current.as_array().map(Vec::len), Some(100));
        assert!(!live.has_pending_update());

        live.apply(&op(json!({"type": "Insert", "index": 0, "item": -1}))).unwrap();
        assert_eq!(live.report_changes().len(), 1);
        assert!(live.report_changes().is_empty());
    }

    #[test]
    fn snapshot_reports_everything_as_fresh() {
        let mut map =
            LiveDataRef::from_definition(&definition(LiveDataKind::Object, json!({"a": 1, "b": 2})));
        map.update = trigger("onUpdate", &[("a", true), ("b", true)]);
        map.object_mut()
            .as_map_mut()
            .expect("map replica")
            .set("c", json!(3));
        let events = map.report_snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changed, Some(Map::from_iter([
            ("a".into(), json!(1)),
            ("b".into(), json!(2)),
        ])));
        assert!(!map.object().has_changes());

        let mut array = LiveDataRef::from_definition(&definition(LiveDataKind::Array, json!([1, 2])));
        array.add = trigger("onAdd", &[]);
        let events = array.report_snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].current, json!([1, 2]));
    }
}
