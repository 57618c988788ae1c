use serde_json::{Map, Value};

use crate::{LiveDataError, LiveResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapCommand {
    Set,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveMapChange {
    pub command: MapCommand,
    pub key: String,
}

impl LiveMapChange {
    pub fn set(key: impl Into<String>) -> Self {
        Self {
            command: MapCommand::Set,
            key: key.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            command: MapCommand::Remove,
            key: key.into(),
        }
    }
}

/// Keyed replica that records every mutation until the changes are taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveMap {
    map: Map<String, Value>,
    changes: Vec<LiveMapChange>,
}

impl LiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            map,
            changes: Vec::new(),
        }
    }

    pub fn map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.changes.push(LiveMapChange::set(key.clone()));
        self.map.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> LiveResult<Value> {
        let removed = self
            .map
            .remove(key)
            .ok_or_else(|| LiveDataError::KeyNotFound(key.to_owned()))?;
        self.changes.push(LiveMapChange::remove(key));
        Ok(removed)
    }

    pub fn changes(&self) -> &[LiveMapChange] {
        &self.changes
    }

    pub fn take_changes(&mut self) -> Vec<LiveMapChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.map.clone())
    }
}
