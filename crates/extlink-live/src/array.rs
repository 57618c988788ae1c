use serde_json::Value;

use crate::{LiveDataError, LiveResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayCommand {
    Insert,
    Update,
    Remove,
}

/// `count` items starting at `position`, as positions were at the time of the change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveArrayChange {
    pub command: ArrayCommand,
    pub position: usize,
    pub count: usize,
}

impl LiveArrayChange {
    pub fn insert(position: usize, count: usize) -> Self {
        Self {
            command: ArrayCommand::Insert,
            position,
            count,
        }
    }

    pub fn update(position: usize, count: usize) -> Self {
        Self {
            command: ArrayCommand::Update,
            position,
            count,
        }
    }

    pub fn remove(position: usize, count: usize) -> Self {
        Self {
            command: ArrayCommand::Remove,
            position,
            count,
        }
    }
}

/// Ordered replica that records every mutation until the changes are taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveArray {
    items: Vec<Value>,
    changes: Vec<LiveArrayChange>,
}

impl LiveArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded contents are not reported as changes.
    pub fn from_items(items: Vec<Value>) -> Self {
        Self {
            items,
            changes: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts `items` before `index`; `index == len` appends.
    pub fn insert(&mut self, index: i64, items: Vec<Value>) -> LiveResult<()> {
        let position = self.position(index, self.items.len())?;
        if items.is_empty() {
            return Ok(());
        }
        let count = items.len();
        self.items.splice(position..position, items);
        self.changes.push(LiveArrayChange::insert(position, count));
        Ok(())
    }

    pub fn push(&mut self, item: Value) {
        let position = self.items.len();
        self.items.push(item);
        self.changes.push(LiveArrayChange::insert(position, 1));
    }

    /// Replaces `items.len()` entries starting at `index`; all of them must already exist.
    pub fn update(&mut self, index: i64, items: Vec<Value>) -> LiveResult<()> {
        let position = self.position(index, self.items.len())?;
        if position >= self.items.len() || position + items.len() > self.items.len() {
            return Err(self.out_of_range(index));
        }
        if items.is_empty() {
            return Ok(());
        }
        let count = items.len();
        self.items.splice(position..position + count, items);
        self.changes.push(LiveArrayChange::update(position, count));
        Ok(())
    }

    /// Removes up to `count` items starting at `index`; a count past the end stops at the tail.
    pub fn remove(&mut self, index: i64, count: i64) -> LiveResult<()> {
        if count < 1 {
            return Err(LiveDataError::InvalidCount(count));
        }
        let position = self.position(index, self.items.len())?;
        if position >= self.items.len() {
            return Err(self.out_of_range(index));
        }
        let end = position.saturating_add(count as usize).min(self.items.len());
        self.items.drain(position..end);
        self.changes.push(LiveArrayChange::remove(position, end - position));
        Ok(())
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let count = self.items.len();
        self.items.clear();
        self.changes.push(LiveArrayChange::remove(0, count));
    }

    pub fn changes(&self) -> &[LiveArrayChange] {
        &self.changes
    }

    pub fn take_changes(&mut self) -> Vec<LiveArrayChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.items.clone())
    }

    fn position(&self, index: i64, max: usize) -> LiveResult<usize> {
        usize::try_from(index)
            .ok()
            .filter(|position| *position <= max)
            .ok_or_else(|| self.out_of_range(index))
    }

    fn out_of_range(&self, index: i64) -> LiveDataError {
        LiveDataError::IndexOutOfRange {
            index,
            len: self.items.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn array(items: Value) -> LiveArray {
        match items {
            Value::Array(items) => LiveArray::from_items(items),
            other => panic!("expected array, got {other}"),
        }
    }

    #[test]
    fn seeded_items_are_not_changes() {
        let live = array(json!([1, 2, 3]));
        assert_eq!(live.len(), 3);
        assert!(live.changes().is_empty());
    }

    #[test]
    fn insert_accepts_end_position() {
        let mut live = array(json!([1, 2]));
        live.insert(2, vec![json!(3)]).unwrap();
        live.insert(0, vec![json!(-1), json!(0)]).unwrap();
        assert_eq!(live.to_value(), json!([-1, 0, 1, 2, 3]));
        assert_eq!(
            live.take_changes(),
            vec![LiveArrayChange::insert(2, 1), LiveArrayChange::insert(0, 2)]
        );
        assert!(live.changes().is_empty());

        let err = live.insert(6, vec![json!(9)]).unwrap_err();
        assert!(matches!(err, LiveDataError::IndexOutOfRange { index: 6, len: 5 }));
        assert!(live.insert(-1, vec![json!(9)]).is_err());
    }

    #[test]
    fn update_requires_existing_range() {
        let mut live = array(json!(["a", "b", "c"]));
        live.update(1, vec![json!("B"), json!("C")]).unwrap();
        assert_eq!(live.to_value(), json!(["a", "B", "C"]));
        assert!(live.update(2, vec![json!("x"), json!("y")]).is_err());
        assert!(live.update(3, vec![json!("x")]).is_err());
        assert_eq!(live.changes(), &[LiveArrayChange::update(1, 2)]);
    }

    #[test]
    fn remove_clamps_to_tail() {
        let mut live = array(json!([1, 2, 3, 4]));
        live.remove(2, 10).unwrap();
        assert_eq!(live.to_value(), json!([1, 2]));
        assert_eq!(live.changes(), &[LiveArrayChange::remove(2, 2)]);

        assert!(matches!(live.remove(0, 0), Err(LiveDataError::InvalidCount(0))));
        assert!(live.remove(2, 1).is_err());
    }

    #[test]
    fn clear_records_a_single_removal() {
        let mut live = array(json!([1, 2, 3]));
        live.clear();
        live.clear();
        assert!(live.is_empty());
        assert_eq!(live.changes(), &[LiveArrayChange::remove(0, 3)]);
    }
}
