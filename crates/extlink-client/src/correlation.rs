use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ActionRef;

/// Command id → action awaiting its response.
#[derive(Default)]
pub(crate) struct CorrelationTable {
    pending: Rc<RefCell<BTreeMap<u64, ActionRef>>>,
}

impl CorrelationTable {
    /// Tracks a pending action; cancelling it drops the entry.
    pub fn track(&self, id: u64, action: &ActionRef) {
        if !action.is_pending() {
            return;
        }
        let table = Rc::downgrade(&self.pending);
        action.add_terminate_callback(move || {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().remove(&id);
            }
        });
        self.pending.borrow_mut().insert(id, action.clone());
    }

    pub fn take(&self, id: u64) -> Option<ActionRef> {
        self.pending.borrow_mut().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pending.borrow().contains_key(&id)
    }
}
