use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActionState {
    #[default]
    Pending,
    /// Completed by a command response, with the response `result` if it carried one.
    Resolved(Option<Value>),
    /// Cancelled by its owner before a response arrived.
    Terminated,
}

type TerminateCallback = Box<dyn FnOnce()>;

#[derive(Default)]
struct ActionInner {
    state: ActionState,
    on_terminate: Vec<TerminateCallback>,
}

/// Handle for a command awaiting its response. Clones share state; the first of
/// resolve/terminate wins and the other becomes a no-op.
#[derive(Clone, Default)]
pub struct ActionRef {
    inner: Rc<RefCell<ActionInner>>,
}

impl ActionRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActionState {
        self.inner.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, ActionState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().state, ActionState::Resolved(_))
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.inner.borrow().state, ActionState::Terminated)
    }

    /// Result carried by the resolving response.
    pub fn result(&self) -> Option<Value> {
        match &self.inner.borrow().state {
            ActionState::Resolved(result) => result.clone(),
            _ => None,
        }
    }

    pub fn resolve(&self) -> bool {
        self.resolve_with(None)
    }

    pub fn resolve_with(&self, result: Option<Value>) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.state, ActionState::Pending) {
            return false;
        }
        inner.state = ActionState::Resolved(result);
        inner.on_terminate.clear();
        true
    }

    /// Cancels a pending action and runs its terminate callbacks.
    pub fn terminate(&self) -> bool {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, ActionState::Pending) {
                return false;
            }
            inner.state = ActionState::Terminated;
            std::mem::take(&mut inner.on_terminate)
        };
        for callback in callbacks {
            callback();
        }
        true
    }

    pub fn add_terminate_callback(&self, callback: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.state, ActionState::Pending) {
            inner.on_terminate.push(Box::new(callback));
        }
    }
}

impl fmt::Debug for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRef")
            .field("state", &self.inner.borrow().state)
            .finish()
    }
}
