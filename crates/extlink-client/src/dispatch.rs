use std::rc::{Rc, Weak};

use crate::{ExtensionDocument, ExtensionEvent};

/// Delivers events to the bound document, or holds them until one is bound.
#[derive(Default)]
pub(crate) struct EventDispatcher {
    document: Option<Weak<dyn ExtensionDocument>>,
    pending: Vec<ExtensionEvent>,
}

impl EventDispatcher {
    pub fn bind(&mut self, document: &Rc<dyn ExtensionDocument>) {
        self.document = Some(Rc::downgrade(document));
    }

    pub fn document(&self) -> Option<Rc<dyn ExtensionDocument>> {
        self.document.as_ref()?.upgrade()
    }

    pub fn invoke(&mut self, event: ExtensionEvent) {
        match self.document() {
            Some(document) => document.invoke_extension_event_handler(&event),
            None => {
                log::debug!(
                    "extension {}: no document bound, holding event '{}'",
                    event.uri,
                    event.name
                );
                self.pending.push(event);
            }
        }
    }

    pub fn take_pending(&mut self) -> Vec<ExtensionEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
