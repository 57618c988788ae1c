use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use extlink_schema::PropertyKeyRegistry;

/// First id handed out by a fresh [`CommandIdGenerator`].
pub const FIRST_COMMAND_ID: u64 = 1000;

/// Strictly increasing command ids shared by every client that holds a clone.
#[derive(Clone, Debug)]
pub struct CommandIdGenerator {
    next: Arc<AtomicU64>,
}

impl CommandIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(FIRST_COMMAND_ID)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Most recently issued id; one below the first id while nothing has been issued.
    pub fn last_issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst).saturating_sub(1)
    }
}

impl Default for CommandIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide services injected into every client.
#[derive(Clone, Debug, Default)]
pub struct ExtensionServices {
    pub command_ids: CommandIdGenerator,
    pub property_keys: PropertyKeyRegistry,
}
