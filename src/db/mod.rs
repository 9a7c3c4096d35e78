mod connection;
mod queries;

pub use connection::Database;
pub use queries::{VerseWrite, MAX_CONDITIONS_PER_QUERY};

use crate::errors::Result;
use crate::types::{VerseCondition, VerseRecord};

/// Read access to stored verses, as needed by the batch fetcher.
///
/// Implementations never write; callers may share one store across threads
/// if the implementation allows it.
pub trait VerseStore {
    /// Returns every record matching any of `conditions` (logical OR).
    fn find_matching(&self, conditions: &[VerseCondition]) -> Result<Vec<VerseRecord>>;

    /// Returns the first record matching `condition`, if any.
    fn find_first(&self, condition: &VerseCondition) -> Result<Option<VerseRecord>>;

    /// A callback that aborts whatever call is currently running on this
    /// store, from any thread. `None` if calls cannot be interrupted.
    fn interrupt_hook(&self) -> Option<InterruptHook> {
        None
    }
}

/// See [`VerseStore::interrupt_hook`].
pub type InterruptHook = Box<dyn Fn() + Send + Sync>;
