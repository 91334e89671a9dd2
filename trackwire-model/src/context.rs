use crate::Record;
use trackwire_types::{RecordState, Result};

/// What a record needs from the session that owns it.
///
/// Records hold a weak reference to their context, so a record outliving its
/// session simply behaves as detached: no lifecycle tracking and no
/// auto-populate.
pub trait RecordContext {
    /// Whether unset attributes should be fetched transparently on read.
    fn auto_populate(&self) -> bool;

    /// Fetches `projections` for `record` from the server and merges the
    /// result into the session.
    fn populate(&self, record: &Record, projections: &[&str]) -> Result<()>;

    /// Requests a lifecycle transition for `record`.
    fn transition(&self, record: &Record, target: RecordState) -> Result<()>;

    /// Current lifecycle state of `record`, `None` when clean.
    fn state(&self, record: &Record) -> Option<RecordState>;
}
