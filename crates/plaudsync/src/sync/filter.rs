use crate::history::SyncHistory;
use crate::recording::Recording;

/// Records whose id is neither synced nor dead, in source order.
pub fn select_fresh(all: Vec<Recording>, history: &SyncHistory) -> Vec<Recording> {
    all.into_iter()
        .filter(|record| !history.is_synced(&record.id) && !history.is_dead(&record.id))
        .collect()
}
