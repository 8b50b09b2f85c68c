use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per source id. Refreshes and article mutations of a source
/// run under its guard so reconciliation reads a consistent article set.
#[derive(Debug, Default)]
pub(crate) struct SourceLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SourceLocks {
    pub(crate) async fn acquire(&self, source_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().await;
            Arc::clone(table.entry(source_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
