use async_trait::async_trait;
use blockmap_store::{BlockMapStore, FailureRecord};
use exn::ResultExt;
use std::sync::Mutex;

use crate::driver::Environment;
use crate::error::{ErrorKind, Result};
use crate::role::{PageFailure, PageRole};

/// Collects failed visits and appends them to the failure log on finalize.
pub struct FailureRole {
    store: BlockMapStore,
    records: Mutex<Vec<FailureRecord>>,
}
impl FailureRole {
    pub fn new(store: BlockMapStore) -> Self {
        Self { store, records: Mutex::new(Vec::new()) }
    }

    pub fn failure_count(&self) -> usize {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl PageRole for FailureRole {
    async fn on_page_failure(&self, url: &str, environment: Environment, failure: &PageFailure) -> Result<()> {
        tracing::warn!(url, %environment, error = %failure.error, "failed to process page");
        let mut record = FailureRecord::new(url, environment.to_string(), &failure.error);
        if let Some(trace) = &failure.stack_trace {
            record = record.with_stack_trace(trace);
        }
        self.records.lock().unwrap_or_else(|p| p.into_inner()).push(record);
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        let records = std::mem::take(&mut *self.records.lock().unwrap_or_else(|p| p.into_inner()));
        let collected = records.len();
        let appended = self.store.append_failures(records).await.or_raise(|| ErrorKind::Store("failure log".into()))?;
        tracing::info!(collected, appended, "merged failure log");
        Ok(())
    }
}
