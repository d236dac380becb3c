use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

use crate::error::Result;
use crate::store::BlockMapStore;

/// One page visit that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    /// `control` or `experimental`.
    pub environment: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}
impl FailureRecord {
    pub fn new(url: impl Into<String>, environment: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            environment: environment.into(),
            error: error.into(),
            stack_trace: None,
        }
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    fn key(&self) -> (String, String) {
        (self.url.clone(), self.environment.clone())
    }
}

impl BlockMapStore {
    /// Loads the failure log; a missing file is an empty log.
    pub async fn load_failures(&self) -> Result<Vec<FailureRecord>> {
        Ok(self.read_json(&self.layout().failure_log).await?.unwrap_or_default())
    }

    /// Appends failures not already logged for the same `(url, environment)`.
    ///
    /// Existing records win; duplicates within `records` keep the first.
    /// Returns how many records were added. The log is not rewritten when
    /// nothing is new.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn append_failures(&self, records: Vec<FailureRecord>) -> Result<usize> {
        let mut log = self.load_failures().await?;
        let mut seen: HashSet<(String, String)> = log.iter().map(FailureRecord::key).collect();
        let before = log.len();
        log.extend(records.into_iter().filter(|record| seen.insert(record.key())));
        let added = log.len() - before;
        if added > 0 {
            self.write_json(&self.layout().failure_log, &log).await?;
            tracing::info!(path = %self.layout().failure_log.display(), added, total = log.len(), "updated failure log");
        }
        Ok(added)
    }
}
