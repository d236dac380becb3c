use indexmap::{IndexMap, IndexSet};
use tracing::instrument;

use crate::error::Result;
use crate::store::BlockMapStore;

/// Page URL to the block script URLs it requested. Informational only.
pub type SourceFiles = IndexMap<String, IndexSet<String>>;

impl BlockMapStore {
    pub async fn load_source_files(&self) -> Result<SourceFiles> {
        Ok(self.read_json(&self.layout().source_files).await?.unwrap_or_default())
    }

    /// Unions one run's script URLs into the sidecar, page by page.
    #[instrument(skip(self, run), fields(pages = run.len()))]
    pub async fn merge_source_files(&self, run: SourceFiles) -> Result<SourceFiles> {
        let mut persisted = self.load_source_files().await?;
        for (page, scripts) in run {
            persisted.entry(page).or_default().extend(scripts);
        }
        self.write_json(&self.layout().source_files, &persisted).await?;
        Ok(persisted)
    }
}
