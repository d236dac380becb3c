use async_trait::async_trait;
use indexmap::IndexMap;

use crate::driver::{Environment, PageEvent};
use crate::error::Result;

/// Why a page visit failed, as recorded for later inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub error: String,
    /// Full error tree with source locations.
    pub stack_trace: Option<String>,
}

/// A capability attached to every page visit of a crawl group.
///
/// The crawler calls each hook on every role in turn. `url` is always the
/// environment URL, never the navigation URL. Roles are shared by all
/// concurrent visits of a batch, so state lives behind interior mutability.
#[async_trait]
pub trait PageRole: Send + Sync {
    /// Called before navigation.
    async fn on_page_init(&self, _url: &str, _environment: Environment) -> Result<()> {
        Ok(())
    }

    /// Called for every event the driver reported, in order.
    async fn on_page_event(&self, _url: &str, _environment: Environment, _event: &PageEvent) -> Result<()> {
        Ok(())
    }

    /// Called once when anything in the visit failed.
    async fn on_page_failure(&self, _url: &str, _environment: Environment, _failure: &PageFailure) -> Result<()> {
        Ok(())
    }

    /// Persists whatever the role collected. Called once, after the last
    /// batch of the group.
    async fn finalize(&self) -> Result<()>;
}

/// Roles by name, invoked in insertion order.
pub type Roles = IndexMap<&'static str, Box<dyn PageRole>>;
