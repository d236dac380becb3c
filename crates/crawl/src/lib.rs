//! Paired control/experimental crawls feeding the block maps.
//!
//! A [`CrawlPlan`] groups canonical URLs by the source that listed them. The
//! [`Crawler`] visits each group's pages on both hosts through a
//! [`PageDriver`], hands every page to the group's [`PageRole`]s, and lets the
//! roles persist their results once the group is done.

mod driver;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod plan;
mod role;
pub mod roles;
mod runner;
mod sitemap;

pub use crate::driver::{Environment, HttpPageDriver, PageDriver, PageEvent, SitemapFetcher};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockDriver;
pub use crate::plan::{CrawlPlan, EnvironmentUrls, MANUAL_FALLBACK_LABEL, UrlGroup, environment_url, manual_label};
pub use crate::role::{PageFailure, PageRole, Roles};
pub use crate::runner::{CrawlEvent, CrawlSettings, Crawler};
pub use crate::sitemap::{discover, is_supported, parse_sitemap};
