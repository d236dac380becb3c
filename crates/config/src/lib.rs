pub mod error;
mod settings;
mod site;

pub use crate::settings::{Config, CrawlConfig, ENV_PREFIX, PathsConfig, RemoteConfig};
pub use crate::site::SiteConfig;
