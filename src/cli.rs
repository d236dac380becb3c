use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blockmap")]
#[command(about = "Look up, search and build block class-signature maps", version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "BLOCKMAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find block map entries by class-name combination.
    Lookup(LookupArgs),
    /// Search every shard in the manifest by keyword.
    Search(SearchArgs),
    /// Crawl a site configuration and merge the results into the block maps.
    Crawl(CrawlArgs),
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Class names, space- or comma-separated.
    #[arg(required = true)]
    pub classes: Vec<String>,

    /// Block map file; defaults to the configured global map.
    #[arg(long)]
    pub map_file: Option<PathBuf>,

    /// Close matches to show when there is no exact match.
    #[arg(short = 'k', long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long)]
    pub output_json: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true)]
    pub keywords: Vec<String>,

    /// Rewrite exact-match URLs onto this branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Restrict to these locales; `default` is the primary site.
    #[arg(long = "locale")]
    pub locales: Vec<String>,

    /// Maximum exact URLs per shard.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = blockmap_search::DEFAULT_COMBO_LIMIT)]
    pub combo_limit: usize,

    #[arg(long, default_value_t = blockmap_search::DEFAULT_SIMILARITY_THRESHOLD)]
    pub similarity_threshold: u8,

    /// Whether rewritten URLs get `martech=off`; on by default with `--branch`.
    #[arg(long)]
    pub append_martech_off: Option<bool>,

    /// Also list shards without matches.
    #[arg(long)]
    pub include_empty: bool,

    /// Read shards from this directory instead of the remote origin.
    #[arg(long)]
    pub local_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Site configuration file; relative names resolve in the configured site directory.
    pub site: PathBuf,

    /// Write one shard per source instead of the global map.
    #[arg(long)]
    pub sharded: bool,

    /// Pages per source; 0 crawls all of them.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,
}
