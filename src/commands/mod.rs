mod crawl;
mod lookup;
mod search;

use blockmap_config::Config;
use exn::ResultExt;

use crate::cli::{Cli, Commands};
use crate::error::{ErrorKind, Result};

/// Runs the parsed command and returns what it prints on standard output.
pub async fn run(cli: Cli) -> Result<String> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Commands::Lookup(args) => lookup::run(&config, args).await,
        Commands::Search(args) => search::run(&config, args).await,
        Commands::Crawl(args) => crawl::run(&config, args).await,
    }
}
