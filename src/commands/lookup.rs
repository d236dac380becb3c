use blockmap_config::Config;
use blockmap_extract::{BlockMap, BlockMapEntry};
use blockmap_query::{Scored, full_set_match, normalize_classes, rank_by_jaccard};
use exn::ResultExt;
use serde_json::json;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::cli::LookupArgs;
use crate::error::{ErrorKind, Result};

/// URLs listed per candidate in text output.
const URL_PREVIEW: usize = 3;

pub async fn run(config: &Config, args: LookupArgs) -> Result<String> {
    let map_file = match args.map_file {
        Some(path) => path,
        None => default_map_file(config)?,
    };
    let classes = normalize_classes(&args.classes);
    if classes.is_empty() {
        exn::bail!(ErrorKind::Usage("no class names provided after normalization".to_string()));
    }
    let block_map = load_map(&map_file).await?;
    tracing::debug!(map = %map_file.display(), entries = block_map.len(), ?classes, "looking up classes");
    render(&block_map, &classes, args.top_k, args.output_json)
}

fn default_map_file(config: &Config) -> Result<PathBuf> {
    let root = config.paths.data_root().or_raise(|| ErrorKind::Config)?;
    Ok(root.join(&config.paths.legacy_map))
}

async fn load_map(path: &Path) -> Result<BlockMap> {
    if !path.is_file() {
        exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
    }
    let contents = tokio::fs::read(path).await.or_raise(|| ErrorKind::UnreadableFile(path.to_path_buf()))?;
    serde_json::from_slice(&contents).or_raise(|| ErrorKind::UnreadableFile(path.to_path_buf()))
}

fn render(block_map: &BlockMap, classes: &[String], top_k: usize, as_json: bool) -> Result<String> {
    if let Some((id, entry)) = full_set_match(block_map, classes) {
        return if as_json {
            let value = json!({ "exact_match": entry_json(id.as_str(), entry) });
            serde_json::to_string_pretty(&value).or_raise(|| ErrorKind::Output)
        } else {
            exact_text(id.as_str(), entry).or_raise(|| ErrorKind::Output)
        };
    }

    let matches = rank_by_jaccard(block_map, classes, top_k);
    if as_json {
        let matches: Vec<_> = matches
            .iter()
            .map(|scored| {
                json!({
                    "id": scored.hash,
                    "score": scored.rounded_score(),
                    "class_names": scored.entry.class_names,
                    "urls": scored.entry.urls,
                })
            })
            .collect();
        let value = json!({ "exact_match": null, "matches": matches });
        serde_json::to_string_pretty(&value).or_raise(|| ErrorKind::Output)
    } else {
        candidates_text(&matches).or_raise(|| ErrorKind::Output)
    }
}

fn entry_json(id: &str, entry: &BlockMapEntry) -> serde_json::Value {
    json!({ "id": id, "class_names": entry.class_names, "urls": entry.urls })
}

fn exact_text(id: &str, entry: &BlockMapEntry) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::from("Exact match found:\n\n");
    writeln!(out, "id: {id}")?;
    writeln!(out, "class_names: {:?}", entry.class_names)?;
    writeln!(out, "urls ({}):", entry.urls.len())?;
    for url in &entry.urls {
        writeln!(out, "  - {url}")?;
    }
    Ok(out)
}

fn candidates_text(matches: &[Scored<'_>]) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::from("No exact match found. Top candidates:\n\n");
    for (rank, scored) in matches.iter().enumerate() {
        writeln!(out, "{}. id: {}", rank + 1, scored.hash)?;
        writeln!(out, "   score: {:.4}", scored.score)?;
        writeln!(out, "   class_names: {:?}", scored.entry.class_names)?;
        writeln!(out, "   urls: {} total", scored.entry.urls.len())?;
        for url in scored.entry.urls.iter().take(URL_PREVIEW) {
            writeln!(out, "     - {url}")?;
        }
        if scored.entry.urls.len() > URL_PREVIEW {
            out.push_str("     - ...\n");
        }
    }
    Ok(out)
}
