use std::path::PathBuf;

/// File name a captured DOM snapshot is persisted under.
///
/// The scheme separator becomes a single underscore and every remaining slash
/// becomes an underscore, so the whole URL flattens into one path component.
///
/// ```
/// use blockmap_storage::snapshot_filename;
///
/// assert_eq!(
///     snapshot_filename("https://www.example.com/express/"),
///     std::path::Path::new("https_www.example.com_express_.html"),
/// );
/// ```
pub fn snapshot_filename(url: &str) -> PathBuf {
    let flattened = url.replace("://", "_").replace('/', "_");
    PathBuf::from(format!("{flattened}.html"))
}
