//! Class-signature extraction from rendered DOM snapshots.

use scraper::{ElementRef, Html};
use tracing::instrument;

use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{BlockMap, ClassSignature};

/// Extracts every block signature on one page into a fresh [`BlockMap`]
/// fragment, each entry listing only `url`.
///
/// Blocks are the direct children of any `.section` element inside the first
/// `<main>`. A block whose classes include a `-wrapper` token also contributes
/// the signatures of its direct `div` children. Elements without classes are
/// skipped.
///
/// Pure and idempotent: extracting the same snapshot twice yields equal
/// fragments, so a crashed finalization can simply be re-run.
///
/// # Errors
///
/// Returns [`MissingMain`](ErrorKind::MissingMain) if the document has no
/// `<main>` element.
///
/// # Examples
///
/// ```
/// use blockmap_extract::extract;
///
/// let html = r#"<main><div class="section"><div class="hero centered"></div></div></main>"#;
/// let fragment = extract(html, "https://example.com/").unwrap();
/// assert_eq!(fragment.len(), 1);
/// ```
#[instrument(skip(html), fields(html_size = html.len(), blocks))]
pub fn extract(html: &str, url: &str) -> Result<BlockMap> {
    let document = Html::parse_document(html);
    let Some(main) = document.select(&consts::MAIN_SELECTOR).next() else {
        exn::bail!(ErrorKind::MissingMain(url.to_string()));
    };

    let mut fragment = BlockMap::new();
    for section in main.select(&consts::SECTION_SELECTOR) {
        for block in child_elements(section) {
            let signature = signature_of(block);
            if signature.is_empty() {
                continue;
            }
            fragment.register(&signature, url);
            if signature.is_wrapper() {
                for nested in child_elements(block).filter(|el| el.value().name() == "div") {
                    fragment.register(&signature_of(nested), url);
                }
            }
        }
    }
    tracing::Span::current().record("blocks", fragment.len());
    Ok(fragment)
}

/// Returns `true` for script request URLs that load a block implementation.
///
/// ```
/// use blockmap_extract::is_block_script;
///
/// assert!(is_block_script("https://www.example.com/express/code/blocks/hero/hero.js"));
/// assert!(!is_block_script("https://www.example.com/express/code/blocks/hero/hero.css"));
/// ```
pub fn is_block_script(url: &str) -> bool {
    url.ends_with(".js") && url.contains(consts::BLOCK_SCRIPT_PATH)
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Reads the raw `class` attribute so duplicates and order are preserved.
fn signature_of(element: ElementRef<'_>) -> ClassSignature {
    element.value().attr("class").map(ClassSignature::from_attribute).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignatureHash;
    use rstest::rstest;

    const URL: &str = "https://www.example.com/express/";

    fn hashes(fragment: &BlockMap) -> Vec<String> {
        fragment.iter().map(|(hash, _)| hash.to_string()).collect()
    }

    #[test]
    fn test_missing_main() {
        let err = extract("<html><body><div class='section'></div></body></html>", URL).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingMain(URL.to_string()));
    }

    #[test]
    fn test_direct_children_of_sections() {
        let html = r#"
            <main>
                <div class="section">
                    <div class="hero centered"><div class="not-a-block"></div></div>
                    <div>no classes</div>
                    <p class="columns"></p>
                </div>
                <div class="outside"></div>
            </main>
        "#;
        let fragment = extract(html, URL).unwrap();
        assert_eq!(
            hashes(&fragment),
            [SignatureHash::of(&["hero", "centered"]).to_string(), SignatureHash::of(&["columns"]).to_string()]
        );
        let (_, entry) = fragment.iter().next().unwrap();
        assert_eq!(entry.class_names, ["hero", "centered"]);
        assert_eq!(entry.urls.iter().collect::<Vec<_>>(), [URL]);
    }

    #[test]
    fn test_nested_sections_are_found() {
        let html = r#"
            <main><div><div class="section"><div class="hero"></div></div></div></main>
        "#;
        let fragment = extract(html, URL).unwrap();
        assert_eq!(hashes(&fragment), [SignatureHash::of(&["hero"]).to_string()]);
    }

    #[test]
    fn test_wrapper_children() {
        let html = r#"
            <main>
                <div class="section">
                    <div class="columns-wrapper">
                        <div class="columns dark"><div class="deeper"></div></div>
                        <span class="ignored"></span>
                        <div></div>
                    </div>
                </div>
            </main>
        "#;
        let fragment = extract(html, URL).unwrap();
        assert_eq!(
            hashes(&fragment),
            [SignatureHash::of(&["columns-wrapper"]).to_string(), SignatureHash::of(&["columns", "dark"]).to_string()]
        );
    }

    #[test]
    fn test_case_and_duplicates_preserved() {
        let html = r#"<main><div class="section"><div class="Hero hero hero"></div></div></main>"#;
        let fragment = extract(html, URL).unwrap();
        let (hash, entry) = fragment.iter().next().unwrap();
        assert_eq!(entry.class_names, ["Hero", "hero", "hero"]);
        assert_eq!(*hash, SignatureHash::of(&["hero", "Hero", "hero"]));
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<main><div class="section"><div class="a"></div><div class="b"></div></div></main>"#;
        assert_eq!(extract(html, URL).unwrap(), extract(html, URL).unwrap());
    }

    #[rstest]
    #[case("https://x.com/express/code/blocks/hero/hero.js", true)]
    #[case("https://x.com/express/code/blocks/hero/hero.js?v=2", false)]
    #[case("https://x.com/express/code/scripts/scripts.js", false)]
    #[case("https://x.com/code/blocks/hero/hero.js", false)]
    fn test_is_block_script(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_block_script(url), expected);
    }
}
