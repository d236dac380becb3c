use scraper::Selector;
use std::sync::LazyLock;

/// Class suffix marking a layout wrapper whose direct `div` children are
/// blocks in their own right.
pub const WRAPPER_SUFFIX: &str = "-wrapper";
/// Path fragment identifying block implementation scripts.
pub const BLOCK_SCRIPT_PATH: &str = "/express/code/blocks/";

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(MAIN_SELECTOR, "main");
selector!(SECTION_SELECTOR, ".section");
